// libs/video-room-cell/src/services/hms.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::models::{
    CreateRoomRequest, CreateRoomResponse, RoomCodeResponse, RoomProviderError, RoomRole,
    RoomToggleRequest, RoomToggleResponse,
};
use crate::provider::RoomProvider;

const REQUEST_TIMEOUT_SECONDS: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;

/// 100ms management API client for room provisioning.
/// Based on: https://www.100ms.live/docs/server-side/v2
pub struct HmsRoomClient {
    client: Client,
    management_token: String,
    template_id: String,
    base_url: String,
    app_subdomain: String,
}

impl HmsRoomClient {
    pub fn new(config: &AppConfig) -> Result<Self, RoomProviderError> {
        if !config.is_video_configured() {
            return Err(RoomProviderError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            management_token: config.hms_management_token.clone(),
            template_id: config.hms_template_id.clone(),
            base_url: config.hms_base_url.clone(),
            app_subdomain: config.hms_app_subdomain.clone(),
        })
    }

    /// POST with a small retry budget for transient failures (connect or
    /// timeout errors, 5xx responses). Non-transient API errors surface
    /// immediately.
    async fn post_with_retry<T>(&self, url: &str, body: &Value) -> Result<T, RoomProviderError>
    where
        T: DeserializeOwned,
    {
        let mut attempt = 1;
        loop {
            match self.post_once(url, body).await {
                Ok((status, text)) => {
                    if status.is_success() {
                        return serde_json::from_str::<T>(&text).map_err(|e| {
                            RoomProviderError::InvalidResponse(format!(
                                "failed to parse response: {}",
                                e
                            ))
                        });
                    }

                    if status.is_server_error() && attempt < MAX_ATTEMPTS {
                        warn!(
                            "100ms request to {} returned {} (attempt {}/{}), retrying",
                            url, status, attempt, MAX_ATTEMPTS
                        );
                    } else {
                        error!("100ms request to {} failed: {} - {}", url, status, text);
                        return Err(RoomProviderError::ApiError {
                            status: status.as_u16(),
                            message: text,
                        });
                    }
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout();
                    if transient && attempt < MAX_ATTEMPTS {
                        warn!(
                            "100ms request to {} failed: {} (attempt {}/{}), retrying",
                            url, e, attempt, MAX_ATTEMPTS
                        );
                    } else {
                        return Err(RoomProviderError::Transport(e));
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            attempt += 1;
        }
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<(StatusCode, String), reqwest::Error> {
        let mut request = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.management_token))
            .header("Content-Type", "application/json");

        if !body.is_null() {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Room codes are per-room, per-role; the meeting URL embeds the code.
    fn join_url_for_code(&self, code: &str) -> String {
        format!("https://{}.app.100ms.live/meeting/{}", self.app_subdomain, code)
    }
}

#[async_trait]
impl RoomProvider for HmsRoomClient {
    /// POST /rooms
    async fn create_room(&self, name: &str, description: &str)
        -> Result<String, RoomProviderError> {
        info!("Creating 100ms room: {}", name);

        let url = format!("{}/rooms", self.base_url);
        let request_body = CreateRoomRequest {
            name: name.to_string(),
            description: description.to_string(),
            template_id: self.template_id.clone(),
        };
        let body = serde_json::to_value(&request_body)
            .map_err(|e| RoomProviderError::InvalidResponse(e.to_string()))?;

        let response: CreateRoomResponse = self.post_with_retry(&url, &body).await?;

        info!("Created 100ms room {} ({})", name, response.id);
        Ok(response.id)
    }

    /// POST /room-codes/room/{room_id}/role/{role}
    async fn issue_join_link(
        &self,
        room_id: &str,
        role: RoomRole,
    ) -> Result<String, RoomProviderError> {
        debug!("Issuing {} join link for room {}", role, room_id);

        let url = format!(
            "{}/room-codes/room/{}/role/{}",
            self.base_url, room_id, role
        );

        let response: RoomCodeResponse = self.post_with_retry(&url, &Value::Null).await?;
        let join_url = self.join_url_for_code(&response.code);

        debug!("Issued {} join link for room {}: {}", role, room_id, join_url);
        Ok(join_url)
    }

    /// POST /rooms/{room_id} with `{"enabled": false}`. The provider treats
    /// disabling an already-disabled room as a normal update, so repeated
    /// calls are safe.
    async fn disable_room(&self, room_id: &str) -> Result<bool, RoomProviderError> {
        info!("Disabling 100ms room {}", room_id);

        let url = format!("{}/rooms/{}", self.base_url, room_id);
        let body = serde_json::to_value(RoomToggleRequest { enabled: false })
            .map_err(|e| RoomProviderError::InvalidResponse(e.to_string()))?;

        let response: RoomToggleResponse = self.post_with_retry(&url, &body).await?;

        info!("100ms room {} enabled flag is now {}", room_id, response.enabled);
        Ok(response.enabled)
    }
}
