use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Role a join link is scoped to. The doctor hosts the consultation, the
/// patient joins as a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomRole {
    Host,
    Guest,
}

impl RoomRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomRole::Host => "host",
            RoomRole::Guest => "guest",
        }
    }
}

impl fmt::Display for RoomRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: String,
    pub template_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomCodeResponse {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomToggleResponse {
    pub enabled: bool,
}

#[derive(Error, Debug)]
pub enum RoomProviderError {
    #[error("video room provider is not configured")]
    NotConfigured,

    #[error("room provider API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("room provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected room provider response: {0}")]
    InvalidResponse(String),
}
