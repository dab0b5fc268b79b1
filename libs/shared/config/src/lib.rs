use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_anon_key: String,
    pub jwt_secret: String,
    pub hms_management_token: String,
    pub hms_template_id: String,
    pub hms_base_url: String,
    pub hms_app_subdomain: String,
    pub redis_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_anon_key: env::var("DATABASE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            hms_management_token: env::var("HMS_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("HMS_TOKEN not set, using empty value");
                    String::new()
                }),
            hms_template_id: env::var("HMS_TEMPLATE_ID")
                .unwrap_or_else(|_| {
                    warn!("HMS_TEMPLATE_ID not set, using empty value");
                    String::new()
                }),
            hms_base_url: env::var("HMS_BASE_URL")
                .unwrap_or_else(|_| "https://api.100ms.live/v2".to_string()),
            hms_app_subdomain: env::var("HMS_APP_SUBDOMAIN")
                .unwrap_or_else(|_| "webdoctor".to_string()),
            redis_url: env::var("REDIS_URL").ok(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
            && !self.database_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_video_configured(&self) -> bool {
        !self.hms_management_token.is_empty()
            && !self.hms_template_id.is_empty()
            && !self.hms_base_url.is_empty()
    }
}
