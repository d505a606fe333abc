use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cli::{ApplyArgs, ConnectionArgs};
use crate::http::{RecoveryConfig, TokenEndpoint, VehicleError};
use crate::logging::mask_token;

pub const DEFAULT_API_BASE_URL: &str = "https://owner-api.teslamotors.com/api/1/vehicles/";
pub const DEFAULT_AUTH_URL: &str = "https://auth.tesla.com/oauth2/v3/token";
pub const DEFAULT_CLIENT_ID: &str = "ownerapi";
pub const DEFAULT_SCOPE: &str = "openid email offline_access";

#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub vehicle_id: String,
    pub refresh_token: String,
    /// Optional access token to start with; without one the first request
    /// triggers a refresh.
    pub access_token: Option<String>,
    pub api_base_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub scope: String,
    pub wake_poll_interval_ms: u64,
    pub max_wake_attempts: u32,
    pub request_timeout_secs: u64,
    /// Retries for transient identity-endpoint failures (connection errors, 5xx).
    pub refresh_max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            vehicle_id: String::new(),
            refresh_token: String::new(),
            access_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            wake_poll_interval_ms: 10_000,
            max_wake_attempts: 10,
            request_timeout_secs: 30,
            refresh_max_retries: 2,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("vehicle_id", &self.vehicle_id)
            .field("refresh_token", &mask_token(&self.refresh_token))
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .field("api_base_url", &self.api_base_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("wake_poll_interval_ms", &self.wake_poll_interval_ms)
            .field("max_wake_attempts", &self.max_wake_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("refresh_max_retries", &self.refresh_max_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Deserializes the merged configuration; missing keys take their defaults.
    pub fn from_config(cfg: &config::Config) -> Result<Self, config::ConfigError> {
        cfg.clone().try_deserialize()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vehicle_id.trim().is_empty() {
            anyhow::bail!("vehicle_id is not configured");
        }
        if self.refresh_token.trim().is_empty() {
            anyhow::bail!("refresh_token is not configured");
        }
        if self.max_wake_attempts == 0 {
            anyhow::bail!("max_wake_attempts must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }
        Url::parse(&self.api_base_url).map_err(|e| anyhow::anyhow!("invalid api_base_url: {}", e))?;
        Url::parse(&self.auth_url).map_err(|e| anyhow::anyhow!("invalid auth_url: {}", e))?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn recovery(&self) -> RecoveryConfig {
        RecoveryConfig {
            wake_poll_interval: Duration::from_millis(self.wake_poll_interval_ms),
            max_wake_attempts: self.max_wake_attempts,
        }
    }

    pub fn token_endpoint(&self) -> Result<TokenEndpoint, VehicleError> {
        Ok(TokenEndpoint {
            url: Url::parse(&self.auth_url)?,
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            max_retries: self.refresh_max_retries,
            timeout: self.request_timeout(),
        })
    }
}

impl ApplyArgs for ClientConfig {
    fn apply_connection(&mut self, args: &ConnectionArgs) {
        if let Some(vehicle_id) = &args.vehicle_id {
            self.vehicle_id = vehicle_id.clone();
        }
        if let Some(refresh_token) = &args.refresh_token {
            self.refresh_token = refresh_token.clone();
        }
        if let Some(api_base_url) = &args.api_base_url {
            self.api_base_url = api_base_url.clone();
        }
        if let Some(auth_url) = &args.auth_url {
            self.auth_url = auth_url.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ClientConfig {
        ClientConfig {
            vehicle_id: "42".to_string(),
            refresh_token: "refresh-secret-value".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_reference_policy() {
        let recovery = ClientConfig::default().recovery();
        assert_eq!(recovery, RecoveryConfig::default());
        assert_eq!(recovery.wake_poll_interval, Duration::from_secs(10));
        assert_eq!(recovery.max_wake_attempts, 10);
    }

    #[test]
    fn validate_requires_identity() {
        assert!(ClientConfig::default().validate().is_err());
        assert!(configured().validate().is_ok());

        let mut config = configured();
        config.max_wake_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.auth_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let mut config = configured();
        config.apply_connection(&ConnectionArgs {
            vehicle_id: Some("99".to_string()),
            auth_url: Some("http://localhost:9999/token".to_string()),
            ..Default::default()
        });

        assert_eq!(config.vehicle_id, "99");
        assert_eq!(config.refresh_token, "refresh-secret-value");
        assert_eq!(config.auth_url, "http://localhost:9999/token");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn debug_output_masks_secrets() {
        let rendered = format!("{:?}", configured());
        assert!(rendered.contains("refresh-se..."));
        assert!(!rendered.contains("refresh-secret-value"));
    }

    #[test]
    fn token_endpoint_uses_configured_identity() {
        let endpoint = configured().token_endpoint().unwrap();
        assert_eq!(endpoint.url.as_str(), DEFAULT_AUTH_URL);
        assert_eq!(endpoint.client_id, "ownerapi");
        assert_eq!(endpoint.scope, "openid email offline_access");
    }
}
