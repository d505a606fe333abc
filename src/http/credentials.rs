use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::logging::mask_token;

use super::error::VehicleError;
use super::types::{TokenRequest, TokenResponse};

const GRANT_TYPE: &str = "refresh_token";

/// Identity-provider settings used to mint access tokens.
#[derive(Clone)]
pub struct TokenEndpoint {
    pub url: Url,
    pub client_id: String,
    pub scope: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

/// A snapshot of the current bearer token.
///
/// `generation` increases by one on every successful refresh, letting a
/// request tell whether the token it used has already been replaced.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    generation: u64,
}

impl AccessToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &mask_token(&self.value))
            .field("generation", &self.generation)
            .finish()
    }
}

/// Owns the access token and exchanges the refresh token for new ones.
pub(crate) struct CredentialManager {
    endpoint: TokenEndpoint,
    refresh_token: String,
    client: reqwest_middleware::ClientWithMiddleware,
    current: RwLock<AccessToken>,
    refresh_gate: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        endpoint: TokenEndpoint,
        refresh_token: String,
        initial_access_token: Option<String>,
    ) -> Result<Self, VehicleError> {
        let retry_policy =
            reqwest_retry::policies::ExponentialBackoff::builder().build_with_max_retries(endpoint.max_retries);

        let inner_client = reqwest::Client::builder().timeout(endpoint.timeout).build()?;

        let client = reqwest_middleware::ClientBuilder::new(inner_client)
            .with(reqwest_retry::RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            endpoint,
            refresh_token,
            client,
            current: RwLock::new(AccessToken {
                value: initial_access_token.unwrap_or_default(),
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
        })
    }

    /// The token every new attempt should use.
    pub async fn current(&self) -> AccessToken {
        self.current.read().await.clone()
    }

    /// Replaces `stale` with a freshly minted token.
    ///
    /// Refreshes are serialized. If another request already replaced `stale`
    /// while this one waited, the newer token is returned without calling the
    /// identity endpoint again. On failure the stored token is left untouched.
    pub async fn refresh(&self, stale: &AccessToken) -> Result<AccessToken, VehicleError> {
        let _gate = self.refresh_gate.lock().await;

        {
            let current = self.current.read().await;
            if current.generation != stale.generation {
                debug!(
                    generation = current.generation;
                    "Access token already refreshed by a concurrent request"
                );
                return Ok(current.clone());
            }
        }

        debug!("Try to get new access token");
        let token = self.request_token().await?;

        let mut current = self.current.write().await;
        *current = AccessToken {
            value: token.access_token,
            generation: current.generation + 1,
        };
        info!(
            token = &*mask_token(&current.value),
            generation = current.generation,
            expires_in:? = token.expires_in;
            "New access token generated"
        );
        Ok(current.clone())
    }

    async fn request_token(&self) -> Result<TokenResponse, VehicleError> {
        let body = TokenRequest {
            grant_type: GRANT_TYPE,
            client_id: &self.endpoint.client_id,
            refresh_token: &self.refresh_token,
            scope: &self.endpoint.scope,
        };

        let resp = self
            .client
            .post(self.endpoint.url.clone())
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&body)?)
            .send()
            .await
            .map_err(|e| {
                warn!(error:% = e; "Token endpoint unreachable");
                VehicleError::AuthRefresh {
                    reason: e.to_string(),
                    status: None,
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(); "Token endpoint rejected the refresh token");
            return Err(VehicleError::AuthRefresh {
                reason: format!("identity endpoint returned {}: {}", status, text),
                status: Some(status),
            });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| VehicleError::AuthRefresh {
            reason: format!("malformed token response: {}", e),
            status: Some(status),
        })?;

        if token.access_token.is_empty() {
            return Err(VehicleError::AuthRefresh {
                reason: "token response contained an empty access_token".to_string(),
                status: Some(status),
            });
        }

        Ok(token)
    }
}
