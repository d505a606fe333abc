//! Resilient execution of one logical request.
//!
//! A logical request may span several HTTP calls. The executor issues the
//! call, and on an expired token or a sleeping vehicle performs the matching
//! recovery before retrying. Each recovery kind is applied at most once per
//! logical request, so a request makes at most three calls against the
//! vehicle endpoint (plus whatever the wake-up cycle sends) and always
//! terminates.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::StatusCode;
use serde_json::Value;

use super::credentials::CredentialManager;
use super::error::VehicleError;
use super::http_client::HttpClient;
use super::types::{ApiEnvelope, RequestDescriptor, ResponseClassification, WakeUpResponse};
use super::wake::WakeController;

pub(crate) const WAKE_UP_PATH: &str = "command/wake_up";

pub const DEFAULT_WAKE_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_WAKE_ATTEMPTS: u32 = 10;

/// Policy constants for the wake-up cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Pause between two wake-up commands.
    pub wake_poll_interval: Duration,
    /// Wake-up commands sent before giving up.
    pub max_wake_attempts: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            wake_poll_interval: DEFAULT_WAKE_POLL_INTERVAL,
            max_wake_attempts: DEFAULT_MAX_WAKE_ATTEMPTS,
        }
    }
}

/// Whether a sleeping vehicle may be woken up to complete the request.
///
/// Disabled for the wake-up command itself, which must not recurse into
/// another wake-up cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WakeRecovery {
    Enabled,
    Disabled,
}

/// What to do after classifying an attempt.
#[derive(Debug)]
enum NextStep {
    Done(Value),
    RefreshCredential,
    WakeDevice,
    Fail(VehicleError),
}

/// Per-request recovery bookkeeping: one flag per failure class.
#[derive(Debug)]
struct RecoveryState {
    wake: WakeRecovery,
    credential_refreshed: bool,
    device_woken: bool,
}

impl RecoveryState {
    fn new(wake: WakeRecovery) -> Self {
        Self {
            wake,
            credential_refreshed: false,
            device_woken: false,
        }
    }

    fn next_step(&mut self, classification: ResponseClassification) -> NextStep {
        match classification {
            ResponseClassification::Success(payload) => NextStep::Done(payload),
            ResponseClassification::AuthExpired if !self.credential_refreshed => {
                self.credential_refreshed = true;
                NextStep::RefreshCredential
            },
            ResponseClassification::AuthExpired => NextStep::Fail(VehicleError::Unauthorized {
                status: StatusCode::UNAUTHORIZED,
            }),
            ResponseClassification::DeviceUnreachable
                if self.wake == WakeRecovery::Enabled && !self.device_woken =>
            {
                self.device_woken = true;
                NextStep::WakeDevice
            },
            ResponseClassification::DeviceUnreachable => NextStep::Fail(VehicleError::Unreachable {
                status: StatusCode::REQUEST_TIMEOUT,
            }),
            ResponseClassification::OtherError { status, body } => NextStep::Fail(VehicleError::Api { status, body }),
        }
    }
}

type BoxedRequest<'a> = Pin<Box<dyn Future<Output = Result<Value, VehicleError>> + Send + 'a>>;

pub(crate) struct RequestExecutor {
    transport: HttpClient,
    credentials: CredentialManager,
    wake: WakeController,
}

impl RequestExecutor {
    pub fn new(transport: HttpClient, credentials: CredentialManager, recovery: RecoveryConfig) -> Self {
        Self {
            transport,
            credentials,
            wake: WakeController::new(recovery),
        }
    }

    pub fn transport(&self) -> &HttpClient {
        &self.transport
    }

    /// Runs a logical request with both recovery paths available.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<Value, VehicleError> {
        self.execute_with(request, WakeRecovery::Enabled).await
    }

    /// Boxed so the wake-up command can re-enter it without an infinitely
    /// sized future.
    pub(crate) fn execute_with<'a>(&'a self, request: &'a RequestDescriptor, wake: WakeRecovery) -> BoxedRequest<'a> {
        Box::pin(async move {
            let mut state = RecoveryState::new(wake);

            loop {
                let token = self.credentials.current().await;
                let classification = self.transport.execute(request, token.value()).await?;

                match state.next_step(classification) {
                    NextStep::Done(payload) => return Ok(payload),
                    NextStep::RefreshCredential => {
                        info!(path = request.path.as_str(); "Access token expired, refreshing");
                        let fresh = self.credentials.refresh(&token).await?;
                        debug!(generation = fresh.generation(); "Using refreshed access token");
                    },
                    NextStep::WakeDevice => {
                        info!(path = request.path.as_str(); "Vehicle is asleep, waking up");
                        self.wake.wake_and_wait(self).await?;
                    },
                    NextStep::Fail(err) => {
                        warn!(
                            path = request.path.as_str(),
                            error:% = err;
                            "Error while sending request"
                        );
                        return Err(err);
                    },
                }
                debug!(path = request.path.as_str(); "Retrying request after recovery");
            }
        })
    }

    /// Sends one wake-up command. Token refresh still applies, wake-up
    /// recovery does not.
    pub(crate) async fn send_wake_up(&self) -> Result<WakeUpResponse, VehicleError> {
        let request = RequestDescriptor::post(WAKE_UP_PATH, None);
        let payload = self.execute_with(&request, WakeRecovery::Disabled).await?;
        let envelope: ApiEnvelope<WakeUpResponse> = serde_json::from_value(payload)?;
        Ok(envelope.response)
    }

    /// Runs a full wake-up cycle outside of any data request.
    pub async fn wake_and_wait(&self) -> Result<(), VehicleError> {
        self.wake.wake_and_wait(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_needs_no_recovery() {
        let mut state = RecoveryState::new(WakeRecovery::Enabled);
        let step = state.next_step(ResponseClassification::Success(json!({"ok": true})));
        assert!(matches!(step, NextStep::Done(ref payload) if *payload == json!({"ok": true})));
        assert!(!state.credential_refreshed);
        assert!(!state.device_woken);
    }

    #[test]
    fn second_auth_failure_is_terminal() {
        let mut state = RecoveryState::new(WakeRecovery::Enabled);
        assert!(matches!(
            state.next_step(ResponseClassification::AuthExpired),
            NextStep::RefreshCredential
        ));
        assert!(matches!(
            state.next_step(ResponseClassification::AuthExpired),
            NextStep::Fail(VehicleError::Unauthorized { .. })
        ));
    }

    #[test]
    fn auth_then_wake_composes_once() {
        let mut state = RecoveryState::new(WakeRecovery::Enabled);
        assert!(matches!(
            state.next_step(ResponseClassification::AuthExpired),
            NextStep::RefreshCredential
        ));
        assert!(matches!(
            state.next_step(ResponseClassification::DeviceUnreachable),
            NextStep::WakeDevice
        ));
        assert!(matches!(
            state.next_step(ResponseClassification::AuthExpired),
            NextStep::Fail(VehicleError::Unauthorized { .. })
        ));
    }

    #[test]
    fn wake_then_auth_composes_once() {
        let mut state = RecoveryState::new(WakeRecovery::Enabled);
        assert!(matches!(
            state.next_step(ResponseClassification::DeviceUnreachable),
            NextStep::WakeDevice
        ));
        assert!(matches!(
            state.next_step(ResponseClassification::AuthExpired),
            NextStep::RefreshCredential
        ));
        assert!(matches!(
            state.next_step(ResponseClassification::DeviceUnreachable),
            NextStep::Fail(VehicleError::Unreachable { .. })
        ));
    }

    #[test]
    fn wake_disabled_fails_on_unreachable() {
        let mut state = RecoveryState::new(WakeRecovery::Disabled);
        assert!(matches!(
            state.next_step(ResponseClassification::DeviceUnreachable),
            NextStep::Fail(VehicleError::Unreachable { .. })
        ));
        assert!(!state.device_woken);
    }

    #[test]
    fn other_error_is_terminal_with_status() {
        let mut state = RecoveryState::new(WakeRecovery::Enabled);
        let step = state.next_step(ResponseClassification::OtherError {
            status: Some(StatusCode::SERVICE_UNAVAILABLE),
            body: "down".to_string(),
        });
        match step {
            NextStep::Fail(err) => assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE)),
            other => panic!("unexpected step {:?}", other),
        }
        assert!(!state.credential_refreshed);
        assert!(!state.device_woken);
    }

    #[test]
    fn every_failure_sequence_terminates_within_three_attempts() {
        let classes = [
            ResponseClassification::AuthExpired,
            ResponseClassification::DeviceUnreachable,
        ];

        for first in &classes {
            for second in &classes {
                for third in &classes {
                    let mut state = RecoveryState::new(WakeRecovery::Enabled);
                    let steps = [
                        state.next_step(first.clone()),
                        state.next_step(second.clone()),
                        state.next_step(third.clone()),
                    ];
                    assert!(
                        steps.iter().any(|s| matches!(s, NextStep::Fail(_))),
                        "no terminal step for {:?} {:?} {:?}",
                        first,
                        second,
                        third
                    );
                }
            }
        }
    }
}
