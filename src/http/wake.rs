use std::time::Duration;

use log::{debug, info, warn};

use super::error::VehicleError;
use super::executor::{RecoveryConfig, RequestExecutor};

/// Drives the wake-up cycle: send `wake_up`, check the reported state, wait,
/// repeat until the vehicle is online or the attempt budget is spent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WakeController {
    poll_interval: Duration,
    max_attempts: u32,
}

impl WakeController {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            poll_interval: config.wake_poll_interval,
            max_attempts: config.max_wake_attempts,
        }
    }

    /// Returns once the vehicle reports `online`.
    ///
    /// Transient failures of the wake-up command itself (the vehicle still
    /// answering 408, a 5xx, a dropped connection) count as a failed poll.
    /// Anything else, a failed token refresh included, aborts the cycle.
    pub async fn wake_and_wait(&self, executor: &RequestExecutor) -> Result<(), VehicleError> {
        let mut last_status = None;

        for attempt in 1..=self.max_attempts {
            debug!(attempt = attempt, max_attempts = self.max_attempts; "WakeUp");

            match executor.send_wake_up().await {
                Ok(response) if response.is_online() => {
                    info!(attempt = attempt; "Vehicle is online");
                    return Ok(());
                },
                Ok(response) => {
                    debug!(state = response.state.as_str(); "Vehicle not online yet");
                },
                Err(e) if e.is_transient() => {
                    last_status = e.status();
                    warn!(attempt = attempt, error:% = e; "Wake-up command failed");
                },
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        warn!(attempts = self.max_attempts; "Vehicle did not come online");
        Err(VehicleError::WakeTimeout {
            attempts: self.max_attempts,
            status: last_status,
        })
    }
}
