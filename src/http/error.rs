//! Error types for vehicle API operations.
//!
//! This module defines the [`VehicleError`] enum, the terminal outcome of a
//! logical request that could not be completed. Recoverable conditions
//! (an expired access token, a sleeping vehicle) never surface here unless
//! their single recovery attempt has already been spent.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can end a logical request against the vehicle API.
///
/// Every variant that originates from an HTTP exchange carries the last
/// status code observed for that request, available through
/// [`VehicleError::status`].
///
/// # Error Categories
///
/// - **Credential errors**: [`AuthRefresh`](VehicleError::AuthRefresh),
///   [`Unauthorized`](VehicleError::Unauthorized)
/// - **Reachability errors**: [`WakeTimeout`](VehicleError::WakeTimeout),
///   [`Unreachable`](VehicleError::Unreachable)
/// - **Everything else**: [`Api`](VehicleError::Api) and the local
///   construction errors
///
/// # Example
///
/// ```rust,no_run
/// use teslarest::http::VehicleError;
///
/// fn report(err: &VehicleError) {
///     match err {
///         VehicleError::WakeTimeout { attempts, .. } => {
///             eprintln!("Vehicle stayed asleep after {} wake-up attempts", attempts);
///         }
///         other => eprintln!("Request failed (status {:?}): {}", other.status(), other),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum VehicleError {
    /// Exchanging the refresh token for a new access token failed.
    ///
    /// Covers network failures, non-success responses from the identity
    /// endpoint, and responses without a usable `access_token`. The
    /// previously stored access token is left in place.
    #[error("Access token refresh failed: {reason}")]
    AuthRefresh {
        /// Human readable cause.
        reason: String,
        /// Status returned by the identity endpoint, if it answered at all.
        status: Option<StatusCode>,
    },

    /// The vehicle did not report `online` within the wake-up budget.
    #[error("Vehicle did not wake up after {attempts} attempts")]
    WakeTimeout {
        /// Number of wake-up commands sent.
        attempts: u32,
        /// Status of the last failed wake-up command, if any failed.
        status: Option<StatusCode>,
    },

    /// The API rejected the access token even after it was refreshed.
    #[error("Access token rejected by the API (status {status})")]
    Unauthorized { status: StatusCode },

    /// The vehicle was still unreachable after a wake-up cycle, or wake-up
    /// recovery was not permitted for this request.
    #[error("Vehicle unreachable (status {status})")]
    Unreachable { status: StatusCode },

    /// Any other failure with no recovery path.
    ///
    /// `status` is `None` when the request never produced an HTTP response
    /// (connection refused, DNS failure, timeout).
    #[error("API error{}: {body}", .status.map(|s| format!(" {}", s)).unwrap_or_default())]
    Api { status: Option<StatusCode>, body: String },

    /// Failed to build a request URL from the configured base URL.
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// Failed to serialize a request body or decode a response payload.
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

impl VehicleError {
    /// The last HTTP status code observed for the failed request.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            VehicleError::AuthRefresh { status, .. }
            | VehicleError::WakeTimeout { status, .. }
            | VehicleError::Api { status, .. } => *status,
            VehicleError::Unauthorized { status } | VehicleError::Unreachable { status } => Some(*status),
            VehicleError::UrlError(_) | VehicleError::JsonError(_) | VehicleError::ClientBuild(_) => None,
        }
    }

    /// Whether the failure might clear up by itself on a later attempt.
    ///
    /// The wake-up loop keeps polling through transient failures and aborts
    /// on anything else.
    pub fn is_transient(&self) -> bool {
        match self {
            VehicleError::Unreachable { .. } => true,
            VehicleError::Api { status: None, .. } => true,
            VehicleError::Api { status: Some(status), .. } => status.is_server_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reports_last_observed_code() {
        let err = VehicleError::Unauthorized {
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

        let err = VehicleError::Api {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn transient_classification() {
        assert!(
            VehicleError::Unreachable {
                status: StatusCode::REQUEST_TIMEOUT
            }
            .is_transient()
        );
        assert!(
            VehicleError::Api {
                status: Some(StatusCode::BAD_GATEWAY),
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !VehicleError::Api {
                status: Some(StatusCode::NOT_FOUND),
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !VehicleError::Unauthorized {
                status: StatusCode::UNAUTHORIZED
            }
            .is_transient()
        );
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = VehicleError::Api {
            status: Some(StatusCode::INTERNAL_SERVER_ERROR),
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error 500 Internal Server Error: boom");

        let err = VehicleError::Api {
            status: None,
            body: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "API error: connection refused");
    }
}
