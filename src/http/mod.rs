//! HTTP client module for the vehicle owner API.
//!
//! This module talks to two remote services: the identity provider that
//! exchanges a refresh token for short-lived access tokens, and the owner API
//! that serves telemetry and accepts commands for one vehicle.
//!
//! # Architecture
//!
//! - [`TeslaClient`] - named operations (charge state, charging commands,
//!   wake-up) for callers
//! - `RequestExecutor` - runs one logical request and recovers from an
//!   expired token (refresh, retry once) or a sleeping vehicle (wake-up
//!   cycle, retry once); the two recoveries compose, each at most once
//! - `WakeController` - sends `wake_up` every poll interval until the vehicle
//!   reports `online` or the attempt budget runs out
//! - `CredentialManager` - owns the access token, coalesces concurrent
//!   refreshes
//! - `HttpClient` - one HTTP call, classified as success, 401, 408 or other
//!
//! # Error Handling
//!
//! Every logical request ends in a payload or a [`VehicleError`]:
//!
//! - Token refresh failures ([`VehicleError::AuthRefresh`])
//! - A vehicle that never came online ([`VehicleError::WakeTimeout`])
//! - A token rejected after refresh ([`VehicleError::Unauthorized`])
//! - A vehicle still asleep after waking ([`VehicleError::Unreachable`])
//! - Anything else the API answered ([`VehicleError::Api`])

mod credentials;
mod error;
mod executor;
mod http_client;
mod tesla_client;
mod types;
mod wake;

pub use credentials::TokenEndpoint;
pub use error::VehicleError;
pub use executor::{DEFAULT_MAX_WAKE_ATTEMPTS, DEFAULT_WAKE_POLL_INTERVAL, RecoveryConfig};
pub use tesla_client::TeslaClient;
pub use types::{
    ApiEnvelope, ChargeState, CommandResponse, RequestDescriptor, ResponseClassification, VehicleData,
    WakeUpResponse,
};
