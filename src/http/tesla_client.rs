//! High-level client for the vehicle owner API.
//!
//! This module provides the [`TeslaClient`] struct, the entry point for
//! reading telemetry from and sending commands to a single vehicle.
//!
//! # Overview
//!
//! Every named operation is one logical request. Behind it, the client
//! refreshes an expired access token and wakes a sleeping vehicle as needed,
//! each at most once per request, before giving up with a [`VehicleError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use teslarest::http::TeslaClient;
//!
//! # async fn example() -> Result<(), anyhow::Error> {
//! let client = TeslaClient::new("1492931337154343", "my-refresh-token")?;
//!
//! let charge = client.get_charge_state().await?;
//! println!("Battery at {:?}%", charge.battery_level);
//!
//! client.set_charging_amps(16).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::config::ClientConfig;

use super::credentials::CredentialManager;
use super::error::VehicleError;
use super::executor::{RequestExecutor, WAKE_UP_PATH};
use super::http_client::HttpClient;
use super::types::{ApiEnvelope, ChargeState, CommandResponse, RequestDescriptor, VehicleData, WakeUpResponse};

const CHARGE_STATE_PATH: &str = "data_request/charge_state";
const VEHICLE_DATA_PATH: &str = "vehicle_data";
const CHARGE_START_PATH: &str = "command/charge_start";
const CHARGE_STOP_PATH: &str = "command/charge_stop";
const SET_CHARGING_AMPS_PATH: &str = "command/set_charging_amps";

/// Client for one vehicle of the owner API.
///
/// # Thread Safety
///
/// `TeslaClient` can be shared across tasks (e.g. behind an `Arc`).
/// Concurrent requests keep independent recovery state but share the
/// access token; concurrent refreshes are coalesced into one call to the
/// identity endpoint.
pub struct TeslaClient {
    vehicle_id: String,
    executor: RequestExecutor,
}

impl TeslaClient {
    /// Creates a client with production endpoints and default policy:
    /// 10 wake-up attempts, 10 seconds apart.
    ///
    /// The access token starts out empty, so the first request is answered
    /// with 401 and triggers a refresh.
    pub fn new(vehicle_id: impl Into<String>, refresh_token: impl Into<String>) -> Result<Self, VehicleError> {
        let config = ClientConfig {
            vehicle_id: vehicle_id.into(),
            refresh_token: refresh_token.into(),
            ..Default::default()
        };
        Self::with_config(&config)
    }

    /// Creates a client from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VehicleError::UrlError`] for malformed endpoint URLs and
    /// [`VehicleError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_config(config: &ClientConfig) -> Result<Self, VehicleError> {
        let base_url = vehicle_base_url(&config.api_base_url, &config.vehicle_id)?;
        let transport = HttpClient::new(base_url, config.request_timeout())?;
        let credentials = CredentialManager::new(
            config.token_endpoint()?,
            config.refresh_token.clone(),
            config.access_token.clone(),
        )?;

        Ok(Self {
            vehicle_id: config.vehicle_id.clone(),
            executor: RequestExecutor::new(transport, credentials, config.recovery()),
        })
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Returns the vehicle base URL as a string.
    pub fn get_address(&self) -> String {
        self.executor.transport().base_url().to_string()
    }

    /// Returns the latency of the most recent HTTP call, if any was made.
    pub async fn get_last_request_latency(&self) -> Option<Duration> {
        self.executor.transport().get_latency().await
    }

    /// Returns the charge state.
    pub async fn get_charge_state(&self) -> Result<ChargeState, VehicleError> {
        debug!(vehicle_id = self.vehicle_id.as_str(); "Requesting charge state");
        self.fetch(RequestDescriptor::get(CHARGE_STATE_PATH)).await
    }

    /// Returns all vehicle data.
    pub async fn get_vehicle_data(&self) -> Result<VehicleData, VehicleError> {
        debug!(vehicle_id = self.vehicle_id.as_str(); "Requesting vehicle data");
        self.fetch(RequestDescriptor::get(VEHICLE_DATA_PATH)).await
    }

    /// Start charging.
    pub async fn start_charging(&self) -> Result<CommandResponse, VehicleError> {
        self.command(CHARGE_START_PATH, None).await
    }

    /// Stop charging.
    pub async fn stop_charging(&self) -> Result<CommandResponse, VehicleError> {
        self.command(CHARGE_STOP_PATH, None).await
    }

    /// Sets the charging current in amperes.
    pub async fn set_charging_amps(&self, amps: u32) -> Result<CommandResponse, VehicleError> {
        self.command(SET_CHARGING_AMPS_PATH, Some(json!({ "charging_amps": amps })))
            .await
    }

    /// Sends a single wake-up command and returns the reported state.
    ///
    /// The vehicle may still be `asleep` in the response; use
    /// [`wake_and_wait`](Self::wake_and_wait) to block until it is online.
    pub async fn wake_up(&self) -> Result<WakeUpResponse, VehicleError> {
        info!(target: "audit", command = WAKE_UP_PATH; "Sending vehicle command");
        self.executor.send_wake_up().await
    }

    /// Runs a complete wake-up cycle.
    ///
    /// # Errors
    ///
    /// Returns [`VehicleError::WakeTimeout`] when the vehicle is not online
    /// after the configured number of attempts.
    pub async fn wake_and_wait(&self) -> Result<(), VehicleError> {
        self.executor.wake_and_wait().await
    }

    async fn command(&self, path: &str, body: Option<serde_json::Value>) -> Result<CommandResponse, VehicleError> {
        info!(target: "audit", command = path; "Sending vehicle command");
        let response: CommandResponse = self.fetch(RequestDescriptor::post(path, body)).await?;
        info!(
            target: "audit",
            command = path,
            result = response.result,
            reason = response.reason.as_str();
            "Vehicle command completed"
        );
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T, VehicleError> {
        let payload = self.executor.execute(&request).await?;
        let envelope: ApiEnvelope<T> = serde_json::from_value(payload)?;
        Ok(envelope.response)
    }
}

/// `{api_base_url}/{vehicle_id}/`, tolerating a missing trailing slash on
/// the base.
fn vehicle_base_url(api_base_url: &str, vehicle_id: &str) -> Result<Url, VehicleError> {
    let mut base = Url::parse(api_base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("{}/", vehicle_id))?)
}
