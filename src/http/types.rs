// Copyright 2025 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One logical operation against the vehicle endpoint.
///
/// `path` is relative to the vehicle base URL (e.g. `data_request/charge_state`).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
        }
    }
}

/// Outcome of a single transport attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseClassification {
    Success(Value),
    AuthExpired,
    DeviceUnreachable,
    OtherError { status: Option<StatusCode>, body: String },
}

impl ResponseClassification {
    /// Classifies a non-200 status. `body` is kept for error reporting only.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ResponseClassification::AuthExpired,
            StatusCode::REQUEST_TIMEOUT => ResponseClassification::DeviceUnreachable,
            _ => ResponseClassification::OtherError {
                status: Some(status),
                body,
            },
        }
    }
}

/// Every owner-api payload is wrapped in a `response` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub response: T,
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'a str,
    pub client_id: &'a str,
    pub refresh_token: &'a str,
    pub scope: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of the access token in seconds, when the endpoint reports it.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeState {
    pub battery_level: Option<u8>,
    pub battery_range: Option<f64>,
    pub charge_limit_soc: Option<u8>,
    pub charging_state: Option<String>,
    pub charge_current_request: Option<u32>,
    pub charge_current_request_max: Option<u32>,
    pub charger_actual_current: Option<u32>,
    pub charger_power: Option<u32>,
    pub charger_voltage: Option<u32>,
    pub time_to_full_charge: Option<f64>,
    pub timestamp: Option<u64>,
    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleData {
    pub id: Option<u64>,
    pub vehicle_id: Option<u64>,
    pub vin: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
    pub charge_state: Option<ChargeState>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub result: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeUpResponse {
    pub id: Option<u64>,
    pub vehicle_id: Option<u64>,
    pub state: String,
}

impl WakeUpResponse {
    pub fn is_online(&self) -> bool {
        self.state == "online"
    }
}
