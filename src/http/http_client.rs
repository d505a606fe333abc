// Copyright 2025 The Tari Project
// SPDX-License-Identifier: BSD-3-Clause

use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::{Method, StatusCode};
use tokio::sync::RwLock;
use url::Url;

use super::error::VehicleError;
use super::types::{RequestDescriptor, ResponseClassification};

const LOG_TARGET: &str = "teslarest::http";

/// Single-attempt transport against the vehicle endpoint.
///
/// No retry middleware is installed here: every call is exactly one HTTP
/// exchange, and recovery belongs to the request executor.
pub(crate) struct HttpClient {
    base_url: Url,
    client: reqwest_middleware::ClientWithMiddleware,
    last_latency: RwLock<Option<(Duration, Instant)>>,
}

impl HttpClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, VehicleError> {
        let inner_client = reqwest::Client::builder().timeout(timeout).build()?;
        let client = reqwest_middleware::ClientBuilder::new(inner_client).build();

        Ok(Self {
            base_url,
            client,
            last_latency: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issues one request with `access_token` and classifies the outcome.
    ///
    /// Only local failures (bad path, unserializable body) are returned as
    /// `Err`; anything that happened on the wire becomes a classification.
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        access_token: &str,
    ) -> Result<ResponseClassification, VehicleError> {
        let start = Instant::now();
        let url = self.base_url.join(&request.path)?;

        let req = match request.method {
            Method::GET => self.client.get(url),
            Method::POST => {
                let req = self.client.post(url);
                match &request.body {
                    Some(body) => req.body(serde_json::to_string(body)?),
                    None => req,
                }
            },
            _ => {
                return Ok(ResponseClassification::OtherError {
                    status: None,
                    body: format!("Unsupported HTTP method {}", request.method),
                });
            },
        };

        let req = req
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json");

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    path = request.path.as_str(),
                    error:% = e;
                    "Request failed before a response was received"
                );
                return Ok(ResponseClassification::OtherError {
                    status: None,
                    body: e.to_string(),
                });
            },
        };
        self.update_latency(start.elapsed()).await;

        let status = resp.status();
        debug!(
            target: LOG_TARGET,
            method = request.method.as_str(),
            path = request.path.as_str(),
            status = status.as_u16();
            "Vehicle API responded"
        );

        if status != StatusCode::OK {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".into());
            return Ok(ResponseClassification::from_status(status, body));
        }

        match resp.json().await {
            Ok(payload) => Ok(ResponseClassification::Success(payload)),
            Err(e) => Ok(ResponseClassification::OtherError {
                status: Some(status),
                body: format!("Malformed response body: {}", e),
            }),
        }
    }

    async fn update_latency(&self, duration: Duration) {
        *self.last_latency.write().await = Some((duration, Instant::now()));
    }

    pub async fn get_latency(&self) -> Option<Duration> {
        self.last_latency.read().await.map(|(d, _)| d)
    }
}
