//! HTTP client for the device API: registration, authentication and
//! measurement submission.

use crate::errors::{Error, Result};
use crate::model::{AuthRequest, Device, Measurement};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the device API, e.g. `http://localhost:8080`.
    pub api_url: String,
    /// Upper bound for a single request, connect included.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The service answered with a 5xx status.
    ServiceUnavailable(StatusCode),
    /// No usable response: connect error, timeout, broken body.
    TransportFailure(String),
    /// The service refused the batch; retrying will not help.
    RejectedByServer { status: StatusCode, body: String },
}

impl DeliveryOutcome {
    /// Whether the batch should be kept for the next tick.
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::ServiceUnavailable(_) | DeliveryOutcome::TransportFailure(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    Transient,
    Rejected,
}

fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Rejected
    }
}

/// The auth endpoint may return the token bare or as a JSON string literal.
fn parse_token(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(token) = serde_json::from_str::<String>(trimmed) {
            return token;
        }
    }
    trimmed.to_string()
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    match classify_status(status) {
        StatusClass::Success => Ok(response),
        StatusClass::Transient => Err(Error::ServiceDegraded(status)),
        StatusClass::Rejected => {
            let body = response.text().await.unwrap_or_default();
            Err(Error::ServiceRejected { status, body })
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceApiClient {
    config: ClientConfig,
    client: Client,
}

impl DeviceApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// `POST /devices`; returns the record the service confirmed.
    pub async fn register(&self, device: &Device) -> Result<Device> {
        let url = self.url("/devices");
        debug!("Registering device {} at {}", device.serial_number, url);

        let response = self.client.post(&url).json(device).send().await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /authenticate`; returns the bearer token.
    pub async fn authenticate(&self, device: &Device) -> Result<String> {
        let url = self.url("/authenticate");

        let response = self
            .client
            .post(&url)
            .json(&AuthRequest::from(device))
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        Ok(parse_token(&body))
    }

    /// `POST /devices/{serial}/measurements`. A single attempt; retrying is
    /// the caller's business.
    pub async fn deliver(
        &self,
        serial_number: &str,
        batch: &[Measurement],
        auth_token: &str,
    ) -> DeliveryOutcome {
        let url = self.url(&format!("/devices/{}/measurements", serial_number));
        debug!("Submitting {} measurements to {}", batch.len(), url);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(auth_token)
            .json(batch)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DeliveryOutcome::TransportFailure(e.to_string()),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => DeliveryOutcome::Delivered,
            StatusClass::Transient => DeliveryOutcome::ServiceUnavailable(status),
            StatusClass::Rejected => {
                let body = response.text().await.unwrap_or_default();
                DeliveryOutcome::RejectedByServer { status, body }
            }
        }
    }
}
