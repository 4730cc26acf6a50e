//! Telemetry publisher for the data hub
//!
//! One reading per call:
//! - build the record (stamping the current time when none is given)
//! - POST it as JSON to `{endpoint}/api/v1/telemetry`
//! - accept 200 / 201, report anything else as an error
//!
//! No retries, no buffering. Failures go back to the caller untouched.

use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::PublisherConfig;
use crate::device_id::derive_device_id;
use crate::error::PublishError;
use crate::record::TelemetryRecord;

pub const TELEMETRY_PATH: &str = "/api/v1/telemetry";
pub const HEALTH_PATH: &str = "/health";

const USER_AGENT: &str = concat!("datahub-publisher/", env!("CARGO_PKG_VERSION"));

/// Sends telemetry readings to the data hub.
///
/// Cloning is cheap and clones share the underlying connection pool, so one
/// publisher can serve any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct TelemetryPublisher {
    endpoint: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl TelemetryPublisher {
    /// Publisher for `base_url` with the default timeout; an empty URL disables it
    pub fn new(base_url: &str) -> Self {
        Self::from_config(PublisherConfig::default().with_endpoint(base_url))
    }

    /// Publisher that accepts every reading and sends nothing
    pub fn disabled() -> Self {
        Self::from_config(PublisherConfig::default())
    }

    /// Build a publisher, failing if the HTTP client cannot be initialised
    pub fn try_from_config(config: PublisherConfig) -> Result<Self, PublishError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(PublishError::Client)?;

        Ok(Self {
            endpoint: config.endpoint,
            timeout,
            client,
        })
    }

    /// Infallible variant of [`Self::try_from_config`].
    ///
    /// If the client cannot be built (TLS backend init), falls back to
    /// `reqwest::Client::default()`, which carries no request timeout.
    pub fn from_config(config: PublisherConfig) -> Self {
        let endpoint = config.endpoint.clone();
        let timeout = config.timeout();
        Self::try_from_config(config).unwrap_or_else(|e| {
            warn!("{}, using a default client without timeout", e);
            Self {
                endpoint,
                timeout,
                client: reqwest::Client::default(),
            }
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full ingestion URL, `None` when disabled
    pub fn telemetry_url(&self) -> Option<String> {
        self.endpoint
            .as_deref()
            .map(|base| format!("{}{}", base, TELEMETRY_PATH))
    }

    /// Publish one reading
    pub async fn publish(
        &self,
        device_id: &str,
        metric: &str,
        value: f64,
        unit: &str,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<(), PublishError> {
        let mut record = TelemetryRecord::new(device_id, metric, value, unit);
        record.recorded_at = recorded_at;
        self.publish_record(record).await
    }

    /// Publish one reading for a numeric sensor, deriving its device id
    pub async fn publish_sensor_reading(
        &self,
        sensor_id: u64,
        metric: &str,
        value: f64,
        unit: &str,
        recorded_at: Option<DateTime<Utc>>,
    ) -> Result<(), PublishError> {
        let device_id = derive_device_id(sensor_id)?;
        self.publish(&device_id, metric, value, unit, recorded_at).await
    }

    /// Publish a prepared record
    pub async fn publish_record(&self, record: TelemetryRecord) -> Result<(), PublishError> {
        let Some(url) = self.telemetry_url() else {
            debug!(
                "Telemetry disabled, dropping {} reading for {}",
                record.metric, record.device_id
            );
            return Ok(());
        };

        let body = record.stamped().to_json()?;

        let request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(PublishError::CreateRequest)?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(PublishError::Send)?;

        let status = response.status();
        drop(response);

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(PublishError::Status(status.as_u16()));
        }

        debug!("Telemetry sent to {} ({})", url, status);
        Ok(())
    }

    /// Query the data hub health endpoint; a disabled publisher is always healthy
    pub async fn health(&self) -> Result<(), PublishError> {
        let Some(base) = self.endpoint.as_deref() else {
            return Ok(());
        };
        let url = format!("{}{}", base, HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(PublishError::Health)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Unhealthy(format!("unreadable health response: {}", e)))?;

        if health.status != "ok" {
            return Err(PublishError::Unhealthy(health.status));
        }

        debug!("Data hub at {} is healthy", base);
        Ok(())
    }
}
