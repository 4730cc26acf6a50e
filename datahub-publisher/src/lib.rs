//! Data Hub Publisher - telemetry client for the smart home data hub
//!
//! Sends one sensor reading at a time to the data hub ingestion API:
//! - `POST {endpoint}/api/v1/telemetry` with a JSON body
//! - Synthetic UUID-shaped device ids derived from numeric sensor ids
//! - Explicitly disabled when no endpoint is configured
//! - Health check against `GET {endpoint}/health`

pub mod config;
pub mod device_id;
pub mod error;
pub mod publisher;
pub mod record;

pub use config::PublisherConfig;
pub use device_id::{derive_device_id, parse_sensor_id};
pub use error::PublishError;
pub use publisher::TelemetryPublisher;
pub use record::TelemetryRecord;
