//! Publisher error taxonomy
//!
//! Each variant names the phase that failed. A disabled publisher is not an
//! error and never produces one of these.

/// Errors returned by [`crate::TelemetryPublisher`] operations
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("marshal telemetry: {0}")]
    Marshal(#[from] serde_json::Error),
    #[error("create request: {0}")]
    CreateRequest(#[source] reqwest::Error),
    #[error("send telemetry: {0}")]
    Send(#[source] reqwest::Error),
    #[error("data hub returned status {0}")]
    Status(u16),
    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("check health: {0}")]
    Health(#[source] reqwest::Error),
    #[error("data hub unhealthy: {0}")]
    Unhealthy(String),
    #[error("sensor id {0} does not fit in a 12-digit device id segment")]
    SensorIdOverflow(u64),
}

impl PublishError {
    /// True for failures where the request never got a response (connect, DNS, timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Send(_) | Self::Health(_))
    }

    /// True when the request timed out waiting on the data hub
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Send(e) | Self::Health(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status carried by a protocol error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_contains_code() {
        let err = PublishError::Status(500);
        assert_eq!(err.to_string(), "data hub returned status 500");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_marshal_prefix() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PublishError::from(json_err);
        assert!(err.to_string().starts_with("marshal telemetry: "));
    }

    #[test]
    fn test_overflow_message() {
        let err = PublishError::SensorIdOverflow(1_000_000_000_000);
        assert!(err.to_string().contains("1000000000000"));
        assert!(!err.is_timeout());
    }
}
