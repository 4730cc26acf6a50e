//! Telemetry record (matches the data hub `POST /api/v1/telemetry` body)

use chrono::{DateTime, Utc};
use serde::{ser::Error as _, Deserialize, Serialize};

/// One measurement reading destined for the data hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    pub metric: String,
    pub value: f64,
    pub unit: String,
    /// RFC3339 on the wire, omitted when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl TelemetryRecord {
    pub fn new(
        device_id: impl Into<String>,
        metric: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            metric: metric.into(),
            value,
            unit: unit.into(),
            recorded_at: None,
        }
    }

    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Fill in the current time if no timestamp was supplied
    pub fn stamped(mut self) -> Self {
        self.recorded_at.get_or_insert_with(Utc::now);
        self
    }

    /// JSON body for the ingestion API.
    ///
    /// NaN and infinities are rejected; serde_json would otherwise write them as `null`.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        if !self.value.is_finite() {
            return Err(serde_json::Error::custom(format!(
                "value {} for {} is not a finite number",
                self.value, self.metric
            )));
        }
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_wire_field_names() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let record = TelemetryRecord::new("dev-1", "temperature", 21.5, "C").recorded_at(at);

        let json: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["device_id"], "dev-1");
        assert_eq!(json["metric"], "temperature");
        assert_eq!(json["value"], 21.5);
        assert_eq!(json["unit"], "C");
        let sent = DateTime::parse_from_rfc3339(json["recorded_at"].as_str().unwrap()).unwrap();
        assert_eq!(sent.with_timezone(&Utc), at);
    }

    #[test]
    fn test_unset_timestamp_is_omitted() {
        let record = TelemetryRecord::new("dev-1", "humidity", 40.0, "%");
        let json: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert!(json.get("recorded_at").is_none());
    }

    #[test]
    fn test_non_finite_values_do_not_serialize() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let record = TelemetryRecord::new("d", "temperature", value, "C");
            let err = record.to_json().unwrap_err();
            assert!(err.to_string().contains("not a finite number"), "{}", err);
        }
    }

    #[test]
    fn test_stamped_keeps_supplied_time() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let record = TelemetryRecord::new("d", "m", 1.0, "u").recorded_at(at).stamped();
        assert_eq!(record.recorded_at, Some(at));
    }

    #[test]
    fn test_stamped_fills_now() {
        let before = Utc::now();
        let record = TelemetryRecord::new("d", "m", 1.0, "u").stamped();
        let after = Utc::now();
        let at = record.recorded_at.unwrap();
        assert!(at >= before && at <= after);
    }
}
