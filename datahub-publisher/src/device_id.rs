//! Synthetic device identifiers
//!
//! Sensors are addressed on the data hub by a UUID-shaped string whose last
//! group holds the numeric sensor id, zero-padded to 12 digits.

use crate::error::PublishError;

/// Fixed leading groups of every derived device id
pub const DEVICE_ID_PREFIX: &str = "00000000-0000-0000-0000-";

/// Largest sensor id that fits the 12-digit node group
pub const MAX_SENSOR_ID: u64 = 999_999_999_999;

const NODE_DIGITS: usize = 12;

/// Derive the data hub device id for a numeric sensor id.
///
/// Ids above [`MAX_SENSOR_ID`] are rejected instead of producing a 13+ digit
/// node group that no longer looks like a UUID.
pub fn derive_device_id(sensor_id: u64) -> Result<String, PublishError> {
    if sensor_id > MAX_SENSOR_ID {
        return Err(PublishError::SensorIdOverflow(sensor_id));
    }
    Ok(format!("{}{:0width$}", DEVICE_ID_PREFIX, sensor_id, width = NODE_DIGITS))
}

/// Recover the sensor id from a derived device id.
///
/// Returns `None` for ids outside the synthetic namespace.
pub fn parse_sensor_id(device_id: &str) -> Option<u64> {
    let node = device_id.strip_prefix(DEVICE_ID_PREFIX)?;
    if node.len() != NODE_DIGITS || !node.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    node.parse().ok()
}
