//! Tracking service records and movement status.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Speed and heartbeat of a single location report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    /// Speed in km/h.
    #[serde(default, deserialize_with = "lenient_number")]
    pub speed: Option<f64>,

    /// Timestamp of the last update, as sent by the tracking service.
    #[serde(default, alias = "last_update", alias = "lastUpdate", deserialize_with = "lenient_timestamp")]
    pub last_update_timestamp: Option<String>,
}

impl LocationSample {
    pub fn new(speed: Option<f64>, last_update_timestamp: Option<&str>) -> Self {
        Self {
            speed,
            last_update_timestamp: last_update_timestamp.map(str::to_string),
        }
    }
}

/// One driver as reported by the tracking service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverLocation {
    #[serde(deserialize_with = "id_as_string")]
    pub driver_id: String,

    #[serde(default)]
    pub driver_name: String,

    #[serde(default, deserialize_with = "lenient_number")]
    pub speed: Option<f64>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_update: Option<String>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl DriverLocation {
    /// The part of the record the classifier looks at.
    pub fn sample(&self) -> LocationSample {
        LocationSample {
            speed: self.speed,
            last_update_timestamp: self.last_update.clone(),
        }
    }
}

/// Derived movement state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Moving,
    Stopped,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Moving => "moving",
            MovementStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accept numbers and numeric strings; anything else is treated as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

/// Keep strings, turn numbers into epoch-millisecond strings, drop anything else.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(|ms| ms.to_string()),
        _ => None,
    }))
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_location_lenient_fields() {
        let driver: DriverLocation = serde_json::from_value(json!({
            "driver_id": 42,
            "driver_name": "Ana",
            "speed": "12.5",
            "last_update": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(driver.driver_id, "42");
        assert_eq!(driver.speed, Some(12.5));
        assert_eq!(driver.latitude, None);
    }

    #[test]
    fn test_non_numeric_speed_is_absent() {
        let driver: DriverLocation = serde_json::from_value(json!({
            "driver_id": "d1",
            "speed": "fast",
        }))
        .unwrap();
        assert_eq!(driver.speed, None);

        let sample: LocationSample = serde_json::from_value(json!({
            "speed": true,
            "lastUpdateTimestamp": null
        }))
        .unwrap();
        assert_eq!(sample, LocationSample::default());
    }

    #[test]
    fn test_non_string_timestamp_is_tolerated() {
        let drivers: Vec<DriverLocation> = serde_json::from_value(json!([
            {"driver_id": 1, "speed": 0, "last_update": 1704067200000u64},
            {"driver_id": 2, "speed": 0, "last_update": {"seconds": 1}},
            {"driver_id": 3, "speed": 0, "last_update": [2024]},
        ]))
        .unwrap();

        assert_eq!(drivers[0].last_update.as_deref(), Some("1704067200000"));
        assert_eq!(drivers[1].last_update, None);
        assert_eq!(drivers[2].last_update, None);

        let sample: LocationSample = serde_json::from_value(json!({
            "speed": 1,
            "lastUpdateTimestamp": false
        }))
        .unwrap();
        assert_eq!(sample.last_update_timestamp, None);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(MovementStatus::Stopped).unwrap(), json!("stopped"));
        assert_eq!(MovementStatus::Moving.to_string(), "moving");
    }
}
