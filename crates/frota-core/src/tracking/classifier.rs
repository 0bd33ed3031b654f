//! Moving/stopped classification from speed and heartbeat age.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::config::TrackingConfig;
use crate::models::tracking::{DriverLocation, LocationSample, MovementStatus};

use super::parse_timestamp;

/// Classifies location samples as moving or stopped.
///
/// Rules, first match wins:
/// 1. finite speed above the threshold: moving
/// 2. heartbeat at least `stopped_after` old: stopped
/// 3. anything else: moving
///
/// Missing or malformed data falls through to rule 3, so sparse telemetry
/// never raises a stopped alarm on its own.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    moving_speed_threshold_kmh: f64,
    stopped_after: Duration,
}

impl MovementClassifier {
    /// Create a classifier with the default thresholds (3 km/h, 10 minutes).
    pub fn new() -> Self {
        Self::from_config(&TrackingConfig::default())
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            moving_speed_threshold_kmh: config.moving_speed_threshold_kmh,
            stopped_after: Duration::minutes(i64::from(config.stopped_after_minutes)),
        }
    }

    /// Set the moving speed threshold in km/h.
    pub fn with_speed_threshold(mut self, kmh: f64) -> Self {
        self.moving_speed_threshold_kmh = kmh;
        self
    }

    /// Set how old a heartbeat must be to count as stopped.
    pub fn with_stopped_after(mut self, after: Duration) -> Self {
        self.stopped_after = after;
        self
    }

    pub fn classify(&self, sample: &LocationSample, now: DateTime<Utc>) -> MovementStatus {
        if let Some(speed) = sample.speed {
            if speed.is_finite() && speed > self.moving_speed_threshold_kmh {
                return MovementStatus::Moving;
            }
        }

        let last_update = sample
            .last_update_timestamp
            .as_deref()
            .and_then(parse_timestamp);

        match last_update {
            Some(ts) if now - ts >= self.stopped_after => MovementStatus::Stopped,
            _ => MovementStatus::Moving,
        }
    }

    /// Classify every driver in a tracking snapshot.
    pub fn classify_fleet(&self, drivers: &[DriverLocation], now: DateTime<Utc>) -> FleetSnapshot {
        let drivers: Vec<DriverStatus> = drivers
            .iter()
            .map(|driver| {
                let sample = driver.sample();
                let idle_minutes = sample
                    .last_update_timestamp
                    .as_deref()
                    .and_then(parse_timestamp)
                    .map(|ts| (now - ts).num_minutes().max(0));

                DriverStatus {
                    driver_id: driver.driver_id.clone(),
                    driver_name: driver.driver_name.clone(),
                    status: self.classify(&sample, now),
                    speed: driver.speed.filter(|s| s.is_finite()),
                    last_update: driver.last_update.clone(),
                    idle_minutes,
                }
            })
            .collect();

        let stopped = drivers
            .iter()
            .filter(|d| d.status == MovementStatus::Stopped)
            .count();
        let moving = drivers.len() - stopped;

        debug!("Classified {} drivers: {} moving, {} stopped", drivers.len(), moving, stopped);

        FleetSnapshot {
            generated_at: now,
            moving,
            stopped,
            drivers,
        }
    }
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classification of one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStatus {
    pub driver_id: String,
    pub driver_name: String,
    pub status: MovementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    /// Whole minutes since the last heartbeat, when it parses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_minutes: Option<i64>,
}

/// Classified tracking snapshot with per-status counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub generated_at: DateTime<Utc>,
    pub moving: usize,
    pub stopped: usize,
    pub drivers: Vec<DriverStatus>,
}

/// Classify a sample with the default thresholds.
pub fn compute_movement_status(sample: &LocationSample, now: DateTime<Utc>) -> MovementStatus {
    MovementClassifier::new().classify(sample, now)
}

/// Classify a tracking snapshot with the default thresholds.
pub fn classify_fleet(drivers: &[DriverLocation], now: DateTime<Utc>) -> FleetSnapshot {
    MovementClassifier::new().classify_fleet(drivers, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    const MIDNIGHT: &str = "2024-01-01T00:00:00Z";

    #[test]
    fn test_speed_short_circuits() {
        let sample = LocationSample::new(Some(5.0), Some(MIDNIGHT));
        assert_eq!(compute_movement_status(&sample, at(0, 10)), MovementStatus::Moving);

        // even with a very old heartbeat
        assert_eq!(compute_movement_status(&sample, at(23, 0)), MovementStatus::Moving);

        let no_ts = LocationSample::new(Some(3.01), None);
        assert_eq!(compute_movement_status(&no_ts, at(0, 0)), MovementStatus::Moving);
    }

    #[test]
    fn test_stale_heartbeat_is_stopped() {
        let sample = LocationSample::new(Some(0.0), Some(MIDNIGHT));
        assert_eq!(compute_movement_status(&sample, at(0, 15)), MovementStatus::Stopped);

        // threshold is inclusive at exactly ten minutes
        assert_eq!(compute_movement_status(&sample, at(0, 10)), MovementStatus::Stopped);

        // speed equal to the threshold is not moving
        let slow = LocationSample::new(Some(3.0), Some(MIDNIGHT));
        assert_eq!(compute_movement_status(&slow, at(0, 10)), MovementStatus::Stopped);

        let no_speed = LocationSample::new(None, Some(MIDNIGHT));
        assert_eq!(compute_movement_status(&no_speed, at(1, 0)), MovementStatus::Stopped);
    }

    #[test]
    fn test_missing_or_recent_data_defaults_to_moving() {
        let recent = LocationSample::new(Some(0.0), Some(MIDNIGHT));
        assert_eq!(compute_movement_status(&recent, at(0, 9)), MovementStatus::Moving);

        let empty = LocationSample::new(None, None);
        assert_eq!(compute_movement_status(&empty, at(12, 0)), MovementStatus::Moving);

        let garbage = LocationSample::new(Some(f64::NAN), Some("not a time"));
        assert_eq!(compute_movement_status(&garbage, at(12, 0)), MovementStatus::Moving);

        let infinite = LocationSample::new(Some(f64::INFINITY), None);
        assert_eq!(compute_movement_status(&infinite, at(12, 0)), MovementStatus::Moving);

        // heartbeat from the future
        let future = LocationSample::new(Some(0.0), Some("2024-01-01T06:00:00Z"));
        assert_eq!(compute_movement_status(&future, at(0, 0)), MovementStatus::Moving);
    }

    #[test]
    fn test_epoch_millis_heartbeat() {
        let drivers: Vec<DriverLocation> = serde_json::from_value(serde_json::json!([
            {"driver_id": 1, "speed": 0, "last_update": 1704067200000u64},
            {"driver_id": 2, "speed": 0, "last_update": {"at": "yesterday"}},
        ]))
        .unwrap();

        let snapshot = classify_fleet(&drivers, at(0, 20));

        assert_eq!(snapshot.drivers[0].status, MovementStatus::Stopped);
        assert_eq!(snapshot.drivers[0].idle_minutes, Some(20));
        assert_eq!(snapshot.drivers[1].status, MovementStatus::Moving);
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = MovementClassifier::new()
            .with_speed_threshold(10.0)
            .with_stopped_after(Duration::minutes(2));

        let sample = LocationSample::new(Some(8.0), Some(MIDNIGHT));
        assert_eq!(classifier.classify(&sample, at(0, 3)), MovementStatus::Stopped);

        let config = TrackingConfig {
            moving_speed_threshold_kmh: 1.0,
            stopped_after_minutes: 30,
        };
        let classifier = MovementClassifier::from_config(&config);
        assert_eq!(classifier.classify(&sample, at(0, 3)), MovementStatus::Moving);
    }

    #[test]
    fn test_classify_fleet_counts() {
        let drivers = vec![
            DriverLocation {
                driver_id: "1".into(),
                driver_name: "Ana".into(),
                speed: Some(42.0),
                last_update: Some(MIDNIGHT.into()),
                ..Default::default()
            },
            DriverLocation {
                driver_id: "2".into(),
                driver_name: "Bruno".into(),
                speed: Some(0.0),
                last_update: Some(MIDNIGHT.into()),
                ..Default::default()
            },
            DriverLocation {
                driver_id: "3".into(),
                driver_name: "Carla".into(),
                ..Default::default()
            },
        ];

        let snapshot = classify_fleet(&drivers, at(0, 30));

        assert_eq!(snapshot.moving, 2);
        assert_eq!(snapshot.stopped, 1);
        assert_eq!(snapshot.drivers[1].status, MovementStatus::Stopped);
        assert_eq!(snapshot.drivers[1].idle_minutes, Some(30));
        assert_eq!(snapshot.drivers[2].idle_minutes, None);
    }
}
