//! Configuration structures for classification and extraction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FrotaError, Result};

/// Main configuration for frota.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrotaConfig {
    /// Movement classification thresholds.
    pub tracking: TrackingConfig,

    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Session storage.
    pub session: SessionConfig,
}

/// Movement classifier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Speeds strictly above this (km/h) count as moving.
    pub moving_speed_threshold_kmh: f64,

    /// A heartbeat at least this old (minutes) without speed means stopped.
    pub stopped_after_minutes: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            moving_speed_threshold_kmh: 3.0,
            stopped_after_minutes: 10,
        }
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Days added to the issue date when no due date was found.
    pub payment_term_days: u32,

    /// Confidence below which records are flagged for review. `None` disables the gate.
    pub min_confidence: Option<f64>,

    /// Maximum characters scanned after an installment marker.
    pub installment_window_chars: usize,

    /// Parse DANFE product rows from raw text when the field bag has no line items.
    pub text_line_items: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            payment_term_days: 30,
            min_confidence: None,
            installment_window_chars: 160,
            text_line_items: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file; front ends pick a default location when unset.
    pub file: Option<PathBuf>,
}

impl FrotaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FrotaError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
