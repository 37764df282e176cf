//! Core types for the Kurek pipeline
//!
//! This module defines the values that flow through each stage of the
//! pipeline: raw fixes, filter verdicts, split and lap records, and the
//! read-only views handed to presentation and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversion factor from meters per second to kilometers per hour
pub const MPS_TO_KMH: f64 = 3.6;

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and within WGS84 bounds
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One sensor observation of position, speed and accuracy.
///
/// Accuracy and speed come straight from the location provider and may carry
/// negative "unknown" sentinels or absurd values; they are sanitized by the
/// validator before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude (degrees)
    pub latitude: f64,
    /// Longitude (degrees)
    pub longitude: f64,
    /// Horizontal accuracy radius (meters, negative = invalid)
    pub horizontal_accuracy_m: f64,
    /// Instantaneous speed (m/s, negative = unknown)
    pub speed_mps: f64,
    /// When the provider took the fix
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// A fix that passed validation, with speed clamped to be non-negative
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanitizedFix {
    pub position: Position,
    pub horizontal_accuracy_m: f64,
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

/// Why a fix was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Older than the configured maximum fix age
    Stale,
    /// Negative or non-finite accuracy
    InvalidAccuracy,
    /// Accuracy radius above the configured maximum
    LowConfidence,
    /// Latitude/longitude out of range or non-finite
    InvalidCoordinate,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Stale => "stale",
            RejectReason::InvalidAccuracy => "invalid_accuracy",
            RejectReason::LowConfidence => "low_confidence",
            RejectReason::InvalidCoordinate => "invalid_coordinate",
        }
    }
}

/// Result of validating a single fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixVerdict {
    Accepted(SanitizedFix),
    Rejected(RejectReason),
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Paused,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Active => "active",
            SessionPhase::Paused => "paused",
        }
    }
}

/// What the engine did with an incoming fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Fix flowed through the whole pipeline
    Accepted {
        /// Distance added to the running total (0 for bootstrap or jitter)
        delta_m: f64,
        /// Smoothed speed after this fix (m/s)
        smoothed_speed_mps: f64,
        /// Number of split records emitted by this fix
        new_splits: usize,
    },
    /// Session paused: fix only moved the distance reference
    Anchored,
    /// Fix failed validation and changed nothing
    Rejected(RejectReason),
    /// Session idle: fix was dropped without validation
    Ignored,
}

/// A fixed-distance interval snapshot. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// 1-based split number
    pub sequence: u32,
    /// Interval length (meters)
    pub interval_distance_m: f64,
    /// Time taken to cover the interval (seconds)
    pub elapsed_secs: f64,
    /// Smoothed speed at the moment the mark was crossed (km/h)
    pub average_speed_kmh: f64,
    /// Estimated stroke rate at the moment the mark was crossed (SPM)
    pub stroke_rate_spm: f64,
}

impl SplitRecord {
    /// Time per 500 m for this split (seconds)
    pub fn pace_500m_secs(&self) -> f64 {
        if self.interval_distance_m <= 0.0 {
            return 0.0;
        }
        self.elapsed_secs / self.interval_distance_m * 500.0
    }
}

/// A user-triggered segment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub id: Uuid,
    /// 1-based lap number
    pub number: u32,
    /// Distance covered since the previous lap boundary (meters)
    pub distance_m: f64,
    /// Time since the previous lap boundary (seconds)
    pub elapsed_secs: f64,
    /// Average speed over the lap (km/h)
    pub average_speed_kmh: f64,
}

/// Live view for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub phase: SessionPhase,
    pub smoothed_speed_kmh: f64,
    pub raw_speed_kmh: f64,
    pub total_distance_m: f64,
    pub elapsed_secs: f64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub stroke_rate_spm: f64,
    pub total_strokes: f64,
    pub calories: f64,
    /// Time per 500 m at the session average speed, if moving
    pub pace_500m_secs: Option<f64>,
    /// Distance covered since the last split mark (meters)
    pub current_split_distance_m: f64,
    pub split_count: usize,
    pub lap_count: usize,
}

/// Finalized, immutable snapshot handed to the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub distance_m: f64,
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub calories: f64,
    pub total_strokes: f64,
    pub laps: Vec<LapRecord>,
}

impl SessionSummary {
    /// Load a summary from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the summary to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Counters describing how the filter treated incoming fixes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDiagnostics {
    pub accepted: u64,
    pub anchored: u64,
    pub ignored: u64,
    pub stale: u64,
    pub invalid_accuracy: u64,
    pub low_confidence: u64,
    pub invalid_coordinate: u64,
}

impl FilterDiagnostics {
    pub(crate) fn record_rejection(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::Stale => self.stale += 1,
            RejectReason::InvalidAccuracy => self.invalid_accuracy += 1,
            RejectReason::LowConfidence => self.low_confidence += 1,
            RejectReason::InvalidCoordinate => self.invalid_coordinate += 1,
        }
    }

    /// Total number of rejected fixes
    pub fn rejected(&self) -> u64 {
        self.stale + self.invalid_accuracy + self.low_confidence + self.invalid_coordinate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_validity() {
        assert!(Position::new(41.0, 29.0).is_valid());
        assert!(!Position::new(91.0, 29.0).is_valid());
        assert!(!Position::new(41.0, -181.0).is_valid());
        assert!(!Position::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_split_pace() {
        let split = SplitRecord {
            sequence: 1,
            interval_distance_m: 500.0,
            elapsed_secs: 120.0,
            average_speed_kmh: 15.0,
            stroke_rate_spm: 24.0,
        };
        assert!((split.pace_500m_secs() - 120.0).abs() < 1e-9);

        let longer = SplitRecord {
            interval_distance_m: 1000.0,
            ..split
        };
        assert!((longer.pace_500m_secs() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_diagnostics_rejected_total() {
        let mut diag = FilterDiagnostics::default();
        diag.record_rejection(RejectReason::Stale);
        diag.record_rejection(RejectReason::LowConfidence);
        diag.record_rejection(RejectReason::LowConfidence);
        assert_eq!(diag.rejected(), 3);
        assert_eq!(diag.low_confidence, 2);
    }

    #[test]
    fn test_fix_deserializes_from_json() {
        let json = r#"{
            "latitude": 41.02,
            "longitude": 28.97,
            "horizontal_accuracy_m": 5.0,
            "speed_mps": -1.0,
            "timestamp": "2024-06-01T07:00:00Z"
        }"#;
        let fix: Fix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.position(), Position::new(41.02, 28.97));
        assert_eq!(fix.speed_mps, -1.0);
    }
}
