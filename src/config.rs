//! Engine configuration
//!
//! All tuning constants live here as named, overridable values. Every struct
//! deserializes from JSON with per-field defaults, so a config file only needs
//! to mention the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Default maximum accepted accuracy radius (meters)
pub const DEFAULT_MAX_ACCURACY_M: f64 = 50.0;
/// Default maximum fix age (seconds)
pub const DEFAULT_MAX_FIX_AGE_SECS: f64 = 5.0;
/// Default displacement above which a fix counts regardless of speed (meters)
pub const DEFAULT_MIN_DELTA_M: f64 = 2.0;
/// Default speed above which a fix counts regardless of displacement (m/s)
pub const DEFAULT_MIN_SPEED_MPS: f64 = 0.5;
/// Default speed smoothing window (fixes)
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;
/// Default split interval (meters)
pub const DEFAULT_SPLIT_INTERVAL_M: u32 = 500;
/// Default limit on split records a single update may emit. A GPS glitch can
/// jump thousands of kilometers; marks beyond the limit are skipped.
pub const DEFAULT_MAX_SPLITS_PER_UPDATE: u32 = 20;
/// Default energy estimate per kilometer (kcal)
pub const DEFAULT_CALORIES_PER_KM: f64 = 50.0;
/// Default distance covered by one stroke (meters)
pub const DEFAULT_METERS_PER_STROKE: f64 = 9.0;

/// Fix filtering and accumulation thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fixes with a larger accuracy radius are dropped (meters)
    pub max_allowed_accuracy_m: f64,
    /// Fixes older than this are dropped (seconds)
    pub max_fix_age_secs: f64,
    /// Displacement that always counts as movement (meters)
    pub min_delta_to_accumulate_m: f64,
    /// Speed that always counts as movement (m/s)
    pub min_speed_threshold_mps: f64,
    /// Number of fixes averaged for display speed
    pub smoothing_window_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_allowed_accuracy_m: DEFAULT_MAX_ACCURACY_M,
            max_fix_age_secs: DEFAULT_MAX_FIX_AGE_SECS,
            min_delta_to_accumulate_m: DEFAULT_MIN_DELTA_M,
            min_speed_threshold_mps: DEFAULT_MIN_SPEED_MPS,
            smoothing_window_size: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.smoothing_window_size == 0 {
            return Err(TrackError::InvalidConfig(
                "smoothing_window_size must be positive".to_string(),
            ));
        }
        positive("max_allowed_accuracy_m", self.max_allowed_accuracy_m)?;
        positive("max_fix_age_secs", self.max_fix_age_secs)?;
        non_negative("min_delta_to_accumulate_m", self.min_delta_to_accumulate_m)?;
        non_negative("min_speed_threshold_mps", self.min_speed_threshold_mps)?;
        Ok(())
    }
}

/// Heuristic mapping from boat speed to stroke rate.
///
/// There is no cadence sensor, so stroke rate is estimated as
/// `base_spm + (speed_kmh / reference_speed_kmh) * spm_per_reference`,
/// clamped to `[min_spm, max_spm]`. Typical crews sit around 18-22 SPM when
/// paddling light and 30-36 SPM at race pace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeModel {
    pub base_spm: f64,
    pub reference_speed_kmh: f64,
    pub spm_per_reference: f64,
    pub min_spm: f64,
    pub max_spm: f64,
}

impl Default for StrokeModel {
    fn default() -> Self {
        Self {
            base_spm: 18.0,
            reference_speed_kmh: 5.0,
            spm_per_reference: 8.0,
            min_spm: 16.0,
            max_spm: 40.0,
        }
    }
}

impl StrokeModel {
    /// Estimated strokes per minute at the given speed (m/s)
    pub fn estimate(&self, speed_mps: f64) -> f64 {
        let speed_kmh = speed_mps * crate::types::MPS_TO_KMH;
        let spm = self.base_spm + (speed_kmh / self.reference_speed_kmh) * self.spm_per_reference;
        spm.clamp(self.min_spm, self.max_spm)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        positive("stroke_model.reference_speed_kmh", self.reference_speed_kmh)?;
        non_negative("stroke_model.min_spm", self.min_spm)?;
        if !self.max_spm.is_finite() || self.min_spm > self.max_spm {
            return Err(TrackError::InvalidConfig(format!(
                "stroke_model.min_spm ({}) exceeds max_spm ({})",
                self.min_spm, self.max_spm
            )));
        }
        Ok(())
    }
}

/// Constants behind the energy and stroke-count estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Energy estimate per kilometer rowed (kcal)
    pub calories_per_km: f64,
    /// Average distance per stroke (meters)
    pub meters_per_stroke: f64,
    pub stroke_model: StrokeModel,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            calories_per_km: DEFAULT_CALORIES_PER_KM,
            meters_per_stroke: DEFAULT_METERS_PER_STROKE,
            stroke_model: StrokeModel::default(),
        }
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), TrackError> {
        non_negative("calories_per_km", self.calories_per_km)?;
        positive("meters_per_stroke", self.meters_per_stroke)?;
        self.stroke_model.validate()
    }
}

/// Full engine configuration, passed in at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filter: FilterConfig,
    pub stats: StatsConfig,
    /// Distance between split marks (meters)
    pub split_interval_m: u32,
    /// Most split records one fix may emit
    pub max_splits_per_update: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            stats: StatsConfig::default(),
            split_interval_m: DEFAULT_SPLIT_INTERVAL_M,
            max_splits_per_update: DEFAULT_MAX_SPLITS_PER_UPDATE,
        }
    }
}

impl SessionConfig {
    /// Check every value; the engine refuses to start with a bad config
    pub fn validate(&self) -> Result<(), TrackError> {
        self.filter.validate()?;
        self.stats.validate()?;
        if self.split_interval_m == 0 {
            return Err(TrackError::InvalidConfig(
                "split_interval_m must be positive".to_string(),
            ));
        }
        if self.max_splits_per_update == 0 {
            return Err(TrackError::InvalidConfig(
                "max_splits_per_update must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn positive(name: &str, value: f64) -> Result<(), TrackError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackError::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), TrackError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TrackError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}
