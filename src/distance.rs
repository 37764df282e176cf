//! Distance integration
//!
//! Accumulates great-circle distance between consecutive accepted fixes while
//! suppressing GPS drift. A displacement counts when the boat is clearly moving
//! (speed above threshold) or when the jump is too large to be noise.

use tracing::debug;

use crate::config::FilterConfig;
use crate::types::Position;

/// Mean Earth radius (meters)
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two positions in meters
pub fn haversine_distance(a: &Position, b: &Position) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(b.latitude - a.latitude);
    let dlon = to_rad(b.longitude - a.longitude);
    let h = (dlat / 2.0).sin().powi(2)
        + to_rad(a.latitude).cos() * to_rad(b.latitude).cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Running-total distance with jitter suppression
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    last_position: Option<Position>,
    total_distance_m: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate a new position and return the distance added (meters).
    ///
    /// The first position only sets the reference. Suppressed jitter still
    /// moves the reference so small drifts never add up.
    pub fn accumulate(&mut self, position: Position, speed_mps: f64, config: &FilterConfig) -> f64 {
        let Some(last) = self.last_position.replace(position) else {
            debug!("[Distance] first fix set");
            return 0.0;
        };

        let delta = haversine_distance(&last, &position);
        let moving = speed_mps > config.min_speed_threshold_mps;
        let jumped = delta > config.min_delta_to_accumulate_m;

        if moving || jumped {
            self.total_distance_m += delta;
            debug!(
                delta_m = delta,
                total_m = self.total_distance_m,
                "[Distance] accumulated"
            );
            delta
        } else {
            0.0
        }
    }

    /// Move the reference without counting distance
    pub fn anchor(&mut self, position: Position) {
        self.last_position = Some(position);
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.total_distance_m = 0.0;
    }
}
