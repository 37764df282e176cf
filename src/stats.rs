//! Session statistics
//!
//! Consumes smoothed speed and distance deltas and maintains the running
//! session aggregates: average and max speed, estimated stroke rate, total
//! strokes and energy. Inputs are ignored unless the session is active.

use crate::config::StatsConfig;
use crate::types::{SessionPhase, MPS_TO_KMH};

/// Running speed, stroke and energy aggregates
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    config: StatsConfig,
    /// Number of non-zero smoothed speeds seen while active
    sample_count: usize,
    /// Running sum of those speeds (m/s)
    speed_sum: f64,
    average_speed: f64,
    max_speed: f64,
    stroke_rate: f64,
    total_strokes: f64,
    calories: f64,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

impl StatsAggregator {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            sample_count: 0,
            speed_sum: 0.0,
            average_speed: 0.0,
            max_speed: 0.0,
            stroke_rate: 0.0,
            total_strokes: 0.0,
            calories: 0.0,
        }
    }

    /// Feed a smoothed speed (m/s)
    pub fn on_smoothed_speed(&mut self, speed_mps: f64, phase: SessionPhase) {
        if phase != SessionPhase::Active {
            return;
        }

        if speed_mps > 0.0 {
            self.sample_count += 1;
            self.speed_sum += speed_mps;
            self.average_speed = self.speed_sum / self.sample_count as f64;
            self.max_speed = self.max_speed.max(speed_mps);
            self.stroke_rate = self.config.stroke_model.estimate(speed_mps);
        } else {
            self.stroke_rate = 0.0;
        }
    }

    /// Feed an accumulated distance delta (meters)
    pub fn on_distance_delta(&mut self, delta_m: f64, phase: SessionPhase) {
        if phase != SessionPhase::Active || delta_m.is_nan() || delta_m <= 0.0 {
            return;
        }
        self.calories += (delta_m / 1000.0) * self.config.calories_per_km;
        self.total_strokes += delta_m / self.config.meters_per_stroke;
    }

    pub fn average_speed_mps(&self) -> f64 {
        self.average_speed
    }

    pub fn max_speed_mps(&self) -> f64 {
        self.max_speed
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed * MPS_TO_KMH
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.max_speed * MPS_TO_KMH
    }

    /// Estimated strokes per minute at the latest speed
    pub fn stroke_rate_spm(&self) -> f64 {
        self.stroke_rate
    }

    pub fn total_strokes(&self) -> f64 {
        self.total_strokes
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Zero the live stroke rate without touching totals
    pub fn clear_stroke_rate(&mut self) {
        self.stroke_rate = 0.0;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ACTIVE: SessionPhase = SessionPhase::Active;

    #[test]
    fn test_average_ignores_zero_speeds() {
        let mut stats = StatsAggregator::default();
        stats.on_smoothed_speed(2.0, ACTIVE);
        stats.on_smoothed_speed(0.0, ACTIVE);
        stats.on_smoothed_speed(4.0, ACTIVE);

        assert_eq!(stats.sample_count(), 2);
        assert!((stats.average_speed_mps() - 3.0).abs() < 1e-9);
        assert!((stats.max_speed_mps() - 4.0).abs() < 1e-9);
        assert!((stats.max_speed_kmh() - 14.4).abs() < 1e-9);
    }

    #[test]
    fn test_long_session_average_from_running_sum() {
        let mut stats = StatsAggregator::default();
        for i in 0..10_000 {
            stats.on_smoothed_speed(if i % 2 == 0 { 2.0 } else { 4.0 }, ACTIVE);
        }
        assert_eq!(stats.sample_count(), 10_000);
        assert!((stats.average_speed_mps() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_inactive_phases_are_ignored() {
        let mut stats = StatsAggregator::default();
        for phase in [SessionPhase::Idle, SessionPhase::Paused] {
            stats.on_smoothed_speed(3.0, phase);
            stats.on_distance_delta(100.0, phase);
        }
        assert_eq!(stats.sample_count(), 0);
        assert_eq!(stats.calories(), 0.0);
        assert_eq!(stats.total_strokes(), 0.0);
    }

    #[test]
    fn test_stroke_rate_follows_speed() {
        let mut stats = StatsAggregator::default();
        stats.on_smoothed_speed(5.0 / 3.6, ACTIVE);
        assert!((stats.stroke_rate_spm() - 26.0).abs() < 1e-9);

        stats.on_smoothed_speed(0.0, ACTIVE);
        assert_eq!(stats.stroke_rate_spm(), 0.0);
    }

    #[test]
    fn test_distance_estimates() {
        let mut stats = StatsAggregator::default();
        stats.on_distance_delta(900.0, ACTIVE);
        stats.on_distance_delta(100.0, ACTIVE);

        // 1 km at 50 kcal/km, 1000 m at 9 m/stroke
        assert!((stats.calories() - 50.0).abs() < 1e-9);
        assert!((stats.total_strokes() - 1000.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_delta_ignored() {
        let mut stats = StatsAggregator::default();
        stats.on_distance_delta(0.0, ACTIVE);
        stats.on_distance_delta(-5.0, ACTIVE);
        stats.on_distance_delta(f64::NAN, ACTIVE);
        assert_eq!(stats.calories(), 0.0);
        assert_eq!(stats.total_strokes(), 0.0);
    }

    #[test]
    fn test_custom_constants() {
        let config = StatsConfig {
            calories_per_km: 80.0,
            meters_per_stroke: 10.0,
            ..Default::default()
        };
        let mut stats = StatsAggregator::new(config);
        stats.on_distance_delta(500.0, ACTIVE);
        assert!((stats.calories() - 40.0).abs() < 1e-9);
        assert!((stats.total_strokes() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_and_totals_monotonic() {
        let mut stats = StatsAggregator::default();
        let mut last = (0.0, 0.0, 0.0);
        for (i, speed) in [1.0, 3.0, 2.0, 0.0, 4.5, 1.0].into_iter().enumerate() {
            stats.on_smoothed_speed(speed, ACTIVE);
            stats.on_distance_delta(i as f64 * 3.0, ACTIVE);
            let now = (stats.max_speed_mps(), stats.calories(), stats.total_strokes());
            assert!(now.0 >= last.0 && now.1 >= last.1 && now.2 >= last.2);
            assert!(stats.max_speed_mps() >= speed);
            last = now;
        }
    }

    #[test]
    fn test_reset_idempotent() {
        let mut stats = StatsAggregator::default();
        stats.on_smoothed_speed(3.0, ACTIVE);
        stats.on_distance_delta(120.0, ACTIVE);

        stats.reset();
        let first = (stats.sample_count(), stats.max_speed_mps(), stats.calories());
        stats.reset();
        let second = (stats.sample_count(), stats.max_speed_mps(), stats.calories());

        assert_eq!(first, (0, 0.0, 0.0));
        assert_eq!(first, second);
    }
}
