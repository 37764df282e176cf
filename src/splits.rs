//! Split and lap boundaries
//!
//! Splits are automatic: a record is emitted every time accumulated distance
//! crosses the next multiple of the split interval. Laps are manual: the user
//! marks a boundary and the lap covers everything since the previous one.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_MAX_SPLITS_PER_UPDATE, DEFAULT_SPLIT_INTERVAL_M};
use crate::types::{LapRecord, SplitRecord};

/// Emits a [`SplitRecord`] each time distance crosses a split mark
#[derive(Debug, Clone)]
pub struct SplitDetector {
    interval_m: NonZeroU32,
    /// Most records one update may emit
    max_per_update: u64,
    /// Distance of the last mark that produced a split (meters)
    last_split_distance_m: u64,
    /// Elapsed time when the last split was emitted (seconds)
    last_split_time_secs: f64,
    /// Distance into the running split (meters)
    current_split_distance_m: u64,
    splits: Vec<SplitRecord>,
}

impl Default for SplitDetector {
    fn default() -> Self {
        Self::new(NonZeroU32::new(DEFAULT_SPLIT_INTERVAL_M).unwrap_or(NonZeroU32::MIN))
    }
}

impl SplitDetector {
    pub fn new(interval_m: NonZeroU32) -> Self {
        Self {
            interval_m,
            max_per_update: u64::from(DEFAULT_MAX_SPLITS_PER_UPDATE),
            last_split_distance_m: 0,
            last_split_time_secs: 0.0,
            current_split_distance_m: 0,
            splits: Vec::new(),
        }
    }

    /// Limit the records a single update may emit
    pub fn with_max_per_update(mut self, max_per_update: NonZeroU32) -> Self {
        self.max_per_update = u64::from(max_per_update.get());
        self
    }

    /// Check progress against the next mark and return the splits it produced.
    ///
    /// A jump across several marks in one update (e.g. after a GPS gap) emits
    /// one record per mark, in order. The time since the previous split is
    /// shared evenly between them since there is no finer information.
    /// Marks beyond the per-update limit are passed without a record.
    pub fn on_progress(
        &mut self,
        total_distance_m: f64,
        elapsed_secs: f64,
        speed_kmh: f64,
        stroke_rate_spm: f64,
    ) -> &[SplitRecord] {
        let first_new = self.splits.len();
        if total_distance_m.is_nan() || total_distance_m <= 0.0 {
            return &self.splits[first_new..];
        }

        let reached_m = total_distance_m.floor() as u64;
        let interval = u64::from(self.interval_m.get());
        let next_mark = self.last_split_distance_m + interval;

        if reached_m >= next_mark {
            let crossed = (reached_m - self.last_split_distance_m) / interval;
            let interval_time = (elapsed_secs - self.last_split_time_secs).max(0.0);
            let share = interval_time / crossed as f64;
            let emitted = crossed.min(self.max_per_update);

            for _ in 0..emitted {
                self.last_split_distance_m += interval;
                let split = SplitRecord {
                    sequence: self.splits.len() as u32 + 1,
                    interval_distance_m: interval as f64,
                    elapsed_secs: share,
                    average_speed_kmh: speed_kmh,
                    stroke_rate_spm,
                };
                info!(
                    sequence = split.sequence,
                    mark_m = self.last_split_distance_m,
                    pace_500m_secs = split.pace_500m_secs(),
                    "[Split] new split"
                );
                self.splits.push(split);
            }
            if crossed > emitted {
                let skipped = crossed - emitted;
                self.last_split_distance_m += skipped * interval;
                warn!(
                    skipped,
                    mark_m = self.last_split_distance_m,
                    "[Split] too many marks in one update, skipping"
                );
            }
            self.last_split_time_secs = elapsed_secs.max(self.last_split_time_secs);
        }

        self.current_split_distance_m = reached_m.saturating_sub(self.last_split_distance_m);
        &self.splits[first_new..]
    }

    /// Change the interval; the next mark is measured from the last split
    pub fn set_interval(&mut self, interval_m: NonZeroU32) {
        self.interval_m = interval_m;
    }

    pub fn interval_m(&self) -> u32 {
        self.interval_m.get()
    }

    pub fn splits(&self) -> &[SplitRecord] {
        &self.splits
    }

    /// Distance covered since the last split mark (meters)
    pub fn current_split_distance_m(&self) -> f64 {
        self.current_split_distance_m as f64
    }

    /// Pace statistics over all splits, if any
    pub fn summary(&self) -> Option<SplitSummary> {
        SplitSummary::from_splits(&self.splits)
    }

    /// Clear all splits; the interval and limit are kept
    pub fn reset(&mut self) {
        *self = Self {
            max_per_update: self.max_per_update,
            ..Self::new(self.interval_m)
        };
    }
}

/// Pace statistics across splits (seconds per 500 m)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub count: usize,
    pub average_pace_secs: f64,
    pub best_pace_secs: f64,
    pub worst_pace_secs: f64,
}

impl SplitSummary {
    pub fn from_splits(splits: &[SplitRecord]) -> Option<Self> {
        if splits.is_empty() {
            return None;
        }
        let paces: Vec<f64> = splits.iter().map(SplitRecord::pace_500m_secs).collect();
        let sum: f64 = paces.iter().sum();
        Some(Self {
            count: paces.len(),
            average_pace_secs: sum / paces.len() as f64,
            best_pace_secs: paces.iter().copied().fold(f64::INFINITY, f64::min),
            worst_pace_secs: paces.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    pub fn rating(&self) -> PerformanceRating {
        PerformanceRating::from_pace(self.average_pace_secs)
    }
}

/// Coarse performance band from a 500 m pace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Elite,
    Excellent,
    Good,
    Average,
    Beginner,
}

impl PerformanceRating {
    /// Rate a pace in seconds per 500 m
    pub fn from_pace(pace_secs: f64) -> Self {
        match pace_secs {
            p if (0.0..90.0).contains(&p) => PerformanceRating::Elite,
            p if (90.0..105.0).contains(&p) => PerformanceRating::Excellent,
            p if (105.0..120.0).contains(&p) => PerformanceRating::Good,
            p if (120.0..150.0).contains(&p) => PerformanceRating::Average,
            _ => PerformanceRating::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceRating::Elite => "elite",
            PerformanceRating::Excellent => "excellent",
            PerformanceRating::Good => "good",
            PerformanceRating::Average => "average",
            PerformanceRating::Beginner => "beginner",
        }
    }
}

/// Records user-triggered lap boundaries
#[derive(Debug, Clone, Default)]
pub struct LapTracker {
    lap_start_distance_m: f64,
    lap_start_time_secs: f64,
    laps: Vec<LapRecord>,
}

impl LapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the current lap at the given totals and start the next one
    pub fn add_lap(&mut self, total_distance_m: f64, elapsed_secs: f64) -> LapRecord {
        let distance_m = (total_distance_m - self.lap_start_distance_m).max(0.0);
        let lap_secs = (elapsed_secs - self.lap_start_time_secs).max(0.0);
        let average_speed_kmh = if lap_secs > 0.0 {
            (distance_m / 1000.0) / (lap_secs / 3600.0)
        } else {
            0.0
        };

        let lap = LapRecord {
            id: Uuid::new_v4(),
            number: self.laps.len() as u32 + 1,
            distance_m,
            elapsed_secs: lap_secs,
            average_speed_kmh,
        };
        info!(
            number = lap.number,
            distance_m = lap.distance_m,
            elapsed_secs = lap.elapsed_secs,
            "[Lap] added"
        );

        self.laps.push(lap.clone());
        self.lap_start_distance_m = total_distance_m;
        self.lap_start_time_secs = elapsed_secs;
        lap
    }

    pub fn laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(interval: u32) -> SplitDetector {
        SplitDetector::new(NonZeroU32::new(interval).unwrap())
    }

    #[test]
    fn test_single_crossing_emits_one_split() {
        let mut splits = detector(500);
        assert!(splits.on_progress(499.0, 100.0, 18.0, 24.0).is_empty());

        let new = splits.on_progress(501.0, 104.0, 18.0, 24.0);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].sequence, 1);
        assert_eq!(new[0].interval_distance_m, 500.0);
        assert_eq!(new[0].elapsed_secs, 104.0);
        assert_eq!(new[0].stroke_rate_spm, 24.0);
        assert_eq!(splits.current_split_distance_m(), 1.0);
    }

    #[test]
    fn test_fractional_distance_uses_floor() {
        let mut splits = detector(500);
        assert!(splits.on_progress(499.99, 100.0, 18.0, 24.0).is_empty());
        assert_eq!(splits.on_progress(500.0, 101.0, 18.0, 24.0).len(), 1);
    }

    #[test]
    fn test_multi_mark_jump_emits_one_per_mark() {
        let mut splits = detector(500);
        splits.on_progress(400.0, 80.0, 18.0, 24.0);

        // GPS gap: 400 m -> 1600 m crosses 500, 1000 and 1500
        let new = splits.on_progress(1600.0, 300.0, 20.0, 26.0);
        assert_eq!(new.len(), 3);
        let sequences: Vec<u32> = new.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        for split in new {
            assert!((split.elapsed_secs - 100.0).abs() < 1e-9);
        }
        assert_eq!(splits.current_split_distance_m(), 100.0);

        // Next split times from the update that emitted the batch
        let new = splits.on_progress(2000.0, 390.0, 20.0, 26.0);
        assert_eq!(new.len(), 1);
        assert!((new[0].elapsed_secs - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_jump_past_limit_emits_capped_records() {
        let cap = NonZeroU32::new(3).unwrap();
        let mut splits = detector(100).with_max_per_update(cap);

        // Exactly at the limit: every mark gets a record
        assert_eq!(splits.on_progress(300.0, 60.0, 18.0, 24.0).len(), 3);

        // One past the limit: the last mark is passed silently
        let new = splits.on_progress(750.0, 120.0, 18.0, 24.0);
        assert_eq!(new.len(), 3);
        assert!((new[0].elapsed_secs - 15.0).abs() < 1e-9);
        assert_eq!(splits.splits().len(), 6);
        assert_eq!(splits.current_split_distance_m(), 50.0);

        // Marks continue from the skipped position
        let new = splits.on_progress(800.0, 140.0, 18.0, 24.0);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].sequence, 7);
        assert!((new[0].elapsed_secs - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_jump_is_bounded() {
        let mut splits = detector(1);
        let new = splits.on_progress(5_000_000.0, 10.0, 18.0, 24.0);
        assert_eq!(new.len() as u32, DEFAULT_MAX_SPLITS_PER_UPDATE);
        assert_eq!(splits.current_split_distance_m(), 0.0);

        splits.reset();
        let new = splits.on_progress(5_000.0, 10.0, 18.0, 24.0);
        assert_eq!(new.len() as u32, DEFAULT_MAX_SPLITS_PER_UPDATE);
    }

    #[test]
    fn test_zero_distance_never_splits() {
        let mut splits = detector(1);
        assert!(splits.on_progress(0.0, 10.0, 0.0, 0.0).is_empty());
        assert!(splits.on_progress(f64::NAN, 10.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_interval_change_applies_from_last_split() {
        let mut splits = detector(500);
        splits.on_progress(510.0, 100.0, 18.0, 24.0);
        splits.set_interval(NonZeroU32::new(250).unwrap());

        assert!(splits.on_progress(700.0, 140.0, 18.0, 24.0).is_empty());
        let new = splits.on_progress(760.0, 150.0, 18.0, 24.0);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].interval_distance_m, 250.0);
        assert_eq!(splits.interval_m(), 250);
    }

    #[test]
    fn test_summary_and_rating() {
        let mut splits = detector(500);
        assert!(splits.summary().is_none());

        splits.on_progress(500.0, 100.0, 18.0, 24.0);
        splits.on_progress(1000.0, 220.0, 15.0, 22.0);

        let summary = splits.summary().unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.best_pace_secs - 100.0).abs() < 1e-9);
        assert!((summary.worst_pace_secs - 120.0).abs() < 1e-9);
        assert!((summary.average_pace_secs - 110.0).abs() < 1e-9);
        assert_eq!(summary.rating(), PerformanceRating::Good);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(PerformanceRating::from_pace(85.0), PerformanceRating::Elite);
        assert_eq!(PerformanceRating::from_pace(90.0), PerformanceRating::Excellent);
        assert_eq!(PerformanceRating::from_pace(119.9), PerformanceRating::Good);
        assert_eq!(PerformanceRating::from_pace(149.0), PerformanceRating::Average);
        assert_eq!(PerformanceRating::from_pace(200.0), PerformanceRating::Beginner);
    }

    #[test]
    fn test_reset_keeps_interval() {
        let mut splits = detector(250);
        splits.on_progress(600.0, 100.0, 18.0, 24.0);
        splits.reset();
        assert!(splits.splits().is_empty());
        assert_eq!(splits.interval_m(), 250);
        assert_eq!(splits.current_split_distance_m(), 0.0);
    }

    #[test]
    fn test_laps_measure_since_previous_boundary() {
        let mut laps = LapTracker::new();
        let first = laps.add_lap(1000.0, 240.0);
        assert_eq!(first.number, 1);
        assert_eq!(first.distance_m, 1000.0);
        // 1 km in 4 minutes = 15 km/h
        assert!((first.average_speed_kmh - 15.0).abs() < 1e-9);

        let second = laps.add_lap(1500.0, 390.0);
        assert_eq!(second.number, 2);
        assert_eq!(second.distance_m, 500.0);
        assert_eq!(second.elapsed_secs, 150.0);
        assert!((second.average_speed_kmh - 12.0).abs() < 1e-9);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_zero_time_lap_has_zero_speed() {
        let mut laps = LapTracker::new();
        let lap = laps.add_lap(0.0, 0.0);
        assert_eq!(lap.average_speed_kmh, 0.0);
        laps.reset();
        assert!(laps.laps().is_empty());
    }
}
