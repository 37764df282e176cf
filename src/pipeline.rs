//! Pipeline orchestration
//!
//! This module provides the public API for Kurek Core. [`SessionEngine`] owns
//! every stage and runs each accepted fix through the full pipeline:
//!
//! 1. FixValidator - drop stale, low-confidence and malformed fixes
//! 2. SpeedSmoother - moving average of instantaneous speed
//! 3. DistanceAccumulator - jitter-suppressed distance delta
//! 4. StatsAggregator - average/max speed, stroke rate, strokes, energy
//! 5. SplitDetector - split records at every interval mark
//!
//! The session clock gates the pipeline: only an active session mutates
//! totals. Callers drive the engine with direct method calls or by applying
//! [`SessionEvent`] values; either way the engine is a single-writer state
//! machine and must be serialized by the caller (see `shared`).

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::clock::{SessionClock, Transition};
use crate::config::SessionConfig;
use crate::distance::DistanceAccumulator;
use crate::error::TrackError;
use crate::format::pace_500m_from_kmh;
use crate::smoother::SpeedSmoother;
use crate::splits::{LapTracker, SplitDetector, SplitSummary};
use crate::stats::StatsAggregator;
use crate::types::{
    FilterDiagnostics, Fix, FixOutcome, FixVerdict, LapRecord, LiveMetrics, Position,
    SessionPhase, SessionSummary, SplitRecord, MPS_TO_KMH,
};
use crate::validator::FixValidator;

/// One input to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A fix from the location provider, delivered at `received_at`
    Fix {
        fix: Fix,
        received_at: DateTime<Utc>,
    },
    /// Periodic clock refresh
    Tick { at: DateTime<Utc> },
    /// Start a new session or resume a paused one
    Start { at: DateTime<Utc> },
    Pause { at: DateTime<Utc> },
    Reset,
    /// Close the current lap
    Lap,
    SetSplitInterval { meters: NonZeroU32 },
}

/// What applying a [`SessionEvent`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Fix(FixOutcome),
    Transition(Transition),
    Lap(Option<LapRecord>),
    Updated,
}

/// Stateful workout engine
#[derive(Debug, Clone)]
pub struct SessionEngine {
    config: SessionConfig,
    clock: SessionClock,
    smoother: SpeedSmoother,
    distance: DistanceAccumulator,
    stats: StatsAggregator,
    splits: SplitDetector,
    laps: LapTracker,
    diagnostics: FilterDiagnostics,
    /// Sanitized speed of the latest accepted fix (m/s)
    raw_speed_mps: f64,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::build(SessionConfig::default(), SplitDetector::default())
    }
}

impl SessionEngine {
    /// Create an engine; fails fast on invalid configuration
    pub fn new(config: SessionConfig) -> Result<Self, TrackError> {
        config.validate()?;
        let interval = NonZeroU32::new(config.split_interval_m).ok_or_else(|| {
            TrackError::InvalidConfig("split_interval_m must be positive".to_string())
        })?;
        let max_splits = NonZeroU32::new(config.max_splits_per_update).ok_or_else(|| {
            TrackError::InvalidConfig("max_splits_per_update must be positive".to_string())
        })?;
        let splits = SplitDetector::new(interval).with_max_per_update(max_splits);
        Ok(Self::build(config, splits))
    }

    /// Create an engine from a JSON configuration
    pub fn from_config_json(json: &str) -> Result<Self, TrackError> {
        Self::new(SessionConfig::from_json(json)?)
    }

    fn build(config: SessionConfig, splits: SplitDetector) -> Self {
        Self {
            smoother: SpeedSmoother::new(config.filter.smoothing_window_size),
            stats: StatsAggregator::new(config.stats.clone()),
            clock: SessionClock::new(),
            distance: DistanceAccumulator::new(),
            splits,
            laps: LapTracker::new(),
            diagnostics: FilterDiagnostics::default(),
            raw_speed_mps: 0.0,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Start a fresh session from idle, or resume a paused one
    pub fn start(&mut self, now: DateTime<Utc>) -> Transition {
        if self.clock.phase() == SessionPhase::Idle {
            self.clear_accumulators();
        }
        let transition = self.clock.start(now);
        if transition.applied() {
            info!(?transition, elapsed_secs = self.clock.elapsed_secs(), "[Session] running");
        }
        transition
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Transition {
        let transition = self.clock.pause(now);
        if transition.applied() {
            info!(elapsed_secs = self.clock.elapsed_secs(), "[Session] paused");
        }
        transition
    }

    /// Return to idle and zero every accumulator
    pub fn reset(&mut self) -> Transition {
        self.clear_accumulators();
        self.diagnostics = FilterDiagnostics::default();
        info!("[Session] reset");
        self.clock.reset()
    }

    /// Refresh elapsed time from the wall clock
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.clock.tick(now);
    }

    /// Close the current lap. No-op while idle.
    pub fn add_lap_boundary(&mut self) -> Option<LapRecord> {
        if self.clock.phase() == SessionPhase::Idle {
            return None;
        }
        Some(
            self.laps
                .add_lap(self.distance.total_distance_m(), self.clock.elapsed_secs()),
        )
    }

    pub fn set_split_interval(&mut self, meters: NonZeroU32) {
        self.config.split_interval_m = meters.get();
        self.splits.set_interval(meters);
    }

    /// Run one fix through the pipeline
    pub fn ingest(&mut self, fix: &Fix, now: DateTime<Utc>) -> FixOutcome {
        let phase = self.clock.phase();
        if phase == SessionPhase::Idle {
            self.diagnostics.ignored += 1;
            return FixOutcome::Ignored;
        }

        let sanitized = match FixValidator::validate(fix, &self.config.filter, now) {
            FixVerdict::Accepted(sanitized) => sanitized,
            FixVerdict::Rejected(reason) => {
                self.diagnostics.record_rejection(reason);
                return FixOutcome::Rejected(reason);
            }
        };

        if phase == SessionPhase::Paused {
            // Keep the reference current so resuming does not count the pause
            self.distance.anchor(sanitized.position);
            self.diagnostics.anchored += 1;
            return FixOutcome::Anchored;
        }

        self.diagnostics.accepted += 1;
        self.raw_speed_mps = sanitized.speed_mps;

        let smoothed = self.smoother.push(sanitized.speed_mps);
        let delta = self.distance.accumulate(
            sanitized.position,
            sanitized.speed_mps,
            &self.config.filter,
        );
        self.stats.on_smoothed_speed(smoothed, phase);
        self.stats.on_distance_delta(delta, phase);

        // Split times use the freshest elapsed value, not the last tick
        self.clock.tick(now);
        let new_splits = self
            .splits
            .on_progress(
                self.distance.total_distance_m(),
                self.clock.elapsed_secs(),
                smoothed * MPS_TO_KMH,
                self.stats.stroke_rate_spm(),
            )
            .len();

        FixOutcome::Accepted {
            delta_m: delta,
            smoothed_speed_mps: smoothed,
            new_splits,
        }
    }

    /// Apply an explicit event
    pub fn apply(&mut self, event: SessionEvent) -> EngineOutput {
        match event {
            SessionEvent::Fix { fix, received_at } => {
                EngineOutput::Fix(self.ingest(&fix, received_at))
            }
            SessionEvent::Tick { at } => {
                self.tick(at);
                EngineOutput::Updated
            }
            SessionEvent::Start { at } => EngineOutput::Transition(self.start(at)),
            SessionEvent::Pause { at } => EngineOutput::Transition(self.pause(at)),
            SessionEvent::Reset => EngineOutput::Transition(self.reset()),
            SessionEvent::Lap => EngineOutput::Lap(self.add_lap_boundary()),
            SessionEvent::SetSplitInterval { meters } => {
                self.set_split_interval(meters);
                EngineOutput::Updated
            }
        }
    }

    fn clear_accumulators(&mut self) {
        self.smoother.reset();
        self.distance.reset();
        self.stats.reset();
        self.splits.reset();
        self.laps.reset();
        self.raw_speed_mps = 0.0;
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Live values for presentation. Speed and stroke rate read zero unless active.
    pub fn metrics(&self) -> LiveMetrics {
        let active = self.clock.is_active();
        let live = |value: f64| if active { value } else { 0.0 };

        LiveMetrics {
            phase: self.clock.phase(),
            smoothed_speed_kmh: live(self.smoother.smoothed() * MPS_TO_KMH),
            raw_speed_kmh: live(self.raw_speed_mps * MPS_TO_KMH),
            total_distance_m: self.distance.total_distance_m(),
            elapsed_secs: self.clock.elapsed_secs(),
            average_speed_kmh: self.stats.average_speed_kmh(),
            max_speed_kmh: self.stats.max_speed_kmh(),
            stroke_rate_spm: live(self.stats.stroke_rate_spm()),
            total_strokes: self.stats.total_strokes(),
            calories: self.stats.calories(),
            pace_500m_secs: pace_500m_from_kmh(self.stats.average_speed_kmh()),
            current_split_distance_m: self.splits.current_split_distance_m(),
            split_count: self.splits.splits().len(),
            lap_count: self.laps.laps().len(),
        }
    }

    /// Immutable snapshot for the persistence layer
    pub fn summary(&self, recorded_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            id: Uuid::new_v4(),
            recorded_at,
            duration_secs: self.clock.elapsed_secs(),
            distance_m: self.distance.total_distance_m(),
            average_speed_kmh: self.stats.average_speed_kmh(),
            max_speed_kmh: self.stats.max_speed_kmh(),
            calories: self.stats.calories(),
            total_strokes: self.stats.total_strokes(),
            laps: self.laps.laps().to_vec(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.clock.phase()
    }

    pub fn splits(&self) -> &[SplitRecord] {
        self.splits.splits()
    }

    pub fn split_summary(&self) -> Option<SplitSummary> {
        self.splits.summary()
    }

    pub fn laps(&self) -> &[LapRecord] {
        self.laps.laps()
    }

    pub fn diagnostics(&self) -> &FilterDiagnostics {
        &self.diagnostics
    }

    /// Position the next distance delta is measured from
    pub fn reference_position(&self) -> Option<Position> {
        self.distance.last_position()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
