//! Session clock
//!
//! Tracks elapsed workout time across pause/resume. Elapsed time is always
//! derived from wall-clock instants, never from tick counts, so sparse or
//! missed ticks cannot skew it.
//!
//! Every operation is defined for every phase. Transitions that make no sense
//! (pausing while idle, starting while already active) are reported as
//! [`Transition::Ignored`] and change nothing.

use chrono::{DateTime, Utc};

use crate::types::SessionPhase;

/// What a clock command actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Active, elapsed starts from zero
    Started,
    /// Paused -> Active, elapsed continues
    Resumed,
    /// Active -> Paused
    Paused,
    /// Any -> Idle
    Reset,
    /// Command has no effect in the current phase
    Ignored,
}

impl Transition {
    pub fn applied(&self) -> bool {
        !matches!(self, Transition::Ignored)
    }
}

/// Elapsed-time tracker with start/pause/resume/reset
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    phase: SessionPhase,
    /// Instant elapsed time is measured from while active
    origin: Option<DateTime<Utc>>,
    /// Elapsed time frozen at the last pause (seconds)
    paused_elapsed_secs: f64,
    elapsed_secs: f64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, or resume a paused one without losing time
    pub fn start(&mut self, now: DateTime<Utc>) -> Transition {
        match self.phase {
            SessionPhase::Idle => {
                self.origin = Some(now);
                self.paused_elapsed_secs = 0.0;
                self.elapsed_secs = 0.0;
                self.phase = SessionPhase::Active;
                Transition::Started
            }
            SessionPhase::Paused => {
                // Resuming so close to the calendar limit that the shifted origin
                // is unrepresentable leaves the session paused
                let Some(origin) = secs_to_duration(self.paused_elapsed_secs)
                    .and_then(|paused| now.checked_sub_signed(paused))
                else {
                    return Transition::Ignored;
                };
                self.origin = Some(origin);
                self.phase = SessionPhase::Active;
                Transition::Resumed
            }
            SessionPhase::Active => Transition::Ignored,
        }
    }

    /// Freeze elapsed time at `now`
    pub fn pause(&mut self, now: DateTime<Utc>) -> Transition {
        if self.phase != SessionPhase::Active {
            return Transition::Ignored;
        }
        self.advance(now);
        self.paused_elapsed_secs = self.elapsed_secs;
        self.phase = SessionPhase::Paused;
        Transition::Paused
    }

    /// Recompute elapsed time; no-op unless active
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.phase == SessionPhase::Active {
            self.advance(now);
        }
    }

    /// Return to idle with zero elapsed time
    pub fn reset(&mut self) -> Transition {
        *self = Self::default();
        Transition::Reset
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    fn advance(&mut self, now: DateTime<Utc>) {
        if let Some(origin) = self.origin {
            let elapsed = (now - origin).num_milliseconds() as f64 / 1000.0;
            // A wall clock stepping backwards must not rewind the session
            self.elapsed_secs = self.elapsed_secs.max(elapsed);
        }
    }
}

fn secs_to_duration(secs: f64) -> Option<chrono::Duration> {
    let millis = (secs * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    chrono::Duration::try_milliseconds(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_pause_resume_accumulates_active_time_only() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.start(t(0)), Transition::Started);
        assert_eq!(clock.pause(t(10)), Transition::Paused);
        assert_eq!(clock.elapsed_secs(), 10.0);

        assert_eq!(clock.start(t(15)), Transition::Resumed);
        assert_eq!(clock.pause(t(20)), Transition::Paused);
        assert_eq!(clock.elapsed_secs(), 15.0);
    }

    #[test]
    fn test_tick_only_advances_while_active() {
        let mut clock = SessionClock::new();
        clock.tick(t(5));
        assert_eq!(clock.elapsed_secs(), 0.0);

        clock.start(t(0));
        clock.tick(t(3));
        assert_eq!(clock.elapsed_secs(), 3.0);

        clock.pause(t(4));
        clock.tick(t(100));
        assert_eq!(clock.elapsed_secs(), 4.0);
    }

    #[test]
    fn test_missed_ticks_do_not_lose_time() {
        let mut clock = SessionClock::new();
        clock.start(t(0));
        clock.tick(t(1));
        // Nothing for a minute, then one late tick
        clock.tick(t(61));
        assert_eq!(clock.elapsed_secs(), 61.0);
    }

    #[test]
    fn test_backwards_wall_clock_does_not_rewind() {
        let mut clock = SessionClock::new();
        clock.start(t(0));
        clock.tick(t(10));
        clock.tick(t(8));
        assert_eq!(clock.elapsed_secs(), 10.0);
    }

    #[test]
    fn test_invalid_transitions_are_ignored() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.pause(t(1)), Transition::Ignored);
        assert_eq!(clock.phase(), SessionPhase::Idle);

        clock.start(t(0));
        assert_eq!(clock.start(t(5)), Transition::Ignored);
        clock.tick(t(6));
        assert_eq!(clock.elapsed_secs(), 6.0);

        clock.pause(t(7));
        assert_eq!(clock.pause(t(8)), Transition::Ignored);
        assert_eq!(clock.elapsed_secs(), 7.0);
    }

    #[test]
    fn test_resume_at_calendar_extremes_does_not_fault() {
        let earliest = DateTime::<Utc>::MIN_UTC + Duration::days(1);
        let latest = DateTime::<Utc>::MAX_UTC - Duration::days(1);

        let mut clock = SessionClock::new();
        clock.start(earliest);
        assert_eq!(clock.pause(latest), Transition::Paused);
        let elapsed = clock.elapsed_secs();
        assert!(elapsed > 0.0);

        // Origin would fall before the earliest representable instant
        assert_eq!(clock.start(earliest), Transition::Ignored);
        assert_eq!(clock.phase(), SessionPhase::Paused);
        assert_eq!(clock.elapsed_secs(), elapsed);

        assert_eq!(clock.start(latest), Transition::Resumed);
        assert!(clock.is_active());
    }

    #[test]
    fn test_reset_from_any_phase() {
        let mut clock = SessionClock::new();
        clock.start(t(0));
        clock.tick(t(30));
        assert_eq!(clock.reset(), Transition::Reset);
        assert_eq!(clock.phase(), SessionPhase::Idle);
        assert_eq!(clock.elapsed_secs(), 0.0);

        // A fresh start after reset begins from zero
        clock.start(t(100));
        clock.tick(t(102));
        assert_eq!(clock.elapsed_secs(), 2.0);
    }
}
