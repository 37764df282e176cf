//! Speed smoothing
//!
//! Raw GPS speed jumps around from fix to fix. A short trailing mean trades
//! roughly one second of latency for a display-stable value.

use std::collections::VecDeque;

use crate::config::DEFAULT_SMOOTHING_WINDOW;

/// Fixed-capacity moving average over the most recent speeds
#[derive(Debug, Clone)]
pub struct SpeedSmoother {
    /// Most recent speeds, oldest first (m/s)
    readings: VecDeque<f64>,
    /// Mean of `readings` (m/s)
    smoothed: f64,
    /// Maximum window size
    window_size: usize,
}

impl Default for SpeedSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl SpeedSmoother {
    /// Create a smoother with the given window.
    ///
    /// The window is validated as part of `FilterConfig`; a zero window is
    /// treated as one so the smoother degrades to pass-through.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            readings: VecDeque::with_capacity(window_size),
            smoothed: 0.0,
            window_size,
        }
    }

    /// Add a reading and return the new smoothed speed
    pub fn push(&mut self, speed_mps: f64) -> f64 {
        self.readings.push_back(speed_mps);
        while self.readings.len() > self.window_size {
            self.readings.pop_front();
        }

        let sum: f64 = self.readings.iter().sum();
        self.smoothed = sum / self.readings.len() as f64;
        self.smoothed
    }

    /// Current smoothed speed (m/s)
    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    /// Number of readings currently in the window
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Drop all readings
    pub fn reset(&mut self) {
        self.readings.clear();
        self.smoothed = 0.0;
    }
}
