//! Thread-safe session handle and the periodic clock ticker
//!
//! Location callbacks, the UI and the ticker may all live on different
//! threads. Every event is applied under one lock covering the whole pipeline
//! step, so no reader ever observes a half-applied fix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::pipeline::{EngineOutput, SessionEngine, SessionEvent};
use crate::types::LiveMetrics;

/// Default refresh period for elapsed time
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Cloneable handle to one engine
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionEngine>>,
}

impl SharedSession {
    pub fn new(engine: SessionEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Apply one event atomically
    pub fn apply(&self, event: SessionEvent) -> EngineOutput {
        self.lock().apply(event)
    }

    pub fn metrics(&self) -> LiveMetrics {
        self.lock().metrics()
    }

    /// Run a closure with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionEngine) -> R) -> R {
        f(&mut self.lock())
    }

    /// The engine's own commands do not panic midway, so a lock poisoned by
    /// a caller closure passed to `with` is recovered as-is.
    fn lock(&self) -> MutexGuard<'_, SessionEngine> {
        self.inner.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("[Session] recovering poisoned engine lock");
            poisoned.into_inner()
        })
    }
}

/// Background thread that refreshes elapsed time while running
#[derive(Debug)]
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Tick `session` with the wall clock every `period`
    pub fn spawn(session: SharedSession, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            debug!(period_ms = period.as_millis() as u64, "[Ticker] started");
            while !flag.load(Ordering::Relaxed) {
                session.apply(SessionEvent::Tick { at: Utc::now() });
                thread::sleep(period);
            }
            debug!("[Ticker] stopped");
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop scheduling ticks and wait for the thread to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("[Ticker] thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
