//! Kurek Core - On-device rowing metrics engine
//!
//! Kurek turns raw GPS fixes from a phone into live rowing metrics through a
//! deterministic pipeline: fix validation → speed smoothing → distance
//! accumulation → session statistics → split detection.
//!
//! ## Modules
//!
//! - **Session Pipeline**: [`SessionEngine`] runs fixes and lifecycle commands
//! - **Shared Session**: thread-safe handle plus the periodic clock ticker
//! - **Track Schema**: NDJSON recordings of session inputs for replay

pub mod clock;
pub mod config;
pub mod distance;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod schema;
pub mod sensor;
pub mod shared;
pub mod smoother;
pub mod splits;
pub mod stats;
pub mod types;
pub mod validator;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod test_support;

pub use config::SessionConfig;
pub use error::TrackError;
pub use pipeline::{EngineOutput, SessionEngine, SessionEvent};
pub use shared::{SharedSession, Ticker};
pub use types::{Fix, FixOutcome, LiveMetrics, SessionPhase, SessionSummary};

// Schema exports
pub use schema::{TrackEvent, TrackReader, SCHEMA_VERSION};

/// Kurek version
pub const KUREK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tooling
pub const PRODUCER_NAME: &str = "kurek-core";
