//! Error types for Kurek Core

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Only construction-time configuration and input parsing can fail. The per-fix
/// path never returns an error: bad fixes are clamped or dropped.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
