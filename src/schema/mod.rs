//! Track event schema
//!
//! Recorded sessions are stored as newline-delimited JSON, one [`TrackEvent`]
//! per line, tagged by `"type"`. Every event carries the instant `at` it was
//! delivered to the engine, so a replay is fully deterministic.

mod reader;
mod track_event;

pub use reader::*;
pub use track_event::*;
