//! Reading and replaying recorded track events

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TrackError;
use crate::pipeline::{EngineOutput, SessionEngine, SessionEvent};
use crate::schema::track_event::{TrackEvent, ValidationError};
use crate::types::FixOutcome;

/// Reader for recorded track events
pub struct TrackReader;

impl TrackReader {
    /// Parse a JSON string containing an array of TrackEvents
    pub fn parse_array(json: &str) -> Result<Vec<TrackEvent>, TrackError> {
        let events: Vec<TrackEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing TrackEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<TrackEvent>, TrackError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(TrackError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Parse either format, picking the array form when the input opens with `[`
    pub fn parse(input: &str) -> Result<Vec<TrackEvent>, TrackError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Collect every problem in a recording, including delivery times that go backwards
    pub fn check_events(events: &[TrackEvent]) -> Vec<EventIssue> {
        let mut issues = Vec::new();
        let mut previous = None;
        for (index, event) in events.iter().enumerate() {
            let checked = event.validate().and_then(|()| match previous {
                Some(prev) if event.at() < prev => Err(ValidationError::OutOfOrder {
                    at: event.at(),
                    previous: prev,
                }),
                _ => Ok(()),
            });
            if let Err(error) = checked {
                issues.push(EventIssue {
                    index,
                    kind: event.kind(),
                    error,
                });
            }
            let at = event.at();
            previous = Some(previous.map_or(at, |prev: DateTime<Utc>| prev.max(at)));
        }
        issues
    }

    /// Fail on the first problem in a recording
    pub fn validate_events(events: &[TrackEvent]) -> Result<(), TrackError> {
        match Self::check_events(events).into_iter().next() {
            Some(issue) => Err(TrackError::InvalidEvent(issue.to_string())),
            None => Ok(()),
        }
    }

    /// Validate and feed events through an engine in order
    pub fn replay(
        engine: &mut SessionEngine,
        events: &[TrackEvent],
    ) -> Result<ReplayReport, TrackError> {
        Self::validate_events(events)?;

        let mut report = ReplayReport::default();
        for event in events {
            let session_event = SessionEvent::try_from(event)
                .map_err(|e| TrackError::InvalidEvent(e.to_string()))?;
            report.record(&engine.apply(session_event));
        }
        Ok(report)
    }
}

/// One invalid event in a recording
#[derive(Debug, Clone, PartialEq)]
pub struct EventIssue {
    /// Zero-based position in the recording
    pub index: usize,
    pub kind: &'static str,
    pub error: ValidationError,
}

impl fmt::Display for EventIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {} ({}): {}", self.index + 1, self.kind, self.error)
    }
}

/// Counts of what a replay did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub fixes: usize,
    pub fixes_accepted: usize,
    pub splits_emitted: usize,
    pub transitions_applied: usize,
    pub laps: usize,
}

impl ReplayReport {
    fn record(&mut self, output: &EngineOutput) {
        self.events += 1;
        match output {
            EngineOutput::Fix(outcome) => {
                self.fixes += 1;
                if let FixOutcome::Accepted { new_splits, .. } = outcome {
                    self.fixes_accepted += 1;
                    self.splits_emitted += new_splits;
                }
            }
            EngineOutput::Transition(transition) => {
                if transition.applied() {
                    self.transitions_applied += 1;
                }
            }
            EngineOutput::Lap(Some(_)) => self.laps += 1,
            EngineOutput::Lap(None) | EngineOutput::Updated => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, fix_at};
    use crate::types::SessionPhase;

    fn recording() -> Vec<TrackEvent> {
        let mut events = vec![
            TrackEvent::Start { at: at(0.0) },
            TrackEvent::SplitInterval {
                at: at(0.0),
                meters: 100,
            },
        ];
        for step in 0..=30 {
            let secs = f64::from(step) * 5.0 + 1.0;
            events.push(TrackEvent::fix(&fix_at(f64::from(step) * 15.0, 3.0, secs), at(secs)));
        }
        events.push(TrackEvent::Lap { at: at(151.0) });
        events.push(TrackEvent::Pause { at: at(152.0) });
        events
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"type": "start", "at": "2024-06-01T07:00:00Z"}

{"type": "fix", "at": "2024-06-01T07:00:01Z", "latitude": 41.0, "longitude": 29.0, "horizontal_accuracy_m": 5.0, "speed_mps": 2.0}
{"type": "tick", "at": "2024-06-01T07:00:01.100Z"}"#;

        let events = TrackReader::parse_ndjson(ndjson).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].kind(), "tick");
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"type\": \"start\", \"at\": \"2024-06-01T07:00:00Z\"}\n{\"type\": \"warp\"}";
        match TrackReader::parse_ndjson(ndjson) {
            Err(TrackError::ParseError(message)) => assert!(message.contains("line 2")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_parse_detects_array() {
        let json = r#"[{"type": "start", "at": "2024-06-01T07:00:00Z"}, {"type": "reset", "at": "2024-06-01T07:00:05Z"}]"#;
        let events = TrackReader::parse(json).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let events = vec![
            TrackEvent::Start { at: at(10.0) },
            TrackEvent::Tick { at: at(9.0) },
        ];
        match TrackReader::validate_events(&events) {
            Err(TrackError::InvalidEvent(message)) => assert!(message.contains("event 2")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_check_events_collects_all_issues() {
        let events = vec![
            TrackEvent::Start { at: at(10.0) },
            TrackEvent::SplitInterval {
                at: at(11.0),
                meters: 0,
            },
            TrackEvent::Tick { at: at(9.0) },
            TrackEvent::Pause { at: at(12.0) },
        ];
        let issues = TrackReader::check_events(&events);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[0].error, ValidationError::ZeroSplitInterval);
        assert_eq!(issues[1].kind, "tick");
    }

    #[test]
    fn test_replay_recording() {
        let mut engine = SessionEngine::default();
        let report = TrackReader::replay(&mut engine, &recording()).unwrap();

        assert_eq!(report.events, 35);
        assert_eq!(report.fixes, 31);
        assert_eq!(report.fixes_accepted, 31);
        assert_eq!(report.laps, 1);
        assert_eq!(report.transitions_applied, 2);

        // 450 m rowed at 100 m splits
        let metrics = engine.metrics();
        assert_eq!(metrics.phase, SessionPhase::Paused);
        assert!((metrics.total_distance_m - 450.0).abs() < 1e-3);
        assert_eq!(engine.splits().len(), 4);
        assert_eq!(report.splits_emitted, 4);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut first = SessionEngine::default();
        let mut second = SessionEngine::default();
        TrackReader::replay(&mut first, &recording()).unwrap();
        TrackReader::replay(&mut second, &recording()).unwrap();

        assert_eq!(first.metrics(), second.metrics());
        assert_eq!(first.splits(), second.splits());
    }
}
