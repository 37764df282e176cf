//! kurek.track_event.v1 schema definition

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::SessionEvent;
use crate::types::Fix;

/// Current schema version
pub const SCHEMA_VERSION: &str = "kurek.track_event.v1";

/// One recorded input to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackEvent {
    /// Location fix delivered at `at`
    Fix {
        at: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        horizontal_accuracy_m: f64,
        /// Instantaneous speed (m/s); negative means unknown
        #[serde(default)]
        speed_mps: f64,
        /// When the fix was taken; defaults to `at`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
    Tick {
        at: DateTime<Utc>,
    },
    Start {
        at: DateTime<Utc>,
    },
    Pause {
        at: DateTime<Utc>,
    },
    Reset {
        at: DateTime<Utc>,
    },
    Lap {
        at: DateTime<Utc>,
    },
    SplitInterval {
        at: DateTime<Utc>,
        meters: u32,
    },
}

impl TrackEvent {
    /// Build a fix event from a raw fix received at `at`
    pub fn fix(fix: &Fix, at: DateTime<Utc>) -> Self {
        TrackEvent::Fix {
            at,
            latitude: fix.latitude,
            longitude: fix.longitude,
            horizontal_accuracy_m: fix.horizontal_accuracy_m,
            speed_mps: fix.speed_mps,
            timestamp: Some(fix.timestamp),
        }
    }

    /// Delivery instant
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            TrackEvent::Fix { at, .. }
            | TrackEvent::Tick { at }
            | TrackEvent::Start { at }
            | TrackEvent::Pause { at }
            | TrackEvent::Reset { at }
            | TrackEvent::Lap { at }
            | TrackEvent::SplitInterval { at, .. } => *at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackEvent::Fix { .. } => "fix",
            TrackEvent::Tick { .. } => "tick",
            TrackEvent::Start { .. } => "start",
            TrackEvent::Pause { .. } => "pause",
            TrackEvent::Reset { .. } => "reset",
            TrackEvent::Lap { .. } => "lap",
            TrackEvent::SplitInterval { .. } => "split_interval",
        }
    }

    /// Check field sanity of a single event.
    ///
    /// A recording should only contain what a location provider can actually
    /// report. The engine would reject a malformed fix at runtime, but a file
    /// holding one is almost always a conversion bug worth surfacing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TrackEvent::Fix {
                latitude,
                longitude,
                horizontal_accuracy_m,
                speed_mps,
                ..
            } => {
                finite("latitude", *latitude)?;
                finite("longitude", *longitude)?;
                finite("horizontal_accuracy_m", *horizontal_accuracy_m)?;
                finite("speed_mps", *speed_mps)?;
                if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
                    return Err(ValidationError::CoordinateOutOfRange {
                        latitude: *latitude,
                        longitude: *longitude,
                    });
                }
                Ok(())
            }
            TrackEvent::SplitInterval { meters: 0, .. } => Err(ValidationError::ZeroSplitInterval),
            _ => Ok(()),
        }
    }
}

impl TryFrom<&TrackEvent> for SessionEvent {
    type Error = ValidationError;

    fn try_from(event: &TrackEvent) -> Result<Self, Self::Error> {
        let session_event = match *event {
            TrackEvent::Fix {
                at,
                latitude,
                longitude,
                horizontal_accuracy_m,
                speed_mps,
                timestamp,
            } => SessionEvent::Fix {
                fix: Fix {
                    latitude,
                    longitude,
                    horizontal_accuracy_m,
                    speed_mps,
                    timestamp: timestamp.unwrap_or(at),
                },
                received_at: at,
            },
            TrackEvent::Tick { at } => SessionEvent::Tick { at },
            TrackEvent::Start { at } => SessionEvent::Start { at },
            TrackEvent::Pause { at } => SessionEvent::Pause { at },
            TrackEvent::Reset { .. } => SessionEvent::Reset,
            TrackEvent::Lap { .. } => SessionEvent::Lap,
            TrackEvent::SplitInterval { meters, .. } => SessionEvent::SetSplitInterval {
                meters: NonZeroU32::new(meters).ok_or(ValidationError::ZeroSplitInterval)?,
            },
        };
        Ok(session_event)
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

/// Validation errors for track events
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field {field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("Coordinate out of range: ({latitude}, {longitude})")]
    CoordinateOutOfRange { latitude: f64, longitude: f64 },

    #[error("Split interval must be positive")]
    ZeroSplitInterval,

    #[error("Event at {at} is earlier than the previous event at {previous}")]
    OutOfOrder {
        at: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, fix_at};

    #[test]
    fn test_deserialize_fix_event() {
        let json = r#"{
            "type": "fix",
            "at": "2024-06-01T07:00:02Z",
            "latitude": 41.0,
            "longitude": 29.0,
            "horizontal_accuracy_m": 8.5,
            "speed_mps": 3.2
        }"#;

        let event: TrackEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), "fix");
        assert_eq!(event.at(), at(2.0));
        assert!(event.validate().is_ok());

        match SessionEvent::try_from(&event).unwrap() {
            SessionEvent::Fix { fix, received_at } => {
                // Fix time falls back to the delivery time
                assert_eq!(fix.timestamp, received_at);
                assert_eq!(fix.speed_mps, 3.2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_serialize_uses_type_tag() {
        let event = TrackEvent::SplitInterval {
            at: at(0.0),
            meters: 250,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "split_interval");
        assert_eq!(json["meters"], 250);

        let fix = TrackEvent::fix(&fix_at(0.0, 3.0, 1.0), at(1.5));
        let json = serde_json::to_string(&fix).unwrap();
        assert!(json.contains("\"type\":\"fix\""));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let bad_coordinate = TrackEvent::Fix {
            at: at(0.0),
            latitude: 95.0,
            longitude: 29.0,
            horizontal_accuracy_m: 5.0,
            speed_mps: 1.0,
            timestamp: None,
        };
        assert!(matches!(
            bad_coordinate.validate(),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));

        let zero = TrackEvent::SplitInterval {
            at: at(0.0),
            meters: 0,
        };
        assert_eq!(zero.validate(), Err(ValidationError::ZeroSplitInterval));
        assert_eq!(
            SessionEvent::try_from(&zero),
            Err(ValidationError::ZeroSplitInterval)
        );
    }

    #[test]
    fn test_lifecycle_events_convert() {
        let reset = TrackEvent::Reset { at: at(3.0) };
        assert_eq!(SessionEvent::try_from(&reset).unwrap(), SessionEvent::Reset);

        let start = TrackEvent::Start { at: at(1.0) };
        assert_eq!(
            SessionEvent::try_from(&start).unwrap(),
            SessionEvent::Start { at: at(1.0) }
        );
    }
}
