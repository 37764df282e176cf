//! Shared helpers for unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::types::{Fix, Position};

/// Meters per degree of latitude on the haversine sphere
pub const METERS_PER_DEG_LAT: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap()
}

pub fn at(secs: f64) -> DateTime<Utc> {
    t0() + Duration::milliseconds((secs * 1000.0) as i64)
}

pub fn origin() -> Position {
    Position::new(41.0, 29.0)
}

/// A position `meters` due north of the test origin
pub fn north(meters: f64) -> Position {
    Position::new(origin().latitude + meters / METERS_PER_DEG_LAT, origin().longitude)
}

/// A good-quality fix `meters` north of the origin, timestamped at `secs`
pub fn fix_at(meters: f64, speed_mps: f64, secs: f64) -> Fix {
    let position = north(meters);
    Fix {
        latitude: position.latitude,
        longitude: position.longitude,
        horizontal_accuracy_m: 5.0,
        speed_mps,
        timestamp: at(secs),
    }
}
