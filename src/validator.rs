//! Fix validation
//!
//! Stateless gate in front of the pipeline. A fix is dropped when it is stale,
//! when its accuracy is invalid or too coarse, or when its coordinates are
//! malformed. Accepted fixes have their speed clamped to be non-negative.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FilterConfig;
use crate::types::{Fix, FixVerdict, RejectReason, SanitizedFix};

/// Fix validator
pub struct FixValidator;

impl FixValidator {
    /// Validate a raw fix against the filter thresholds at instant `now`
    pub fn validate(fix: &Fix, config: &FilterConfig, now: DateTime<Utc>) -> FixVerdict {
        match check(fix, config, now) {
            Ok(sanitized) => FixVerdict::Accepted(sanitized),
            Err(reason) => {
                debug!(
                    reason = reason.as_str(),
                    accuracy_m = fix.horizontal_accuracy_m,
                    timestamp = %fix.timestamp,
                    "[Fix] rejected"
                );
                FixVerdict::Rejected(reason)
            }
        }
    }
}

fn check(fix: &Fix, config: &FilterConfig, now: DateTime<Utc>) -> Result<SanitizedFix, RejectReason> {
    let age_secs = fix_age_secs(fix.timestamp, now);
    if age_secs > config.max_fix_age_secs {
        return Err(RejectReason::Stale);
    }

    let accuracy = fix.horizontal_accuracy_m;
    if !accuracy.is_finite() || accuracy < 0.0 {
        return Err(RejectReason::InvalidAccuracy);
    }
    if accuracy > config.max_allowed_accuracy_m {
        return Err(RejectReason::LowConfidence);
    }

    let position = fix.position();
    if !position.is_valid() {
        return Err(RejectReason::InvalidCoordinate);
    }

    Ok(SanitizedFix {
        position,
        horizontal_accuracy_m: accuracy,
        speed_mps: sanitize_speed(fix.speed_mps),
        timestamp: fix.timestamp,
    })
}

/// Seconds between the fix timestamp and `now` at full precision; negative for future fixes
fn fix_age_secs(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now - timestamp;
    age.num_seconds() as f64 + f64::from(age.subsec_nanos()) * 1e-9
}

/// Providers report negative speed as "unknown"; treat it (and NaN) as standing still
fn sanitize_speed(speed_mps: f64) -> f64 {
    if speed_mps.is_finite() {
        speed_mps.max(0.0)
    } else {
        0.0
    }
}
