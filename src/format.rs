//! Display formatting for durations and paces

/// Format seconds as `MM:SS`, or `H:MM:SS` from one hour up
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Format a 500 m pace as `M:SS`; `--:--` when there is no pace yet
pub fn format_pace(pace_secs: Option<f64>) -> String {
    match pace_secs {
        Some(pace) if pace.is_finite() && pace > 0.0 => {
            let total = pace as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "--:--".to_string(),
    }
}

/// Seconds per 500 m at the given speed, if moving
pub fn pace_500m_from_kmh(speed_kmh: f64) -> Option<f64> {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        Some(0.5 / speed_kmh * 3600.0)
    } else {
        None
    }
}
