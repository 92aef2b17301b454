//! Formatting utilities used for CLI and export outputs.

use crate::utils::time::format_minutes;
use chrono::{DateTime, Local};

pub fn bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

/// "HH:MM" of an optional timestamp, "--:--" when missing.
pub fn hhmm(ts: Option<&DateTime<Local>>) -> String {
    ts.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// 1234.5 → "1.23 km", 87.25 → "87.3 m"
pub fn meters(d: Option<f64>) -> String {
    match d {
        Some(d) if d >= 1000.0 => format!("{:.2} km", d / 1000.0),
        Some(d) => format!("{:.1} m", d),
        None => "--".to_string(),
    }
}

pub fn speed(kmh: Option<f64>) -> String {
    kmh.map(|s| format!("{:.2} km/h", s))
        .unwrap_or_else(|| "--".to_string())
}

pub fn duration(mins: Option<i64>) -> String {
    mins.map(format_minutes).unwrap_or_else(|| "--:--".to_string())
}

pub fn or_dash(s: Option<&str>) -> String {
    s.filter(|v| !v.is_empty()).unwrap_or("--").to_string()
}
