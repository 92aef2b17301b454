/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

const EMPTY_MARKERS: [&str; 4] = ["", "--:--", "--", "0 min"];

fn is_empty_marker(value: &str) -> bool {
    EMPTY_MARKERS.contains(&value.trim())
}

/// Flagged rows are red, clean rows green.
pub fn color_for_flag(is_flagged: bool) -> &'static str {
    if is_flagged { RED } else { GREEN }
}

/// Inside the geofence → green, outside → yellow, not checked → grey.
pub fn color_for_radius(within: Option<bool>) -> &'static str {
    match within {
        Some(true) => GREEN,
        Some(false) => YELLOW,
        None => GREY,
    }
}

/// Grey out placeholder values.
///
/// `colorize_optional("--:--")` → "<grey>--:--<reset>"
pub fn colorize_optional(value: &str) -> String {
    if is_empty_marker(value) {
        format!("{GREY}{value}{RESET}")
    } else {
        value.to_string()
    }
}

pub fn colorize_in_out(value: &str, is_in: bool) -> String {
    if is_empty_marker(value) {
        return format!("{GREY}{value}{RESET}");
    }

    if is_in {
        format!("{GREEN}{value}{RESET}")
    } else {
        format!("{RED}{value}{RESET}")
    }
}
