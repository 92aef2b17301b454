//! Human readable views of attendance records.

use crate::core::geofence::LocationAccess;
use crate::models::attendance::DailyAttendance;
use crate::models::location_log::LocationLog;
use crate::models::session::AttendanceSession;
use crate::models::summary::{AttendanceSummary, FlaggedRecord};
use crate::utils::colors::{
    CYAN, RESET, color_for_flag, color_for_radius, colorize_in_out, colorize_optional,
};
use crate::utils::formatting::{bold, duration, hhmm, meters, or_dash, speed};
use crate::utils::table::Table;
use crate::utils::time::format_hours;

fn flag_cell(is_flagged: bool, reason: Option<&str>) -> String {
    if is_flagged {
        format!("{}{}{}", color_for_flag(true), or_dash(reason), RESET)
    } else {
        colorize_optional("--")
    }
}

fn radius_cell(within: Option<bool>) -> String {
    let text = match within {
        Some(true) => "inside",
        Some(false) => "outside",
        None => "--",
    };
    format!("{}{}{}", color_for_radius(within), text, RESET)
}

pub fn print_day(att: &DailyAttendance) {
    println!("{}", bold(&format!("{} · {}", att.user_id, att.date_str())));
    println!(
        "{CYAN}• In:{RESET}  {}   {CYAN}Out:{RESET} {}",
        colorize_in_out(&hhmm(att.clock_in_time.as_ref()), true),
        colorize_in_out(&hhmm(att.clock_out_time.as_ref()), false),
    );
    println!(
        "{CYAN}• Mode:{RESET} {}{}",
        att.work_location.to_db_str(),
        att.remote_location
            .as_deref()
            .map(|r| format!(" ({r})"))
            .unwrap_or_default()
    );
    println!(
        "{CYAN}• Entity:{RESET} {}  {}  {}",
        or_dash(att.entity_id.as_deref()),
        meters(att.distance_from_entity),
        radius_cell(att.is_within_radius)
    );
    println!(
        "{CYAN}• Hours:{RESET} {}   {CYAN}Speed:{RESET} {}",
        colorize_optional(&att.total_hours.map(format_hours).unwrap_or_else(|| "--:--".into())),
        speed(att.travel_speed)
    );
    if att.is_flagged {
        println!(
            "{CYAN}• Flag:{RESET} {}",
            flag_cell(true, att.flag_reason.as_deref())
        );
    }
}

pub fn print_sessions(sessions: &[AttendanceSession]) {
    let mut t = Table::new(["ID", "TYPE", "IN", "OUT", "DURATION", "ENTITY", "RADIUS", "FLAG"]);
    for s in sessions {
        t.add_row(vec![
            s.id.to_string(),
            s.session_type.to_db_str().to_string(),
            colorize_in_out(&hhmm(Some(&s.check_in_time)), true),
            colorize_in_out(&hhmm(s.check_out_time.as_ref()), false),
            colorize_optional(&duration(s.duration_minutes)),
            or_dash(s.entity_id.as_deref()),
            radius_cell(s.is_within_radius),
            flag_cell(s.is_flagged, s.flag_reason.as_deref()),
        ]);
    }
    print!("{}", t.render());
}

pub fn print_location_logs(logs: &[LocationLog]) {
    let mut t = Table::new(["ID", "ENTITY", "IN", "OUT", "DURATION", "DISTANCE", "SPEED", "FLAG"]);
    for l in logs {
        t.add_row(vec![
            l.id.to_string(),
            l.entity_id.clone(),
            colorize_in_out(&hhmm(Some(&l.check_in_time)), true),
            colorize_in_out(&hhmm(l.check_out_time.as_ref()), false),
            colorize_optional(&duration(l.duration_minutes)),
            meters(Some(l.distance_from_entity)),
            speed(l.travel_speed),
            flag_cell(l.is_flagged, l.flag_reason.as_deref()),
        ]);
    }
    print!("{}", t.render());
}

pub fn print_history(days: &[DailyAttendance]) {
    let mut t = Table::new(["DATE", "MODE", "IN", "OUT", "HOURS", "ENTITY", "RADIUS", "FLAG"]);
    for d in days {
        t.add_row(vec![
            d.date_str(),
            d.work_location.to_db_str().to_string(),
            colorize_in_out(&hhmm(d.clock_in_time.as_ref()), true),
            colorize_in_out(&hhmm(d.clock_out_time.as_ref()), false),
            colorize_optional(&d.total_hours.map(format_hours).unwrap_or_else(|| "--:--".into())),
            or_dash(d.entity_id.as_deref()),
            radius_cell(d.is_within_radius),
            flag_cell(d.is_flagged, d.flag_reason.as_deref()),
        ]);
    }
    print!("{}", t.render());
}

pub fn print_flagged(rows: &[FlaggedRecord]) {
    let mut t = Table::new(["TYPE", "ID", "USER", "DATE", "REASON"]);
    for r in rows {
        t.add_row(vec![
            r.record_type.to_string(),
            r.id.to_string(),
            r.user_id.clone(),
            r.date.format("%Y-%m-%d").to_string(),
            format!("{}{}{}", color_for_flag(true), r.flag_reason, RESET),
        ]);
    }
    print!("{}", t.render());
}

pub fn print_summary(s: &AttendanceSummary) {
    println!("{CYAN}• Days present:{RESET}   {}", s.days_present);
    println!("{CYAN}• Days completed:{RESET} {}", s.days_completed);
    println!(
        "{CYAN}• Flagged days:{RESET}   {}{}{}",
        color_for_flag(s.flagged_days > 0),
        s.flagged_days,
        RESET
    );
    println!("{CYAN}• Total hours:{RESET}    {}", format_hours(s.total_hours));
}

pub fn print_access(access: &LocationAccess) {
    let mut t = Table::new(["ENTITY", "NAME", "DISTANCE", "RADIUS", "INSIDE"]);
    for c in &access.candidates {
        t.add_row(vec![
            c.entity.id.clone(),
            c.entity.name.clone(),
            meters(Some(c.distance_meters)),
            format!("{:.0} m", c.entity.radius_meters),
            radius_cell(Some(c.is_within_radius)),
        ]);
    }
    print!("{}", t.render());
}
