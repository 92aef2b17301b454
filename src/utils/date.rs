use chrono::{Datelike, NaiveDate};

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// First and last day covered by a period: `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
pub fn bounds_of_period(p: &str) -> Result<(NaiveDate, NaiveDate), String> {
    let invalid = || format!("Invalid period: {}", p);

    // YYYY-MM-DD
    if let Some(d) = parse_date(p) {
        return Ok((d, d));
    }

    // YYYY-MM
    if let Ok(first) = NaiveDate::parse_from_str(&format!("{p}-01"), "%Y-%m-%d") {
        let last = last_day_of_month(first.year(), first.month()).ok_or_else(invalid)?;
        return Ok((first, last));
    }

    // YYYY
    if let Ok(year) = p.parse::<i32>() {
        let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
        return Ok((first, last));
    }

    Err(invalid())
}

/// Resolve `start:end` or a single period into an inclusive date range.
pub fn resolve_range(p: &str) -> Result<(NaiveDate, NaiveDate), String> {
    if let Some((start, end)) = p.split_once(':') {
        let (from, _) = bounds_of_period(start)?;
        let (_, to) = bounds_of_period(end)?;
        if from > to {
            return Err(format!("Invalid range: {} is after {}", start, end));
        }
        return Ok((from, to));
    }
    bounds_of_period(p)
}

pub fn current_month_bounds() -> Result<(NaiveDate, NaiveDate), String> {
    let today = today();
    bounds_of_period(&today.format("%Y-%m").to_string())
}
