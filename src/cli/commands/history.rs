use crate::cli::commands::open_service;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{header, info};
use crate::ui::render;
use crate::utils::date;
use chrono::NaiveDate;

/// `--period` accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or `start:end`;
/// the current month when omitted.
pub fn resolve_period(period: Option<&str>) -> AppResult<(NaiveDate, NaiveDate)> {
    match period {
        Some(p) => date::resolve_range(p).map_err(AppError::InvalidDate),
        None => date::current_month_bounds().map_err(AppError::InvalidDate),
    }
}

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let service = open_service(cfg)?;

    match cmd {
        Commands::History { user, period } => {
            let (from, to) = resolve_period(period.as_deref())?;
            let days = service.history(user, from, to).await?;
            if days.is_empty() {
                info(format!("No attendance for {user} between {from} and {to}."));
                return Ok(());
            }
            header(format!("{user}: {from} → {to}"));
            render::print_history(&days);
        }

        Commands::Summary { user, period } => {
            let (from, to) = resolve_period(period.as_deref())?;
            let summary = service.summary(user, from, to).await?;
            header(format!("{user}: {from} → {to}"));
            render::print_summary(&summary);
        }

        _ => {}
    }

    Ok(())
}
