use crate::cli::commands::open_service;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::operation::RecordType;
use crate::ui::messages::{info, success};
use crate::ui::render;

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let service = open_service(cfg)?;

    match cmd {
        Commands::Flagged { limit } => {
            let rows = service
                .flagged(limit.unwrap_or(cfg.flagged_list_limit))
                .await?;
            if rows.is_empty() {
                info("No flagged records.");
                return Ok(());
            }
            render::print_flagged(&rows);
        }

        Commands::Flag {
            record_type,
            id,
            reason,
        } => {
            let rt = RecordType::from_code(record_type).ok_or_else(|| {
                AppError::Validation(format!(
                    "Invalid record type '{record_type}'. Use attendance, session or location_log"
                ))
            })?;
            service.flag_suspicious_activity(*id, rt, reason).await?;
            success(format!("{rt} #{id} flagged."));
        }

        _ => {}
    }

    Ok(())
}
