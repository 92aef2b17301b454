use crate::cli::commands::open_service;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use crate::ui::render;

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let service = open_service(cfg)?;

    match cmd {
        Commands::Status { user, details } => {
            let Some(att) = service.today(user).await? else {
                info(format!("{user} has not clocked in today."));
                return Ok(());
            };

            render::print_day(&att);
            println!();

            match service.open_session(user).await? {
                Some(s) => info(format!(
                    "Open session #{} ({}) since {}",
                    s.id,
                    s.session_type.to_db_str(),
                    s.check_in_time.format("%H:%M")
                )),
                None => info("No open session."),
            }
            match service.open_location_log(user).await? {
                Some(l) => info(format!(
                    "Open visit #{} at '{}' since {}",
                    l.id,
                    l.entity_id,
                    l.check_in_time.format("%H:%M")
                )),
                None => info("No open visit."),
            }

            if *details {
                let sessions = service.sessions_for(att.id).await?;
                if !sessions.is_empty() {
                    println!("\nSessions:");
                    render::print_sessions(&sessions);
                }
                let logs = service.location_logs_for(att.id).await?;
                if !logs.is_empty() {
                    println!("\nVisits:");
                    render::print_location_logs(&logs);
                }
            }
        }

        Commands::Locate { user, lat, lon } => {
            let access = service.locate(user, *lat, *lon)?;
            if access.candidates.is_empty() {
                warning(access.describe_rejection());
                return Ok(());
            }
            render::print_access(&access);
            if access.is_valid {
                if let Some(m) = &access.nearest {
                    success(format!("Inside '{}' ({:.1} m from center)", m.entity.name, m.distance_meters));
                }
            } else {
                warning(access.describe_rejection());
            }
        }

        _ => {}
    }

    Ok(())
}
