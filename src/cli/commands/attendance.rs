use crate::cli::commands::open_service;
use crate::cli::parser::{Commands, Position, SessionAction, VisitAction};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::requests::{
    ClockInRequest, ClockOutRequest, LocationCheckInRequest, LocationCheckOutRequest,
    SessionRequest,
};
use crate::models::session_type::SessionType;
use crate::models::work_location::WorkLocation;
use crate::ui::messages::{flagged, success, warning};
use crate::ui::render;
use crate::utils::formatting::{duration, hhmm, meters, speed};

/// Clock-in, clock-out, session and visit transitions.
pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let service = open_service(cfg)?;

    match cmd {
        Commands::ClockIn {
            at,
            mode,
            remote_location,
        } => {
            let work_location = mode
                .as_deref()
                .map(|m| {
                    WorkLocation::from_code(m).ok_or_else(|| {
                        AppError::Validation(format!(
                            "Invalid work location '{m}'. Use office, remote or field"
                        ))
                    })
                })
                .transpose()?;

            let att = service
                .clock_in(
                    &at.user,
                    ClockInRequest {
                        latitude: at.lat,
                        longitude: at.lon,
                        notes: at.notes.clone(),
                        work_location,
                        remote_location: remote_location.clone(),
                    },
                )
                .await?;

            success(format!(
                "{} clocked in at {} ({})",
                att.user_id,
                hhmm(att.clock_in_time.as_ref()),
                att.work_location.to_db_str()
            ));
            if att.is_flagged {
                flagged(att.flag_reason.as_deref().unwrap_or("flagged for review"));
            }
            render::print_day(&att);
        }

        Commands::ClockOut { at } => {
            let att = service
                .clock_out(
                    &at.user,
                    ClockOutRequest {
                        latitude: at.lat,
                        longitude: at.lon,
                        notes: at.notes.clone(),
                    },
                )
                .await?;

            success(format!(
                "{} clocked out at {}",
                att.user_id,
                hhmm(att.clock_out_time.as_ref())
            ));
            if att.is_flagged {
                flagged(att.flag_reason.as_deref().unwrap_or("flagged for review"));
            }
            render::print_day(&att);
        }

        Commands::Session { action } => match action {
            SessionAction::CheckIn { at, session_type } => {
                let session_type = session_type
                    .as_deref()
                    .map(|t| {
                        SessionType::from_db_str(t).ok_or_else(|| {
                            AppError::Validation(format!(
                                "Invalid session type '{t}'. Use work, break, lunch, meeting or errand"
                            ))
                        })
                    })
                    .transpose()?;

                let s = service
                    .session_check_in(&at.user, session_request(at, session_type))
                    .await?;
                success(format!(
                    "Session #{} ({}) started at {}",
                    s.id,
                    s.session_type.to_db_str(),
                    hhmm(Some(&s.check_in_time))
                ));
                if s.is_flagged {
                    flagged(s.flag_reason.as_deref().unwrap_or("flagged for review"));
                }
            }
            SessionAction::CheckOut { at } => {
                let s = service
                    .session_check_out(&at.user, session_request(at, None))
                    .await?;
                success(format!(
                    "Session #{} ({}) closed after {}",
                    s.id,
                    s.session_type.to_db_str(),
                    duration(s.duration_minutes)
                ));
                if s.is_flagged {
                    flagged(s.flag_reason.as_deref().unwrap_or("flagged for review"));
                }
            }
        },

        Commands::Visit { action } => match action {
            VisitAction::CheckIn {
                at,
                entity,
                purpose,
            } => {
                let log = service
                    .location_check_in(
                        &at.user,
                        LocationCheckInRequest {
                            entity_id: entity.clone(),
                            latitude: at.lat,
                            longitude: at.lon,
                            purpose: purpose.clone(),
                            notes: at.notes.clone(),
                        },
                    )
                    .await?;
                success(format!(
                    "Visit #{} at '{}' started ({} from center)",
                    log.id,
                    log.entity_id,
                    meters(Some(log.distance_from_entity))
                ));
            }
            VisitAction::CheckOut { at } => {
                let log = service
                    .location_check_out(
                        &at.user,
                        LocationCheckOutRequest {
                            latitude: at.lat,
                            longitude: at.lon,
                            notes: at.notes.clone(),
                        },
                    )
                    .await?;
                success(format!(
                    "Visit #{} at '{}' closed after {}",
                    log.id,
                    log.entity_id,
                    duration(log.duration_minutes)
                ));
                if log.travel_speed.is_some() && !log.is_flagged {
                    warning(format!("Travel since last visit: {}", speed(log.travel_speed)));
                }
                if log.is_flagged {
                    flagged(log.flag_reason.as_deref().unwrap_or("flagged for review"));
                }
            }
        },

        _ => {}
    }

    Ok(())
}

fn session_request(at: &Position, session_type: Option<SessionType>) -> SessionRequest {
    SessionRequest {
        latitude: at.lat,
        longitude: at.lon,
        session_type,
        notes: at.notes.clone(),
    }
}
