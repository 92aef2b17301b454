use crate::cli::commands::history::resolve_period;
use crate::cli::commands::open_service;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::export::ExportLogic;

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        user,
        format,
        file,
        range,
        force,
    } = cmd
    {
        let (from, to) = match range.as_deref() {
            Some(r) if r.eq_ignore_ascii_case("all") => resolve_period(Some("1970:9999"))?,
            other => resolve_period(other)?,
        };
        let service = open_service(cfg)?;
        let days = service.history(user, from, to).await?;
        ExportLogic::export(&days, format, file, *force)?;
    }
    Ok(())
}
