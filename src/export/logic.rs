// src/export/logic.rs

use crate::errors::{AppError, AppResult};
use crate::export::ExportFormat;
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::model::AttendanceExport;
use crate::models::attendance::DailyAttendance;
use crate::ui::messages::warning;
use std::path::Path;

pub struct ExportLogic;

impl ExportLogic {
    /// Write `days` to `file`.
    ///
    /// The path must be absolute; an existing file is only replaced with
    /// `force`. An empty selection writes nothing.
    pub fn export(
        days: &[DailyAttendance],
        format: &ExportFormat,
        file: &str,
        force: bool,
    ) -> AppResult<()> {
        let path = Path::new(file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        ensure_writable(path, force)?;

        if days.is_empty() {
            warning("No attendance found for selected range.");
            return Ok(());
        }

        let rows: Vec<AttendanceExport> = days.iter().map(AttendanceExport::from).collect();

        match format {
            ExportFormat::Csv => export_csv(&rows, path)?,
            ExportFormat::Json => export_json(&rows, path)?,
        }

        tracing::info!(format = format.as_str(), rows = rows.len(), file, "export written");
        Ok(())
    }
}
