//! Travel-speed fraud heuristic.
//!
//! Compares a candidate event with the previous event of the same logical
//! chain and classifies the implied travel speed. Flags are advisory data,
//! never errors: the triggering operation still succeeds.

use crate::core::distance::{distance, speed_kmh};
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::geo_point::GeoPoint;
use crate::models::operation::RecordType;
use chrono::{DateTime, Local};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Separator used when several reasons accumulate on one record.
pub const REASON_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Above this speed the event is flagged.
    #[serde(default = "default_high_speed")]
    pub high_speed_kmh: f64,
    /// Above this speed the event is recorded for audit only.
    #[serde(default = "default_medium_speed")]
    pub medium_speed_kmh: f64,
}

fn default_high_speed() -> f64 {
    120.0
}
fn default_medium_speed() -> f64 {
    60.0
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            high_speed_kmh: default_high_speed(),
            medium_speed_kmh: default_medium_speed(),
        }
    }
}

impl FraudConfig {
    pub fn validate(&self) -> AppResult<()> {
        let ok = self.medium_speed_kmh.is_finite()
            && self.high_speed_kmh.is_finite()
            && self.medium_speed_kmh > 0.0
            && self.high_speed_kmh > self.medium_speed_kmh;
        if !ok {
            return Err(AppError::Config(format!(
                "fraud thresholds must satisfy 0 < medium ({}) < high ({})",
                self.medium_speed_kmh, self.high_speed_kmh
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// A located, timestamped event.
#[derive(Debug, Clone, Copy)]
pub struct TravelPoint {
    pub point: GeoPoint,
    pub at: DateTime<Local>,
}

impl TravelPoint {
    pub fn new(point: GeoPoint, at: DateTime<Local>) -> Self {
        Self { point, at }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudAssessment {
    /// False when there was no reference event to compare with.
    pub checked: bool,
    pub distance_meters: f64,
    pub elapsed_minutes: f64,
    pub speed_kmh: f64,
    pub risk_level: RiskLevel,
    pub is_suspicious: bool,
    pub reason: Option<String>,
}

impl FraudAssessment {
    pub fn skipped() -> Self {
        Self {
            checked: false,
            distance_meters: 0.0,
            elapsed_minutes: 0.0,
            speed_kmh: 0.0,
            risk_level: RiskLevel::Low,
            is_suspicious: false,
            reason: None,
        }
    }

    /// Speed worth persisting on the record, if any was measured.
    pub fn recorded_speed(&self) -> Option<f64> {
        self.checked.then_some(self.speed_kmh)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FraudEngine {
    config: FraudConfig,
}

impl FraudEngine {
    pub fn new(config: FraudConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FraudConfig {
        &self.config
    }

    pub fn classify(&self, speed: f64) -> RiskLevel {
        if speed > self.config.high_speed_kmh {
            RiskLevel::High
        } else if speed > self.config.medium_speed_kmh {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Assess the move from `reference` to `candidate`.
    /// Without a reference the speed check is skipped entirely.
    pub fn analyze(
        &self,
        reference: Option<TravelPoint>,
        candidate: TravelPoint,
    ) -> AppResult<FraudAssessment> {
        let Some(reference) = reference else {
            return Ok(FraudAssessment::skipped());
        };

        let meters = distance(
            reference.point.latitude,
            reference.point.longitude,
            candidate.point.latitude,
            candidate.point.longitude,
        )?;
        let elapsed_minutes =
            (candidate.at - reference.at).num_milliseconds() as f64 / 60_000.0;
        let speed = speed_kmh(meters, elapsed_minutes);
        let risk_level = self.classify(speed);
        let is_suspicious = risk_level == RiskLevel::High;

        let reason = is_suspicious
            .then(|| format!("Impossible travel speed detected ({speed:.2} km/h)"));

        Ok(FraudAssessment {
            checked: true,
            distance_meters: meters,
            elapsed_minutes,
            speed_kmh: speed,
            risk_level,
            is_suspicious,
            reason,
        })
    }
}

/// Combine an existing reason with a new one.
///
/// Returns `None` when `reason` is already recorded, so re-flagging is a no-op.
pub fn merge_flag_reason(existing: Option<&str>, reason: &str) -> Option<String> {
    let reason = reason.trim();
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        None => Some(reason.to_string()),
        Some(prev) if prev.split(REASON_SEPARATOR).any(|r| r.trim() == reason) => None,
        Some(prev) => Some(format!("{prev}{REASON_SEPARATOR}{reason}")),
    }
}

/// Persist `reason` on the target record, appending to any prior reasons.
///
/// Must run inside the caller's transaction. Unknown ids yield NotFound.
pub fn flag_suspicious_activity(
    conn: &Connection,
    record_id: i64,
    record_type: RecordType,
    reason: &str,
) -> AppResult<()> {
    if reason.trim().is_empty() {
        return Err(AppError::Validation("flag reason must not be empty".into()));
    }

    let existing = queries::load_flag_reason(conn, record_type, record_id)?.ok_or_else(|| {
        AppError::NotFound(format!("{record_type} #{record_id} not found"))
    })?;

    match merge_flag_reason(existing.as_deref(), reason) {
        Some(merged) => {
            queries::store_flag_reason(conn, record_type, record_id, &merged)?;
            tracing::warn!(%record_type, record_id, reason, "record flagged");
        }
        None => {
            tracing::debug!(%record_type, record_id, reason, "flag reason already recorded");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(min: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn tp(lat: f64, lon: f64, min: i64) -> TravelPoint {
        TravelPoint::new(GeoPoint::new(lat, lon).unwrap(), at(min))
    }

    #[test]
    fn no_reference_skips_check() {
        let engine = FraudEngine::default();
        let a = engine.analyze(None, tp(27.7, 85.3, 0)).unwrap();
        assert!(!a.checked);
        assert!(!a.is_suspicious);
        assert_eq!(a.risk_level, RiskLevel::Low);
        assert_eq!(a.recorded_speed(), None);
    }

    #[test]
    fn zero_distance_is_low_risk() {
        let engine = FraudEngine::default();
        let a = engine
            .analyze(Some(tp(27.7172, 85.3240, 0)), tp(27.7172, 85.3240, 30))
            .unwrap();
        assert_eq!(a.speed_kmh, 0.0);
        assert!(!a.is_suspicious);
        assert_eq!(a.risk_level, RiskLevel::Low);
    }

    #[test]
    fn fifty_km_in_one_minute_is_high_risk() {
        let engine = FraudEngine::default();
        // ~0.45 degrees of latitude ≈ 50 km
        let a = engine
            .analyze(Some(tp(27.7172, 85.3240, 0)), tp(28.1669, 85.3240, 1))
            .unwrap();
        assert!(a.distance_meters > 49_000.0 && a.distance_meters < 51_000.0);
        assert!(a.is_suspicious);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert!(a.reason.unwrap().contains("speed"));
    }

    #[test]
    fn same_instant_never_flags() {
        let engine = FraudEngine::default();
        let a = engine
            .analyze(Some(tp(27.7172, 85.3240, 0)), tp(28.1669, 85.3240, 0))
            .unwrap();
        assert_eq!(a.speed_kmh, 0.0);
        assert!(!a.is_suspicious);
    }

    #[test]
    fn thresholds_come_from_config() {
        let engine = FraudEngine::new(FraudConfig {
            high_speed_kmh: 20.0,
            medium_speed_kmh: 5.0,
        });
        assert_eq!(engine.classify(4.0), RiskLevel::Low);
        assert_eq!(engine.classify(10.0), RiskLevel::Medium);
        assert_eq!(engine.classify(25.0), RiskLevel::High);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let cfg = FraudConfig {
            high_speed_kmh: 50.0,
            medium_speed_kmh: 80.0,
        };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
        assert!(FraudConfig::default().validate().is_ok());
    }

    #[test]
    fn reasons_append_and_dedupe() {
        assert_eq!(merge_flag_reason(None, "A").as_deref(), Some("A"));
        assert_eq!(merge_flag_reason(Some(""), "A").as_deref(), Some("A"));
        assert_eq!(merge_flag_reason(Some("A"), "B").as_deref(), Some("A; B"));
        assert_eq!(merge_flag_reason(Some("A; B"), "A"), None);
    }
}
