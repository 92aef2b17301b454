use chrono::{Duration, TimeZone};
use rattendance::core::distance::{distance, speed_kmh};
use rattendance::core::service::ServiceSettings;
use rattendance::db::log::load_log;
use rattendance::errors::AppError;
use rattendance::models::attendance::AttendanceStatus;
use rattendance::models::operation::RecordType;
use rattendance::models::requests::{
    ClockInRequest, ClockOutRequest, LocationCheckInRequest, LocationCheckOutRequest,
    SessionRequest,
};
use rattendance::models::session_type::SessionType;
use rattendance::models::work_location::WorkLocation;

mod common;
use common::{BRANCH, HQ, POKHARA, at, count_rows, service_env, service_env_with};

fn clock_in_at((lat, lon): (f64, f64)) -> ClockInRequest {
    ClockInRequest {
        latitude: lat,
        longitude: lon,
        ..Default::default()
    }
}

fn clock_out_at((lat, lon): (f64, f64)) -> ClockOutRequest {
    ClockOutRequest {
        latitude: lat,
        longitude: lon,
        notes: None,
    }
}

fn session_at((lat, lon): (f64, f64), session_type: Option<SessionType>) -> SessionRequest {
    SessionRequest {
        latitude: lat,
        longitude: lon,
        session_type,
        notes: None,
    }
}

fn visit_in(entity: &str, (lat, lon): (f64, f64)) -> LocationCheckInRequest {
    LocationCheckInRequest {
        entity_id: entity.to_string(),
        latitude: lat,
        longitude: lon,
        purpose: Some("site inspection".into()),
        notes: None,
    }
}

fn visit_out((lat, lon): (f64, f64)) -> LocationCheckOutRequest {
    LocationCheckOutRequest {
        latitude: lat,
        longitude: lon,
        notes: None,
    }
}

// ------------------------------------------------
// Clock-in
// ------------------------------------------------

#[tokio::test]
async fn clock_in_inside_fence_is_not_flagged() {
    let env = service_env("clock_in_inside_fence");

    let att = env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();

    assert_eq!(att.date, at(9, 0).date_naive());
    assert_eq!(att.clock_in_time, Some(at(9, 0)));
    assert_eq!(att.entity_id.as_deref(), Some("hq"));
    assert_eq!(att.is_within_radius, Some(true));
    assert!(att.distance_from_entity.unwrap() < 0.01);
    assert!(!att.is_flagged);
    assert_eq!(att.flag_reason, None);
    assert_eq!(att.status, AttendanceStatus::ClockedIn);
    assert_eq!(att.work_location, WorkLocation::Office);
}

#[tokio::test]
async fn clock_in_outside_every_fence_is_flagged_but_stored() {
    let env = service_env("clock_in_outside_fence");

    let att = env
        .service
        .clock_in("alice", clock_in_at(POKHARA))
        .await
        .unwrap();

    assert!(att.is_flagged);
    assert_eq!(att.is_within_radius, Some(false));
    let reason = att.flag_reason.unwrap();
    assert!(reason.contains("Outside all authorized locations"), "{reason}");
    assert!(reason.contains("allowed radius"), "{reason}");
}

#[tokio::test]
async fn user_without_entities_is_flagged_on_office_days() {
    let env = service_env("clock_in_no_entities");

    let att = env.service.clock_in("carol", clock_in_at(HQ)).await.unwrap();

    assert!(att.is_flagged);
    assert_eq!(att.entity_id, None);
    assert!(att.flag_reason.unwrap().contains("No authorized locations"));
}

#[tokio::test]
async fn remote_days_skip_the_geofence() {
    let env = service_env("clock_in_remote");

    let att = env
        .service
        .clock_in(
            "alice",
            ClockInRequest {
                latitude: POKHARA.0,
                longitude: POKHARA.1,
                work_location: Some(WorkLocation::Remote),
                remote_location: Some("home".into()),
                notes: Some("  working from home ".into()),
            },
        )
        .await
        .unwrap();

    assert!(!att.is_flagged);
    assert_eq!(att.entity_id, None);
    assert_eq!(att.is_within_radius, None);
    assert_eq!(att.remote_location.as_deref(), Some("home"));
    assert_eq!(att.clock_in_notes.as_deref(), Some("working from home"));
}

#[tokio::test]
async fn second_clock_in_same_day_conflicts() {
    let env = service_env("clock_in_twice");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.advance(Duration::minutes(5));
    let err = env
        .service
        .clock_in("alice", clock_in_at(HQ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "{err}");
    assert_eq!(count_rows(&env.pool, "daily_attendance"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clock_ins_create_exactly_one_row() {
    let env = service_env("clock_in_concurrent");
    let a = env.service.clone();
    let b = env.service.clone();

    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { a.clock_in("alice", clock_in_at(HQ)).await }),
        tokio::spawn(async move { b.clock_in("alice", clock_in_at(HQ)).await }),
    );
    let results = [r1.unwrap(), r2.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(count_rows(&env.pool, "daily_attendance"), 1);
    assert_eq!(env.service.executor().in_flight(), 0);
}

#[tokio::test]
async fn different_users_clock_in_independently() {
    let env = service_env("clock_in_two_users");

    let (a, b) = tokio::join!(
        env.service.clock_in("alice", clock_in_at(HQ)),
        env.service.clock_in("bob", clock_in_at(HQ)),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(count_rows(&env.pool, "daily_attendance"), 2);
}

#[tokio::test]
async fn invalid_coordinates_are_rejected_before_any_write() {
    let env = service_env("clock_in_bad_coords");

    for (lat, lon) in [(91.0, 0.0), (0.0, -180.5), (f64::NAN, 10.0), (10.0, f64::INFINITY)] {
        let err = env
            .service
            .clock_in("alice", clock_in_at((lat, lon)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Geospatial(_)), "{err}");
    }
    assert!(env.service.today("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_user_id_is_a_validation_error() {
    let env = service_env("clock_in_empty_user");

    let err = env
        .service
        .clock_in("  ", clock_in_at(HQ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ------------------------------------------------
// Clock-out
// ------------------------------------------------

#[tokio::test]
async fn clock_out_without_clock_in_creates_nothing() {
    let env = service_env("clock_out_no_clock_in");

    let err = env
        .service
        .clock_out("alice", clock_out_at(HQ))
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::NotFound(_) | AppError::Validation(_)),
        "{err}"
    );
    assert_eq!(count_rows(&env.pool, "daily_attendance"), 0);
}

#[tokio::test]
async fn clock_out_computes_hours_and_stays_clean_when_stationary() {
    let env = service_env("clock_out_normal");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(17, 30));
    let att = env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();

    assert_eq!(att.status, AttendanceStatus::ClockedOut);
    assert_eq!(att.clock_out_time, Some(at(17, 30)));
    assert!((att.total_hours.unwrap() - 8.5).abs() < 1e-9);
    assert_eq!(att.travel_speed, Some(0.0));
    assert!(!att.is_flagged);
}

#[tokio::test]
async fn clock_out_fifty_km_after_one_minute_is_flagged() {
    let env = service_env("clock_out_fast_travel");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.advance(Duration::minutes(1));
    let att = env
        .service
        .clock_out("alice", clock_out_at((28.1669, 85.3240)))
        .await
        .unwrap();

    assert!(att.is_flagged);
    assert!(att.travel_speed.unwrap() > 2000.0);
    let reason = att.flag_reason.unwrap();
    assert!(reason.contains("travel speed"), "{reason}");
    assert_eq!(att.status, AttendanceStatus::ClockedOut);
}

#[tokio::test]
async fn medium_speed_is_recorded_without_flagging() {
    let env = service_env("clock_out_medium_speed");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.advance(Duration::minutes(6));
    // about 10 km north, i.e. roughly 100 km/h
    let att = env
        .service
        .clock_out("alice", clock_out_at((27.8071, 85.3240)))
        .await
        .unwrap();

    let speed = att.travel_speed.unwrap();
    assert!(speed > 60.0 && speed <= 120.0, "{speed}");
    assert!(!att.is_flagged);

    let log = load_log(&env.pool.lock()).unwrap();
    assert!(log.iter().any(|e| e.operation == "fraud_medium"));
}

#[tokio::test]
async fn fraud_thresholds_come_from_settings() {
    let mut settings = ServiceSettings::default();
    settings.fraud.medium_speed_kmh = 5.0;
    settings.fraud.high_speed_kmh = 10.0;
    let env = service_env_with("clock_out_custom_thresholds", settings);
    assert_eq!(env.service.fraud_config().high_speed_kmh, 10.0);

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.advance(Duration::minutes(6));
    // about 1.1 km in 6 minutes, 11 km/h
    let att = env
        .service
        .clock_out("alice", clock_out_at((27.7272, 85.3240)))
        .await
        .unwrap();

    assert!(att.is_flagged);
}

#[tokio::test]
async fn clock_out_at_clock_in_instant_is_rejected() {
    let env = service_env("clock_out_same_instant");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    let err = env
        .service
        .clock_out("alice", clock_out_at(HQ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    let att = env.service.today("alice").await.unwrap().unwrap();
    assert_eq!(att.clock_out_time, None);
}

#[tokio::test]
async fn second_clock_out_is_rejected() {
    let env = service_env("clock_out_twice");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(17, 0));
    env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();
    env.clock.set(at(18, 0));
    let err = env
        .service
        .clock_out("alice", clock_out_at(HQ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    let att = env.service.today("alice").await.unwrap().unwrap();
    assert_eq!(att.clock_out_time, Some(at(17, 0)));
}

#[tokio::test]
async fn clock_out_auto_closes_open_session_and_visit() {
    let env = service_env("clock_out_auto_close");

    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(9, 10));
    env.service
        .session_check_in("bob", session_at(HQ, Some(SessionType::Meeting)))
        .await
        .unwrap();
    env.clock.set(at(9, 20));
    env.service
        .location_check_in("bob", visit_in("hq", HQ))
        .await
        .unwrap();

    env.clock.set(at(17, 0));
    let att = env.service.clock_out("bob", clock_out_at(HQ)).await.unwrap();

    assert!(env.service.open_session("bob").await.unwrap().is_none());
    assert!(env.service.open_location_log("bob").await.unwrap().is_none());

    let sessions = env.service.sessions_for(att.id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].check_out_time, Some(at(17, 0)));
    assert_eq!(sessions[0].duration_minutes, Some(470));
    assert!(
        sessions[0]
            .notes
            .as_deref()
            .unwrap()
            .contains("auto-closed at clock-out")
    );

    let logs = env.service.location_logs_for(att.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].check_out_time, Some(at(17, 0)));
    assert_eq!(logs[0].duration_minutes, Some(460));
}

#[tokio::test]
async fn clock_out_closes_children_opened_at_the_same_instant() {
    let env = service_env("clock_out_same_instant");

    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(17, 0));
    env.service
        .session_check_in("bob", session_at(HQ, None))
        .await
        .unwrap();
    env.service
        .location_check_in("bob", visit_in("hq", HQ))
        .await
        .unwrap();

    // same clock reading as both check-ins
    let att = env
        .service
        .clock_out("bob", clock_out_at(POKHARA))
        .await
        .unwrap();
    assert_eq!(att.status, AttendanceStatus::ClockedOut);

    let sessions = env.service.sessions_for(att.id).await.unwrap();
    assert_eq!(sessions[0].check_out_time, Some(at(17, 0)));
    assert_eq!(sessions[0].duration_minutes, Some(0));
    assert_eq!(sessions[0].travel_speed, None);
    assert!(!sessions[0].is_flagged);

    let logs = env.service.location_logs_for(att.id).await.unwrap();
    assert_eq!(logs[0].check_out_time, Some(at(17, 0)));
    assert_eq!(logs[0].duration_minutes, Some(0));
    assert!(!logs[0].is_flagged);

    assert!(env.service.open_session("bob").await.unwrap().is_none());
    assert!(env.service.open_location_log("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn audit_rows_carry_the_transition_time() {
    let env = service_env("audit_clock_time");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(17, 30));
    env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();

    let log = load_log(&env.pool.lock()).unwrap();
    let stamp_of = |op: &str| {
        let e = log.iter().find(|e| e.operation == op).unwrap();
        chrono::DateTime::parse_from_rfc3339(&e.date).unwrap()
    };
    assert_eq!(stamp_of("clock_in"), at(9, 0));
    assert_eq!(stamp_of("clock_out"), at(17, 30));
}

// ------------------------------------------------
// Sessions
// ------------------------------------------------

#[tokio::test]
async fn session_without_clock_in_is_rejected() {
    let env = service_env("session_no_clock_in");

    let err = env
        .service
        .session_check_in("alice", session_at(HQ, None))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("must clock-in first"), "{err}");
    assert_eq!(count_rows(&env.pool, "attendance_sessions"), 0);
}

#[tokio::test]
async fn session_lifecycle() {
    let env = service_env("session_lifecycle");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(12, 0));
    let s = env
        .service
        .session_check_in("alice", session_at(HQ, Some(SessionType::Lunch)))
        .await
        .unwrap();
    assert!(s.is_open());
    assert_eq!(s.session_type, SessionType::Lunch);
    assert_eq!(s.entity_id.as_deref(), Some("hq"));
    assert_eq!(s.is_within_radius, Some(true));

    // only one open session at a time
    env.clock.set(at(12, 5));
    let err = env
        .service
        .session_check_in("alice", session_at(HQ, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err}");

    env.clock.set(at(12, 44));
    env.clock.advance(Duration::seconds(40));
    let closed = env
        .service
        .session_check_out("alice", session_at(HQ, None))
        .await
        .unwrap();
    assert_eq!(closed.id, s.id);
    assert_eq!(closed.duration_minutes, Some(45));
    assert!(!closed.is_flagged);

    let err = env
        .service
        .session_check_out("alice", session_at(HQ, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn session_check_out_compares_with_session_start() {
    let env = service_env("session_fast_travel");

    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(10, 0));
    env.service
        .session_check_in("bob", session_at(HQ, Some(SessionType::Errand)))
        .await
        .unwrap();
    env.clock.set(at(10, 2));
    let s = env
        .service
        .session_check_out("bob", session_at(POKHARA, None))
        .await
        .unwrap();

    assert!(s.is_flagged);
    assert!(s.flag_reason.unwrap().contains("Impossible travel speed"));
}

#[tokio::test]
async fn no_session_after_clock_out() {
    let env = service_env("session_after_clock_out");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(17, 0));
    env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();
    env.clock.set(at(17, 5));

    let err = env
        .service
        .session_check_in("alice", session_at(HQ, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err}");
}

// ------------------------------------------------
// Location visits
// ------------------------------------------------

#[tokio::test]
async fn visit_requires_clock_in() {
    let env = service_env("visit_no_clock_in");

    let err = env
        .service
        .location_check_in("bob", visit_in("hq", HQ))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("must clock-in first"), "{err}");
    assert_eq!(count_rows(&env.pool, "location_logs"), 0);
}

#[tokio::test]
async fn visit_checks_access_and_specific_fence() {
    let env = service_env("visit_access");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(10, 0));

    let err = env
        .service
        .location_check_in("alice", visit_in("pokhara", POKHARA))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccessDenied(_)), "{err}");

    let err = env
        .service
        .location_check_in("alice", visit_in("nowhere", HQ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");

    // standing at the branch, asking for HQ: HQ is checked, not the nearest entity
    let err = env
        .service
        .location_check_in("alice", visit_in("hq", BRANCH))
        .await
        .unwrap_err();
    match err {
        AppError::Geospatial(msg) => {
            assert!(msg.contains("allowed radius is 100 m"), "{msg}");
            assert!(msg.contains("Head Office"), "{msg}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&env.pool, "location_logs"), 0);
}

#[tokio::test]
async fn visit_lifecycle_and_travel_between_visits() {
    let env = service_env("visit_lifecycle");

    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();

    env.clock.set(at(9, 10));
    let first = env
        .service
        .location_check_in("bob", visit_in("hq", HQ))
        .await
        .unwrap();
    assert!(first.is_within_radius);
    assert_eq!(first.purpose.as_deref(), Some("site inspection"));

    env.clock.set(at(9, 12));
    let err = env
        .service
        .location_check_in("bob", visit_in("branch", BRANCH))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err}");

    // first visit has no previous visit, so no speed check
    env.clock.set(at(9, 40));
    let first = env
        .service
        .location_check_out("bob", visit_out(HQ))
        .await
        .unwrap();
    assert_eq!(first.duration_minutes, Some(30));
    assert_eq!(first.travel_speed, None);
    assert!(!first.is_flagged);

    env.clock.set(at(9, 50));
    env.service
        .location_check_in("bob", visit_in("branch", BRANCH))
        .await
        .unwrap();

    // 140 km from the end of the first visit in 11 minutes
    env.clock.set(at(9, 51));
    let second = env
        .service
        .location_check_out("bob", visit_out(POKHARA))
        .await
        .unwrap();
    assert!(second.is_flagged);
    assert!(second.travel_speed.unwrap() > 120.0);

    // elapsed time spans the previous check-out (09:40) to this check-out,
    // time spent at the branch included
    let expected = speed_kmh(distance(HQ.0, HQ.1, POKHARA.0, POKHARA.1).unwrap(), 11.0);
    assert!((second.travel_speed.unwrap() - expected).abs() < 0.01);

    let err = env
        .service
        .location_check_out("bob", visit_out(HQ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn session_and_visit_may_overlap() {
    let env = service_env("session_visit_overlap");

    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(10, 0));

    let (s, v) = tokio::join!(
        env.service
            .session_check_in("bob", session_at(HQ, Some(SessionType::Meeting))),
        env.service.location_check_in("bob", visit_in("hq", HQ)),
    );
    assert!(s.is_ok());
    assert!(v.is_ok());
    assert!(env.service.open_session("bob").await.unwrap().is_some());
    assert!(env.service.open_location_log("bob").await.unwrap().is_some());
}

// ------------------------------------------------
// Flags and queries
// ------------------------------------------------

#[tokio::test]
async fn flag_reasons_append_and_never_overwrite() {
    let env = service_env("flag_append");

    let att = env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();

    env.service
        .flag_suspicious_activity(att.id, RecordType::Attendance, "A")
        .await
        .unwrap();
    env.service
        .flag_suspicious_activity(att.id, RecordType::Attendance, "B")
        .await
        .unwrap();
    // already recorded, no change
    env.service
        .flag_suspicious_activity(att.id, RecordType::Attendance, "A")
        .await
        .unwrap();

    let att = env.service.today("alice").await.unwrap().unwrap();
    assert!(att.is_flagged);
    assert_eq!(att.flag_reason.as_deref(), Some("A; B"));

    let err = env
        .service
        .flag_suspicious_activity(9999, RecordType::Session, "A")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn flagged_listing_spans_record_types() {
    let env = service_env("flagged_listing");

    env.service
        .clock_in("alice", clock_in_at(POKHARA))
        .await
        .unwrap();
    env.service.clock_in("bob", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(10, 0));
    env.service
        .session_check_in("bob", session_at(HQ, None))
        .await
        .unwrap();
    env.clock.set(at(10, 1));
    let s = env
        .service
        .session_check_out("bob", session_at(POKHARA, None))
        .await
        .unwrap();
    assert!(s.is_flagged);

    let all = env.service.flagged(10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].record_type, RecordType::Session);
    assert_eq!(all[1].record_type, RecordType::Attendance);

    let limited = env.service.flagged(1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn history_and_summary_cover_the_range() {
    let env = service_env("history_summary");

    for day in [3, 4, 5] {
        let start = chrono::Local
            .with_ymd_and_hms(2025, 3, day, 9, 0, 0)
            .single()
            .unwrap();
        env.clock.set(start);
        env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
        env.clock.set(start + Duration::hours(8));
        env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();
    }

    let from = chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
    let to = chrono::NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

    let days = env.service.history("alice", from, to).await.unwrap();
    assert_eq!(days.len(), 2);
    assert!(days[0].date < days[1].date);

    let summary = env.service.summary("alice", from, to).await.unwrap();
    assert_eq!(summary.days_present, 2);
    assert_eq!(summary.days_completed, 2);
    assert_eq!(summary.flagged_days, 0);
    assert!((summary.total_hours - 16.0).abs() < 1e-9);
}

#[tokio::test]
async fn every_transition_writes_an_audit_line() {
    let env = service_env("audit_trail");

    env.service.clock_in("alice", clock_in_at(HQ)).await.unwrap();
    env.clock.set(at(10, 0));
    env.service
        .session_check_in("alice", session_at(HQ, None))
        .await
        .unwrap();
    env.clock.set(at(10, 30));
    env.service
        .session_check_out("alice", session_at(HQ, None))
        .await
        .unwrap();
    env.clock.set(at(17, 0));
    env.service.clock_out("alice", clock_out_at(HQ)).await.unwrap();

    let ops: Vec<String> = load_log(&env.pool.lock())
        .unwrap()
        .into_iter()
        .map(|e| e.operation)
        .filter(|op| op != "migration_applied")
        .collect();
    assert_eq!(
        ops,
        ["clock_in", "session_check_in", "session_check_out", "clock_out"]
    );
}
