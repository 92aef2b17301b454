#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, Local, TimeZone};
use rattendance::core::clock::ManualClock;
use rattendance::core::directory::StaticDirectory;
use rattendance::core::service::{AttendanceService, ServiceSettings};
use rattendance::db::initialize::init_db;
use rattendance::db::pool::DbPool;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// HQ in Kathmandu, 100 m fence.
pub const HQ: (f64, f64) = (27.7172, 85.3240);
/// Branch office roughly 311 m north of HQ, 50 m fence.
pub const BRANCH: (f64, f64) = (27.7200, 85.3240);
/// Pokhara site, about 140 km west.
pub const POKHARA: (f64, f64) = (28.2096, 83.9856);

pub const DIRECTORY_YAML: &str = r#"
entities:
  - id: hq
    name: Head Office
    latitude: 27.7172
    longitude: 85.3240
    radius_meters: 100
  - id: branch
    name: Branch Office
    latitude: 27.7200
    longitude: 85.3240
    radius_meters: 50
  - id: pokhara
    name: Pokhara Site
    latitude: 28.2096
    longitude: 83.9856
    radius_meters: 200
departments:
  - id: ops
    name: Operations
    entity_ids: [hq, branch]
  - id: field
    name: Field Team
    entity_ids: [hq, branch, pokhara]
users:
  - user_id: alice
    department_id: ops
  - user_id: bob
    department_id: field
"#;

pub fn rti() -> Command {
    cargo_bin_cmd!("rattendance")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rattendance.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm"] {
        fs::remove_file(format!("{db_path}{suffix}")).ok();
    }
    db_path
}

/// Write the sample directory next to the test DB and return its path
pub fn setup_directory(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_directory.yaml", name));
    fs::write(&path, DIRECTORY_YAML).expect("write directory");
    path.to_string_lossy().to_string()
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// Initialize a DB through the CLI and return `(db, directory)` paths
pub fn init_cli_env(name: &str) -> (String, String) {
    let db = setup_test_db(name);
    let dir = setup_directory(name);
    rti()
        .args(["--db", &db, "--directory", &dir, "--test", "init"])
        .assert()
        .success();
    (db, dir)
}

/// Monday 2025-03-03 at the given local time.
pub fn at(h: u32, m: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2025, 3, 3, h, m, 0)
        .single()
        .expect("unambiguous local time")
}

pub struct TestEnv {
    pub service: AttendanceService,
    pub clock: Arc<ManualClock>,
    pub pool: DbPool,
}

/// A migrated on-disk database, the sample directory and a clock set to 09:00.
pub fn service_env(name: &str) -> TestEnv {
    service_env_with(name, ServiceSettings::default())
}

pub fn service_env_with(name: &str, settings: ServiceSettings) -> TestEnv {
    let db_path = setup_test_db(name);
    let pool = DbPool::new(&db_path, Duration::from_millis(5000)).expect("open db");
    init_db(&pool.lock()).expect("migrate");

    let directory = StaticDirectory::from_yaml_str(DIRECTORY_YAML).expect("directory");
    let clock = Arc::new(ManualClock::new(at(9, 0)));
    let service =
        AttendanceService::with_clock(pool.clone(), Arc::new(directory), settings, clock.clone())
            .expect("service");

    TestEnv {
        service,
        clock,
        pool,
    }
}

/// Count rows of a table, for "nothing was created" assertions
pub fn count_rows(pool: &DbPool, table: &str) -> i64 {
    pool.lock()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .expect("count")
}
