use rattendance::core::directory::{AccessDirectory, StaticDirectory};
use rattendance::core::distance::distance;
use rattendance::core::executor::TransactionExecutor;
use rattendance::core::geofence::{GeoResolver, is_within_radius};
use rattendance::db::initialize::init_db;
use rattendance::db::pool::DbPool;
use rattendance::errors::AppError;
use rattendance::models::geo_point::GeoPoint;
use rattendance::models::operation::OperationClass;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{BRANCH, DIRECTORY_YAML, HQ, POKHARA, count_rows, setup_test_db};

fn resolver() -> GeoResolver {
    GeoResolver::new(Arc::new(
        StaticDirectory::from_yaml_str(DIRECTORY_YAML).unwrap(),
    ))
}

fn migrated_pool(name: &str) -> DbPool {
    let pool = DbPool::new(&setup_test_db(name), Duration::from_millis(5000)).unwrap();
    init_db(&pool.lock()).unwrap();
    pool
}

// ------------------------------------------------
// Geofence
// ------------------------------------------------

#[test]
fn radius_boundary_is_inclusive() {
    let d = distance(HQ.0, HQ.1, BRANCH.0, BRANCH.1).unwrap();

    assert!(is_within_radius(HQ.0, HQ.1, BRANCH.0, BRANCH.1, d).unwrap());
    assert!(!is_within_radius(HQ.0, HQ.1, BRANCH.0, BRANCH.1, d - 0.001).unwrap());
}

#[test]
fn kathmandu_office_scenario() {
    let access = resolver()
        .validate_location_access("alice", GeoPoint::new(27.7172, 85.3240).unwrap())
        .unwrap();

    assert!(access.is_valid);
    let nearest = access.nearest.unwrap();
    assert_eq!(nearest.entity.id, "hq");
    assert!(nearest.is_within_radius);
    assert_eq!(access.candidates.len(), 2);
}

#[test]
fn outside_every_fence_lists_candidates_closest_first() {
    let access = resolver()
        .validate_location_access("bob", GeoPoint::new(27.7186, 85.3240).unwrap())
        .unwrap();

    // halfway between HQ and branch, inside neither
    assert!(!access.is_valid);
    assert_eq!(access.candidates.len(), 3);
    assert!(
        access
            .candidates
            .windows(2)
            .all(|w| w[0].distance_meters <= w[1].distance_meters)
    );
    assert_eq!(access.candidates[2].entity.id, "pokhara");
    assert!(access.describe_rejection().contains("nearest"));
}

#[test]
fn unknown_user_has_no_candidates() {
    let access = resolver()
        .validate_location_access("mallory", GeoPoint::new(HQ.0, HQ.1).unwrap())
        .unwrap();

    assert!(!access.is_valid);
    assert!(access.nearest.is_none());
    assert!(access.describe_rejection().contains("No authorized locations"));
}

#[test]
fn entity_access_follows_department() {
    let r = resolver();
    assert!(r.has_entity_access("bob", "pokhara").unwrap());
    assert!(!r.has_entity_access("alice", "pokhara").unwrap());
    assert!(!r.has_entity_access("mallory", "hq").unwrap());

    let m = r
        .check_entity("bob", "pokhara", GeoPoint::new(POKHARA.0, POKHARA.1).unwrap())
        .unwrap();
    assert!(m.is_within_radius);
}

// ------------------------------------------------
// Directory validation
// ------------------------------------------------

#[test]
fn directory_rejects_out_of_range_radius() {
    for radius in ["5", "1001"] {
        let yaml = format!(
            "entities:\n  - {{id: x, name: X, latitude: 1.0, longitude: 1.0, radius_meters: {radius}}}\n"
        );
        let err = StaticDirectory::from_yaml_str(&yaml).err().unwrap();
        assert!(matches!(err, AppError::Config(_)), "{err}");
    }
}

#[test]
fn directory_rejects_bad_entity_coordinates() {
    let yaml = "entities:\n  - {id: x, name: X, latitude: 95.0, longitude: 1.0, radius_meters: 50}\n";
    let err = StaticDirectory::from_yaml_str(yaml).err().unwrap();
    assert!(matches!(err, AppError::Config(_)), "{err}");
}

#[test]
fn directory_rejects_dangling_references() {
    let unknown_entity = "departments:\n  - {id: d, entity_ids: [ghost]}\n";
    assert!(matches!(
        StaticDirectory::from_yaml_str(unknown_entity),
        Err(AppError::Config(_))
    ));

    let unknown_department = "users:\n  - {user_id: u, department_id: ghost}\n";
    assert!(matches!(
        StaticDirectory::from_yaml_str(unknown_department),
        Err(AppError::Config(_))
    ));

    let duplicate = "entities:\n  - {id: x, name: X, latitude: 1.0, longitude: 1.0, radius_meters: 50}\n  - {id: x, name: Y, latitude: 2.0, longitude: 2.0, radius_meters: 50}\n";
    assert!(matches!(
        StaticDirectory::from_yaml_str(duplicate),
        Err(AppError::Config(_))
    ));
}

#[test]
fn missing_directory_file_is_empty() {
    let path = std::env::temp_dir().join("rattendance_no_such_directory.yaml");
    std::fs::remove_file(&path).ok();

    let dir = StaticDirectory::from_file(&path).unwrap();
    assert_eq!(dir.entity_count(), 0);
    assert!(dir.accessible_entities("alice").unwrap().is_empty());
}

// ------------------------------------------------
// Executor
// ------------------------------------------------

#[tokio::test]
async fn failed_work_rolls_back_every_write() {
    let pool = migrated_pool("executor_rollback");
    let ex = TransactionExecutor::new(pool.clone(), Duration::from_secs(1));
    let before = count_rows(&pool, "log");

    let err = ex
        .execute("alice", OperationClass::ClockIn, |tx| {
            tx.execute(
                "INSERT INTO log (date, operation, target, message) VALUES ('now', 'x', '', 'y')",
                [],
            )?;
            Err::<(), _>(AppError::Validation("nope".into()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(ref m) if m == "nope"));
    assert_eq!(count_rows(&pool, "log"), before);
    assert_eq!(ex.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_key_times_out_other_keys_proceed() {
    let pool = migrated_pool("executor_contention");
    let ex = Arc::new(TransactionExecutor::new(pool, Duration::from_millis(50)));

    let holder = {
        let ex = ex.clone();
        tokio::spawn(async move {
            ex.execute("alice", OperationClass::ClockIn, |_tx| {
                std::thread::sleep(Duration::from_millis(400));
                Ok(())
            })
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(ex.is_in_flight("alice", OperationClass::ClockIn));

    let err = ex
        .execute("alice", OperationClass::ClockIn, |_tx| Ok(()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConcurrentOperation(_)), "{err}");
    assert!(err.is_retryable());

    // a different class for the same user is not held back by the key
    ex.execute("alice", OperationClass::ClockOut, |_tx| Ok(()))
        .await
        .unwrap();

    holder.await.unwrap().unwrap();
    assert!(!ex.is_in_flight("alice", OperationClass::ClockIn));
    assert_eq!(ex.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_key_operations_run_in_arrival_order() {
    let pool = migrated_pool("executor_order");
    let ex = Arc::new(TransactionExecutor::new(pool.clone(), Duration::from_secs(5)));

    let mut handles = Vec::new();
    for i in 0..5 {
        let ex = ex.clone();
        handles.push(tokio::spawn(async move {
            ex.execute("bob", OperationClass::SessionCheckIn, move |tx| {
                tx.execute(
                    "INSERT INTO log (date, operation, target, message) VALUES ('t', 'order', '', ?1)",
                    [i.to_string()],
                )?;
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            })
            .await
        }));
        // stagger arrivals
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let conn = pool.lock();
    let mut stmt = conn
        .prepare("SELECT message FROM log WHERE operation = 'order' ORDER BY id")
        .unwrap();
    let order: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(order, ["0", "1", "2", "3", "4"]);
}
