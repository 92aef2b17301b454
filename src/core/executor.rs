//! Concurrency-safe transaction executor.
//!
//! The only writer of attendance rows. Each invocation:
//!   1. waits for any in-flight operation with the same (user, class) key,
//!   2. opens an immediate transaction,
//!   3. lets the caller's closure re-read state, validate and write,
//!   4. commits, or rolls back everything on any error,
//!   5. releases the key whatever happened.

use crate::core::lock::KeyedMutex;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::operation::OperationClass;
use rusqlite::Transaction;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Partition key of the in-process exclusion lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub user_id: String,
    pub operation: OperationClass,
}

impl LockKey {
    pub fn new(user_id: &str, operation: OperationClass) -> Self {
        Self {
            user_id: user_id.to_string(),
            operation,
        }
    }
}

pub struct TransactionExecutor {
    pool: DbPool,
    locks: KeyedMutex<LockKey>,
    lock_timeout: Duration,
}

impl TransactionExecutor {
    pub fn new(pool: DbPool, lock_timeout: Duration) -> Self {
        Self {
            pool,
            locks: KeyedMutex::new(),
            lock_timeout,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Keys currently running or queued.
    pub fn in_flight(&self) -> usize {
        self.locks.active_keys()
    }

    pub fn is_in_flight(&self, user_id: &str, operation: OperationClass) -> bool {
        self.locks.is_locked(&LockKey::new(user_id, operation))
    }

    /// Run one state transition for `user_id` under the `(user, operation)` lock.
    ///
    /// Errors from `work` are returned unchanged after a full rollback.
    pub async fn execute<F, T>(&self, user_id: &str, operation: OperationClass, work: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let span = tracing::info_span!("attendance_op", user_id, operation = %operation);

        async move {
            let started = Instant::now();
            let guard = self
                .locks
                .acquire(LockKey::new(user_id, operation), self.lock_timeout)
                .await?;
            tracing::debug!(waited_ms = started.elapsed().as_millis() as u64, "lock acquired");

            let result = self.pool.transaction_holding(guard, work).await;

            match &result {
                Ok(_) => tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "operation committed"
                ),
                Err(e) => tracing::warn!(error = %e, "operation rejected"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run a transaction outside any user partition (administrative flags).
    pub async fn execute_unkeyed<F, T>(&self, label: &'static str, work: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.pool
            .transaction(work)
            .instrument(tracing::info_span!("attendance_admin", operation = label))
            .await
    }
}
