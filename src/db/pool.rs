//! Shared SQLite handle.
//!
//! One connection guarded by a std mutex; every unit of work runs on the
//! blocking thread pool so the async scheduler is never stalled by I/O.

use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Clone)]
pub struct DbPool {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl DbPool {
    pub fn new(path: &str, busy_timeout: Duration) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::from_connection(conn, path)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ":memory:")
    }

    fn from_connection(conn: Connection, path: &str) -> AppResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lock the connection on the current thread. Only for sync callers
    /// (CLI maintenance commands); async code goes through `read`/`transaction`.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        // a panic inside a unit of work already rolled its transaction back
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only closure on the blocking pool.
    pub async fn read<F, T>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            work(&guard)
        })
        .await
        .map_err(|e| AppError::Internal(format!("storage task failed: {e}")))?
    }

    /// Run `work` inside one atomic transaction.
    ///
    /// Commits when `work` returns `Ok`, rolls back on `Err` and returns the
    /// error unchanged. A panic drops the transaction, which also rolls back.
    pub async fn transaction<F, T>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.transaction_holding((), work).await
    }

    /// Like [`DbPool::transaction`], but keeps `held` alive until the
    /// transaction has committed or rolled back, even if the caller stops
    /// polling the returned future.
    pub async fn transaction_holding<H, F, T>(&self, held: H, work: F) -> AppResult<T>
    where
        H: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let _held = held;
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;

            match work(&tx) {
                Ok(value) => {
                    tx.commit()?;
                    tracing::debug!("transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rb) = tx.rollback() {
                        tracing::error!(error = %rb, "rollback failed");
                    } else {
                        tracing::debug!(error = %e, "transaction rolled back");
                    }
                    Err(e)
                }
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "storage task aborted, transaction rolled back");
            AppError::Internal("unexpected failure while writing attendance data".into())
        })?
    }
}
