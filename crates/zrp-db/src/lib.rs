//! Persistence gateway (C1).
//!
//! A single process-wide pool over an embedded SQLite store with
//! write-ahead logging, a busy-wait timeout, and foreign keys enforced on
//! every connection (§4.1). The teacher's `mqk-db` targets Postgres via
//! `sqlx::PgPool`; here the pool type is `sqlx::SqlitePool` — same crate,
//! different driver feature, because §1/§3 require a local embedded store
//! rather than a server-based one (see DESIGN.md).

pub mod audit_queries;
pub mod fleet;
pub mod identity;
pub mod inventory;
pub mod model;
pub mod notify_queries;
pub mod procurement;
pub mod quality;
pub mod sequence;
pub mod shipments;
pub mod thin;
pub mod workorders;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

pub use sequence::next_sequence_id;

/// Busy-wait timeout the embedded store waits before surfacing `SQLITE_BUSY`
/// to a writer contending with the single allowed concurrent writer (§4.1).
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open (creating if absent) the embedded database at `path` and cap the
/// pool at ~10 connections, matching §4.1. SQLite natively allows exactly
/// one writer at a time; WAL mode lets readers proceed concurrently with
/// that writer instead of blocking on it.
pub async fn connect(path: impl AsRef<Path>) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await
        .with_context(|| format!("failed to open database at {:?}", path.as_ref()))?;

    Ok(pool)
}

/// In-memory pool for tests; each connection gets its own schema unless a
/// shared cache URI is used, so the pool is capped at 1 connection to
/// guarantee every query hits the same in-memory database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(":memory:")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .context("failed to open in-memory database")?;

    Ok(pool)
}

/// Run embedded SQLx migrations (schema ownership per §4.1; migration SQL
/// itself is out of spec scope per §1, but applying it is the gateway's job).
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Run `f` inside a transaction, committing on `Ok` and rolling back on
/// `Err` or panic (the panic case is handled by `Transaction::drop`, which
/// SQLite treats as an implicit rollback when neither `commit` nor
/// `rollback` was reached).
///
/// All multi-step invariants named in §4.6 (inventory adjustment, PO
/// receipt, WO completion, ECO implementation) must run through this, never
/// through a bare `pool.execute`.
pub async fn with_tx<F, T>(pool: &SqlitePool, f: F) -> Result<T>
where
    for<'c> F: FnOnce(&'c mut Transaction<'_, Sqlite>) -> BoxFuture<'c, Result<T>>,
{
    let mut tx = pool.begin().await.context("begin transaction failed")?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.context("commit failed")?;
            Ok(value)
        }
        Err(err) => {
            // Explicit rollback (rather than relying on drop) so the error
            // surfaces before the connection returns to the pool.
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Retry policy for contention errors (busy/locked) per §7: up to 3
/// attempts with jittered backoff. Validation/conflict/capability errors
/// must never be retried — callers distinguish by returning a
/// `DbError::NonRetryable` (or any non-sqlx error) which short-circuits.
pub async fn retry_on_busy<F, Fut, T>(mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < 3 && is_busy_error(&e) => {
                attempt += 1;
                let jitter_ms = 10u64 * (1 << attempt) + (fastrand_ms(attempt));
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_busy_error(err: &anyhow::Error) -> bool {
    if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
        if let Some(db_err) = sqlx_err.as_database_error() {
            let msg = db_err.message().to_ascii_lowercase();
            return msg.contains("busy") || msg.contains("locked");
        }
    }
    false
}

/// Small deterministic jitter derived from the attempt number; avoids
/// pulling in a dedicated RNG for a backoff of a handful of milliseconds.
fn fastrand_ms(attempt: u32) -> u64 {
    (attempt as u64 * 7919) % 50
}

pub fn now_str() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent_on_clean_db() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn with_tx_rolls_back_on_error() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();

        let result: Result<()> = with_tx(&pool, |tx| Box::pin(async move {
            sqlx::query("INSERT INTO vendors (id, name, created_at) VALUES ('V-1', 'Acme', '2026-01-01T00:00:00Z')")
                .execute(&mut **tx)
                .await?;
            anyhow::bail!("force rollback");
        }))
        .await;

        assert!(result.is_err());
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vendors")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
