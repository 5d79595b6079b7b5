//! ID sequence generator (§4.1).
//!
//! Prefixed, year-scoped identifiers (`PO-2026-0001`). Collisions under
//! concurrent writers are resolved by retry: the caller attempts an insert
//! with the candidate id under a uniqueness constraint, and on conflict
//! calls back in to re-derive the next candidate.

use anyhow::{Context, Result};
use chrono::Datelike;
use sqlx::{Sqlite, Transaction};

/// Compute the next `<PREFIX>-<YEAR>-<NNN>` identifier for `table`'s `id`
/// column, zero-padded to `width` digits. Must be called from inside the
/// same transaction that will insert the row, so the caller can retry on a
/// unique-constraint violation without re-deriving from stale state twice.
pub async fn next_sequence_id(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    prefix: &str,
    width: usize,
) -> Result<String> {
    let year = chrono::Utc::now().year();
    let like_pattern = format!("{prefix}-{year}-%");

    // Table names are internal constants (never user input), so string
    // interpolation here is not an injection surface.
    let query = format!("SELECT id FROM {table} WHERE id LIKE ? ORDER BY id DESC LIMIT 1");
    let row: Option<(String,)> = sqlx::query_as(&query)
        .bind(&like_pattern)
        .fetch_optional(&mut **tx)
        .await
        .with_context(|| format!("sequence lookup failed for {table}"))?;

    let next_n = match row {
        Some((id,)) => {
            let tail = id.rsplit('-').next().unwrap_or("0");
            tail.parse::<u64>().unwrap_or(0) + 1
        }
        None => 1,
    };

    Ok(format!("{prefix}-{year}-{next_n:0width$}"))
}

/// Returns true if `err` is a unique-constraint violation, the signal the
/// caller should use to retry `next_sequence_id` with a fresh transaction.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect_in_memory, migrate};

    #[tokio::test]
    async fn first_id_of_year_is_one() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();
        let mut tx = pool.begin().await.unwrap();
        let id = next_sequence_id(&mut tx, "pos", "PO", 4).await.unwrap();
        let year = chrono::Utc::now().year();
        assert_eq!(id, format!("PO-{year}-0001"));
    }

    #[tokio::test]
    async fn increments_after_existing_row() {
        let pool = connect_in_memory().await.unwrap();
        migrate(&pool).await.unwrap();
        let year = chrono::Utc::now().year();

        sqlx::query("INSERT INTO vendors (id, name, created_at) VALUES ('V-1','Acme','2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO pos (id, vendor_id, status, created_by, created_at) VALUES (?, 'V-1', 'draft', 1, '2026-01-01T00:00:00Z')")
            .bind(format!("PO-{year}-0007"))
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        let id = next_sequence_id(&mut tx, "pos", "PO", 4).await.unwrap();
        assert_eq!(id, format!("PO-{year}-0008"));
    }
}
