//! Audit trail, change history, and undo-log queries backing C2.
//!
//! Mirrors the teacher's `mqk-audit` persistence shape: one append-only
//! events table plus a narrower change-history table keyed by
//! module/record for fast per-record history lookups.

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::AuditEventRow;
use crate::now_str;

pub struct NewAuditEvent<'a> {
    pub user_id: Option<i64>,
    pub username: Option<&'a str>,
    pub action: &'a str,
    pub module: &'a str,
    pub record_id: &'a str,
    pub summary: &'a str,
    pub before_json: Option<&'a str>,
    pub after_json: Option<&'a str>,
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// Appends the audit event and the paired change-history row in the same
/// transaction the caller is already inside (C2: audit recording is
/// mandatory and best-effort only with respect to ordering, never to
/// durability — it must commit alongside the mutation it describes).
pub async fn record_change(tx: &mut Transaction<'_, Sqlite>, ev: NewAuditEvent<'_>) -> Result<i64> {
    let created_at = now_str();
    let id = sqlx::query(
        "INSERT INTO audit_events (user_id, username, action, module, record_id, summary, before_json, after_json, ip, user_agent, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ev.user_id)
    .bind(ev.username)
    .bind(ev.action)
    .bind(ev.module)
    .bind(ev.record_id)
    .bind(ev.summary)
    .bind(ev.before_json)
    .bind(ev.after_json)
    .bind(ev.ip)
    .bind(ev.user_agent)
    .bind(&created_at)
    .execute(&mut **tx)
    .await
    .context("insert audit_event failed")?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO change_history (audit_event_id, module, record_id, field, before_value, after_value, created_at)
         VALUES (?, ?, ?, 'record', ?, ?, ?)",
    )
    .bind(id)
    .bind(ev.module)
    .bind(ev.record_id)
    .bind(ev.before_json)
    .bind(ev.after_json)
    .bind(&created_at)
    .execute(&mut **tx)
    .await
    .context("insert change_history failed")?;

    Ok(id)
}

pub async fn fetch_record_history(
    pool: &SqlitePool,
    module: &str,
    record_id: &str,
) -> Result<Vec<AuditEventRow>> {
    sqlx::query_as::<_, AuditEventRow>(
        "SELECT * FROM audit_events WHERE module = ? AND record_id = ? ORDER BY created_at DESC",
    )
    .bind(module)
    .bind(record_id)
    .fetch_all(pool)
    .await
    .context("fetch_record_history failed")
}

pub async fn fetch_audit_events(
    pool: &SqlitePool,
    module: Option<&str>,
    limit: i64,
) -> Result<Vec<AuditEventRow>> {
    match module {
        Some(m) => sqlx::query_as::<_, AuditEventRow>(
            "SELECT * FROM audit_events WHERE module = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(m)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("fetch_audit_events failed"),
        None => sqlx::query_as::<_, AuditEventRow>(
            "SELECT * FROM audit_events ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("fetch_audit_events failed"),
    }
}

/// Records an entry in the undo log for the narrow set of mutations §4.6
/// allows reverting; the workflow layer decides what is undoable, this
/// layer only stores the snapshot.
pub async fn insert_undo_entry(
    tx: &mut Transaction<'_, Sqlite>,
    audit_event_id: i64,
    module: &str,
    record_id: &str,
    snapshot_json: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO undo_log (audit_event_id, module, record_id, snapshot_json, created_at, applied)
         VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(audit_event_id)
    .bind(module)
    .bind(record_id)
    .bind(snapshot_json)
    .bind(now_str())
    .execute(&mut **tx)
    .await
    .context("insert_undo_entry failed")?;
    Ok(())
}

pub async fn fetch_undo_entry(
    pool: &SqlitePool,
    audit_event_id: i64,
) -> Result<Option<(i64, String, String, String, bool)>> {
    sqlx::query_as::<_, (i64, String, String, String, bool)>(
        "SELECT id, module, record_id, snapshot_json, applied FROM undo_log WHERE audit_event_id = ?",
    )
    .bind(audit_event_id)
    .fetch_optional(pool)
    .await
    .context("fetch_undo_entry failed")
}

pub async fn mark_undo_applied(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<()> {
    sqlx::query("UPDATE undo_log SET applied = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await
        .context("mark_undo_applied failed")?;
    Ok(())
}
