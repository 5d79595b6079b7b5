//! Change recording (C2): a single `record_change` primitive that every
//! `zrp-workflow` mutation calls instead of hand-rolling audit SQL,
//! mirroring the teacher's single `AuditWriter::append` chokepoint in
//! `mqk-audit`.
//!
//! The teacher's writer is an append-only JSONL file with an optional SHA-256
//! hash chain for tamper evidence, which fits a trading daemon's
//! reproducibility requirements. This domain has no such requirement — audit
//! rows live in the same SQLite database as the business data they describe
//! (so they can commit in the same transaction, per the mandatory-audit
//! policy below) — so the hash chain is dropped; see DESIGN.md.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};

use zrp_db::audit_queries::{self, NewAuditEvent};
use zrp_schemas::{Action, DomainEvent, Module, Principal};
use std::str::FromStr;

/// Describes one mutation for the audit/undo subsystem. `before`/`after` are
/// serialized to JSON; `None` `before` means a create, `None` `after` means a
/// delete or terminal state transition with nothing left to snapshot.
pub struct ChangeDescription<'a, B: Serialize, A: Serialize> {
    pub module: &'a str,
    pub record_id: &'a str,
    pub action: &'a str,
    pub summary: &'a str,
    pub before: Option<&'a B>,
    pub after: Option<&'a A>,
}

/// Records the audit event and change-history row inside the caller's
/// transaction (§4.2: audit is mandatory, so a failure here aborts the whole
/// transaction rather than being swallowed) and stages an undo-log entry
/// when `before` is present. Returns the new `audit_events.id`, which the
/// caller threads into the post-commit C7 fan-out as the event's identity.
pub async fn record_change<B: Serialize, A: Serialize>(
    tx: &mut Transaction<'_, Sqlite>,
    principal: &Principal,
    ip: Option<&str>,
    user_agent: Option<&str>,
    change: ChangeDescription<'_, B, A>,
) -> Result<i64> {
    let before_json = change.before.map(serde_json::to_string).transpose()?;
    let after_json = change.after.map(serde_json::to_string).transpose()?;

    let id = audit_queries::record_change(
        tx,
        NewAuditEvent {
            user_id: Some(principal.user_id),
            username: Some(&principal.username),
            action: change.action,
            module: change.module,
            record_id: change.record_id,
            summary: change.summary,
            before_json: before_json.as_deref(),
            after_json: after_json.as_deref(),
            ip,
            user_agent,
        },
    )
    .await?;

    if let Some(before_json) = before_json {
        audit_queries::insert_undo_entry(tx, id, change.module, change.record_id, &before_json).await?;
    }

    Ok(id)
}

/// Fetches the audit trail for one record, newest first (§4.2 "change
/// history").
pub async fn record_history(
    pool: &SqlitePool,
    module: &str,
    record_id: &str,
) -> Result<Vec<zrp_db::model::AuditEventRow>> {
    audit_queries::fetch_record_history(pool, module, record_id).await
}

pub async fn recent_events(
    pool: &SqlitePool,
    module: Option<&str>,
    limit: i64,
) -> Result<Vec<zrp_db::model::AuditEventRow>> {
    audit_queries::fetch_audit_events(pool, module, limit).await
}

/// Default undo window (§4.2: "an undo log with `expires_at` (default 5
/// min)"). The audit_events row's `created_at` anchors the window; a
/// read-past-expiry caller gets `UndoError::Expired`.
pub const UNDO_WINDOW: chrono::Duration = chrono::Duration::minutes(5);

#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    #[error("no undo entry for audit event {0}")]
    NotFound(i64),
    #[error("undo window for audit event {0} has expired")]
    Expired(i64),
    #[error("undo entry for audit event {0} was already applied")]
    AlreadyApplied(i64),
}

/// Looks up the undo snapshot for `audit_event_id`, enforcing the expiry
/// window. Returns the snapshot JSON for the caller (`zrp-workflow`) to
/// apply back onto the live row — this crate only guards the policy, it
/// doesn't know how to reverse a domain mutation.
pub async fn fetch_undoable_snapshot(
    pool: &SqlitePool,
    audit_event_id: i64,
    event_created_at: chrono::DateTime<chrono::Utc>,
) -> Result<Result<String, UndoError>> {
    let Some((id, _module, _record_id, snapshot_json, applied)) =
        audit_queries::fetch_undo_entry(pool, audit_event_id).await?
    else {
        return Ok(Err(UndoError::NotFound(audit_event_id)));
    };
    if applied {
        return Ok(Err(UndoError::AlreadyApplied(audit_event_id)));
    }
    if chrono::Utc::now() - event_created_at > UNDO_WINDOW {
        return Ok(Err(UndoError::Expired(audit_event_id)));
    }
    let _ = id;
    Ok(Ok(snapshot_json))
}

pub async fn mark_undo_applied(tx: &mut Transaction<'_, Sqlite>, undo_row_id: i64) -> Result<()> {
    audit_queries::mark_undo_applied(tx, undo_row_id).await
}

/// Wraps a freshly recorded audit row as the generic `DomainEvent::Audit`
/// variant (§4.2/§4.7: every audit write is itself broadcastable, in
/// addition to any more specific event the caller also emits, e.g.
/// `DomainEvent::EcoApproved`).
pub fn audit_domain_event(
    audit_id: i64,
    module: &str,
    action: &str,
    record_id: &str,
    summary: &str,
) -> Result<DomainEvent> {
    Ok(DomainEvent::Audit {
        audit_id,
        module: Module::from_str(module)?,
        action: Action::from_str(action)?,
        record_id: record_id.to_string(),
        summary: summary.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "qa".into(),
            role: zrp_schemas::Role::Admin,
            auth_method: zrp_schemas::AuthMethod::Cookie,
        }
    }

    #[tokio::test]
    async fn record_change_writes_audit_and_undo_entry() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();

        let audit_id = zrp_db::with_tx(&pool, |tx| {
            let principal = principal();
            async move {
                record_change(
                    tx,
                    &principal,
                    Some("127.0.0.1"),
                    Some("test-agent"),
                    ChangeDescription {
                        module: "parts",
                        record_id: "IPN-0001",
                        action: "edit",
                        summary: "updated description",
                        before: Some(&json!({"description": "old"})),
                        after: Some(&json!({"description": "new"})),
                    },
                )
                .await
            }
        })
        .await
        .unwrap();

        let history = record_history(&pool, "parts", "IPN-0001").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, audit_id);

        let snapshot = fetch_undoable_snapshot(&pool, audit_id, history[0].created_at)
            .await
            .unwrap();
        assert!(snapshot.is_ok());
    }

    #[tokio::test]
    async fn undo_snapshot_reports_expired_past_window() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();

        let audit_id = zrp_db::with_tx(&pool, |tx| {
            let principal = principal();
            async move {
                record_change(
                    tx,
                    &principal,
                    None,
                    None,
                    ChangeDescription {
                        module: "parts",
                        record_id: "IPN-0002",
                        action: "edit",
                        summary: "updated description",
                        before: Some(&json!({"description": "old"})),
                        after: Some(&json!({"description": "new"})),
                    },
                )
                .await
            }
        })
        .await
        .unwrap();

        let stale = chrono::Utc::now() - chrono::Duration::minutes(10);
        let result = fetch_undoable_snapshot(&pool, audit_id, stale).await.unwrap();
        assert!(matches!(result, Err(UndoError::Expired(_))));
    }
}
