//! Change history, recent-events feed, and the undo-window preview (C9).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use zrp_schemas::{Action, DataEnvelope, Module};

use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const RECENT_LIMIT: i64 = 200;

pub async fn record_history(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((module, record_id)): Path<(String, String)>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::AuditEventRow>>>> {
    require_capability(&state, &principal, Module::Audit, Action::View).await?;
    let rows = zrp_audit::record_history(state.pool(), &module, &record_id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

#[derive(Debug, Deserialize)]
pub struct RecentEventsQuery {
    module: Option<String>,
}

pub async fn recent_events(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(query): Query<RecentEventsQuery>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::AuditEventRow>>>> {
    require_capability(&state, &principal, Module::Audit, Action::View).await?;
    let rows = zrp_audit::recent_events(state.pool(), query.module.as_deref(), RECENT_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

#[derive(serde::Serialize)]
pub struct UndoPreview {
    pub snapshot: serde_json::Value,
}

/// Reads the audit trail for `module`/`record_id`, locates `audit_event_id`
/// in it, and returns the pre-change snapshot if the undo window hasn't
/// lapsed. Undoes are previewed here, not applied — reversing a domain
/// mutation is workflow-specific and isn't wired up generically.
pub async fn preview_undo(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path((module, record_id, audit_event_id)): Path<(String, String, i64)>,
) -> ApiResult<Json<DataEnvelope<UndoPreview>>> {
    require_capability(&state, &principal, Module::Audit, Action::View).await?;
    let history = zrp_audit::record_history(state.pool(), &module, &record_id).await?;
    let event = history
        .into_iter()
        .find(|e| e.id == audit_event_id)
        .ok_or_else(|| ApiError::NotFound(format!("audit event {audit_event_id}")))?;

    let snapshot_json = zrp_audit::fetch_undoable_snapshot(state.pool(), audit_event_id, event.created_at)
        .await?
        .map_err(|e| ApiError::Conflict(e.to_string()))?;
    let snapshot = serde_json::from_str(&snapshot_json)?;
    Ok(Json(DataEnvelope::new(UndoPreview { snapshot })))
}
