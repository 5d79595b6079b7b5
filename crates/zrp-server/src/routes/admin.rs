//! User provisioning, device registry, and document attachments (C10).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use zrp_schemas::{Action, DataEnvelope, Module};

use crate::api_types::{AttachDocumentRequest, CreateDeviceRequest, CreateUserRequest};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

pub async fn create_user(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::UserRow>>> {
    require_capability(&state, &principal, Module::Users, Action::Create).await?;
    zrp_auth::password::check_strength(&body.password).map_err(|e| ApiError::Validation(e.to_string()))?;
    let hash = zrp_auth::password::hash_password(&body.password)?;
    let row = zrp_db::identity::create_user(
        state.pool(),
        &body.username,
        &hash,
        &body.display_name,
        &body.email,
        body.role.as_str(),
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_user(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::UserRow>>> {
    require_capability(&state, &principal, Module::Users, Action::View).await?;
    let row = zrp_db::identity::fetch_user(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn upsert_device(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateDeviceRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::DeviceRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::Edit).await?;
    let row = zrp_db::fleet::upsert_device(
        state.pool(),
        &body.serial_number,
        &body.ipn,
        body.firmware_version.as_deref(),
        body.customer.as_deref(),
        body.location.as_deref(),
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_device(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(serial_number): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::DeviceRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let row = zrp_db::fleet::fetch_device_pool(state.pool(), &serial_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("device {serial_number}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_devices(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::DeviceRow>>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let rows = zrp_db::fleet::list_devices(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn attach_document(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<AttachDocumentRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::DocumentRow>>> {
    require_capability(&state, &principal, Module::Documents, Action::Create).await?;
    let row =
        zrp_db::thin::attach_document(state.pool(), &body.module, &body.record_id, &body.name, &body.path)
            .await?;
    Ok(Json(DataEnvelope::new(row)))
}

#[derive(Debug, Deserialize)]
pub struct DocumentsForRecordQuery {
    module: String,
    record_id: String,
}

pub async fn list_documents(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Query(query): Query<DocumentsForRecordQuery>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::thin::DocumentRow>>>> {
    require_capability(&state, &principal, Module::Documents, Action::View).await?;
    let rows =
        zrp_db::thin::fetch_documents_for_record(state.pool(), &query.module, &query.record_id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}
