//! Engineering change order creation and lifecycle transitions (C6.5).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_schemas::{Action, DataEnvelope, EcoStatus, Module};

use crate::api_types::{CreateEcoFromNcrRequest, CreateEcoRequest, EcoTransitionRequest};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

pub async fn create_eco(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateEcoRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    require_capability(&state, &principal, Module::Ecos, Action::Create).await?;
    let affected_ipns_json = serde_json::to_string(&body.affected_ipns)?;
    let row = zrp_db::quality::create_eco(
        state.pool(),
        &body.title,
        &body.description,
        &body.priority,
        &affected_ipns_json,
        None,
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn create_eco_from_ncr(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<CreateEcoFromNcrRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    require_capability(&state, &principal, Module::Ecos, Action::Create).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::create_eco_from_ncr(
        state.pool(),
        &principal,
        &body.ncr_id,
        &body.title,
        &body.description,
        &body.priority,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_eco(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    require_capability(&state, &principal, Module::Ecos, Action::View).await?;
    let row = zrp_db::quality::fetch_eco_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("eco {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_ecos(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::EcoRow>>>> {
    require_capability(&state, &principal, Module::Ecos, Action::View).await?;
    let rows = zrp_db::quality::list_ecos(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn transition_eco(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<EcoTransitionRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    require_capability(&state, &principal, Module::Ecos, Action::Approve).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::eco::transition(
        state.pool(),
        &principal,
        &id,
        body.status,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

/// Convenience alias over [`transition_eco`] for the `review → approved`
/// step, matching the external surface's named approve endpoint.
pub async fn approve_eco(
    state: State<AppState>,
    principal: RequirePrincipal,
    addr: ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    id: Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    fixed_transition(state, principal, addr, headers, id, EcoStatus::Approved).await
}

/// Convenience alias over [`transition_eco`] for the `approved →
/// implemented` step.
pub async fn implement_eco(
    state: State<AppState>,
    principal: RequirePrincipal,
    addr: ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    id: Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    fixed_transition(state, principal, addr, headers, id, EcoStatus::Implemented).await
}

async fn fixed_transition(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    status: EcoStatus,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::EcoRow>>> {
    require_capability(&state, &principal, Module::Ecos, Action::Approve).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) =
        zrp_workflow::eco::transition(state.pool(), &principal, &id, status, Some(ip.as_str()), ua.as_deref())
            .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}
