//! NCR, CAPA, RMA, and field-report endpoints (C6.6/C6.7).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_schemas::{Action, DataEnvelope, Module};

use crate::api_types::{
    CreateCapaRequest, CreateFieldReportRequest, CreateNcrRequest, CreateRmaRequest, NcrTransitionRequest,
    RmaTransitionRequest,
};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

pub async fn create_ncr(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<CreateNcrRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::NcrRow>>> {
    require_capability(&state, &principal, Module::Ncrs, Action::Create).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::create_ncr(
        state.pool(),
        &principal,
        &body.title,
        body.severity,
        body.ipn.as_deref(),
        body.serial_number.as_deref(),
        body.defect_type.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_ncr(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::NcrRow>>> {
    require_capability(&state, &principal, Module::Ncrs, Action::View).await?;
    let row = zrp_db::quality::fetch_ncr_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("ncr {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_ncrs(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::NcrRow>>>> {
    require_capability(&state, &principal, Module::Ncrs, Action::View).await?;
    let rows = zrp_db::quality::list_ncrs(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn transition_ncr(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<NcrTransitionRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::NcrRow>>> {
    require_capability(&state, &principal, Module::Ncrs, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::ncr_transition(
        state.pool(),
        &principal,
        &id,
        body.status,
        body.root_cause.as_deref(),
        body.corrective_action.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn create_capa(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<CreateCapaRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CapaRow>>> {
    require_capability(&state, &principal, Module::Capas, Action::Create).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::create_capa(
        state.pool(),
        &principal,
        &body.capa_type,
        body.linked_ncr_id.as_deref(),
        body.linked_rma_id.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_capa(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CapaRow>>> {
    require_capability(&state, &principal, Module::Capas, Action::View).await?;
    let row = zrp_db::quality::fetch_capa_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("capa {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_capas(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::CapaRow>>>> {
    require_capability(&state, &principal, Module::Capas, Action::View).await?;
    let rows = zrp_db::quality::list_capas(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn approve_capa_qe(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CapaRow>>> {
    require_capability(&state, &principal, Module::Capas, Action::Approve).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::approve_capa_qe(
        state.pool(),
        &principal,
        &id,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn approve_capa_manager(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CapaRow>>> {
    require_capability(&state, &principal, Module::Capas, Action::Approve).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::approve_capa_manager(
        state.pool(),
        &principal,
        &id,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn create_rma(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<CreateRmaRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::RmaRow>>> {
    require_capability(&state, &principal, Module::Rmas, Action::Create).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::create_rma(
        state.pool(),
        &principal,
        &body.serial_number,
        &body.customer,
        &body.reason,
        body.defect_description.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_rma(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::RmaRow>>> {
    require_capability(&state, &principal, Module::Rmas, Action::View).await?;
    let row = zrp_db::quality::fetch_rma_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("rma {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_rmas(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::RmaRow>>>> {
    require_capability(&state, &principal, Module::Rmas, Action::View).await?;
    let rows = zrp_db::quality::list_rmas(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn transition_rma(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RmaTransitionRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::RmaRow>>> {
    require_capability(&state, &principal, Module::Rmas, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::quality::rma_transition(
        state.pool(),
        &principal,
        &id,
        body.status,
        body.resolution.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn create_field_report(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateFieldReportRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::FieldReportRow>>> {
    require_capability(&state, &principal, Module::FieldReports, Action::Create).await?;
    let row = zrp_db::thin::create_field_report(
        state.pool(),
        &body.priority,
        &body.title,
        body.description.as_deref(),
        None,
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_field_report(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::FieldReportRow>>> {
    require_capability(&state, &principal, Module::FieldReports, Action::View).await?;
    let row = zrp_db::thin::fetch_field_report(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("field report {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_field_reports(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::thin::FieldReportRow>>>> {
    require_capability(&state, &principal, Module::FieldReports, Action::View).await?;
    let rows = zrp_db::thin::list_field_reports(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

/// Opens an NCR from an existing field report and links the two records,
/// mapping the report's priority onto an NCR severity (§4.6.6).
pub async fn escalate_field_report(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::NcrRow>>> {
    require_capability(&state, &principal, Module::Ncrs, Action::Create).await?;
    let report = zrp_db::thin::fetch_field_report(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("field report {id}")))?;
    let severity = zrp_workflow::quality::severity_from_field_report_priority(&report.priority);
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (ncr, events) = zrp_workflow::quality::create_ncr(
        state.pool(),
        &principal,
        &report.title,
        severity,
        None,
        None,
        None,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    zrp_db::thin::set_field_report_ncr(state.pool(), &id, &ncr.id).await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(ncr)))
}
