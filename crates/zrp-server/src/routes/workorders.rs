//! Work order creation, state transitions, serials, and test records (C6.3).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_schemas::{Action, DataEnvelope, Module, ShortageLine};

use crate::api_types::{
    CreateWoSerialRequest, CreateWorkOrderRequest, RecordTestRequest, TransitionWorkOrderRequest,
};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

#[derive(serde::Serialize)]
pub struct CreateWorkOrderResponse {
    pub work_order: zrp_db::model::WorkOrderRow,
    pub shortages: Vec<ShortageLine>,
}

pub async fn create_work_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<CreateWorkOrderRequest>,
) -> ApiResult<Json<DataEnvelope<CreateWorkOrderResponse>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::Create).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (wo, shortages, events) = zrp_workflow::workorders::create_work_order(
        state.pool(),
        &principal,
        &body.assembly_ipn,
        body.qty,
        &body.priority,
        body.notes.as_deref(),
        body.due_date.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(CreateWorkOrderResponse {
        work_order: wo,
        shortages,
    })))
}

pub async fn get_work_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::WorkOrderRow>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::View).await?;
    let row = zrp_db::workorders::fetch_work_order_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("work order {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_work_orders(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::WorkOrderRow>>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::View).await?;
    let rows = zrp_db::workorders::list_work_orders(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn transition_work_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TransitionWorkOrderRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::WorkOrderRow>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (wo, events) = zrp_workflow::workorders::transition(
        state.pool(),
        &principal,
        &id,
        body.status,
        body.qty_good,
        body.qty_scrap,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(wo)))
}

const MAX_BOM_DEPTH: u32 = 16;

/// Shortage rollup for the assembly/qty a work order was opened against —
/// the same computation the standalone part-level bom-check runs, just
/// seeded from the work order's own fields instead of query parameters.
pub async fn bom_check(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<ShortageLine>>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::View).await?;
    let wo = zrp_db::workorders::fetch_work_order_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("work order {id}")))?;
    let shortages =
        zrp_workflow::inventory::bom_shortage_rollup(state.pool(), &wo.assembly_ipn, wo.qty, MAX_BOM_DEPTH)
            .await?;
    Ok(Json(DataEnvelope::new(shortages)))
}

pub async fn list_wo_serials(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::workorders::WoSerialRow>>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::View).await?;
    let rows = zrp_db::workorders::fetch_wo_serials_pool(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn create_wo_serial(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    Json(body): Json<CreateWoSerialRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::workorders::WoSerialRow>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::Edit).await?;
    let row = zrp_db::with_tx(state.pool(), |tx| {
        let serial_number = body.serial_number.clone();
        let id = id.clone();
        Box::pin(async move { zrp_db::workorders::create_wo_serial(tx, &serial_number, &id).await })
    })
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn record_test(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<RecordTestRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::workorders::TestRecordRow>>> {
    require_capability(&state, &principal, Module::WorkOrders, Action::Edit).await?;
    let measurements_json = serde_json::to_string(&body.measurements)?;
    let row = zrp_db::with_tx(state.pool(), |tx| {
        let body_serial = body.serial_number.clone();
        let body_ipn = body.ipn.clone();
        let body_firmware = body.firmware_version.clone();
        let body_test_type = body.test_type.clone();
        let result = body.result;
        let measurements_json = measurements_json.clone();
        let tested_by = principal.user_id;
        Box::pin(async move {
            zrp_db::workorders::insert_test_record(
                tx,
                &body_serial,
                &body_ipn,
                body_firmware.as_deref(),
                &body_test_type,
                result.as_str(),
                &measurements_json,
                tested_by,
            )
            .await
        })
    })
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}
