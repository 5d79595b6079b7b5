//! Parts catalog, on-hand inventory, and BOM endpoints (C6.1/C6.4).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_schemas::{Action, DataEnvelope, Module, ShortageLine};

use crate::api_types::{AdjustInventoryRequest, BomCheckQuery, CreateBomLineRequest, CreatePartRequest};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::ApiResult;
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;
const MAX_BOM_DEPTH: u32 = 16;

pub async fn create_part(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreatePartRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::PartRow>>> {
    require_capability(&state, &principal, Module::Parts, Action::Create).await?;
    let row = zrp_db::inventory::create_part(
        state.pool(),
        &body.ipn,
        &body.category,
        &body.mpn,
        &body.manufacturer,
        &body.description,
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_part(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(ipn): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::PartRow>>> {
    require_capability(&state, &principal, Module::Parts, Action::View).await?;
    let row = zrp_db::inventory::fetch_part_pool(state.pool(), &ipn)
        .await?
        .ok_or_else(|| crate::error::ApiError::NotFound(format!("part {ipn}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_parts(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::PartRow>>>> {
    require_capability(&state, &principal, Module::Parts, Action::View).await?;
    let rows = zrp_db::inventory::list_parts(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(ipn): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::InventoryRow>>> {
    require_capability(&state, &principal, Module::Inventory, Action::View).await?;
    let row = zrp_db::inventory::fetch_inventory_pool(state.pool(), &ipn)
        .await?
        .ok_or_else(|| crate::error::ApiError::NotFound(format!("inventory row {ipn}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_inventory(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::InventoryRow>>>> {
    require_capability(&state, &principal, Module::Inventory, Action::View).await?;
    let rows = zrp_db::inventory::list_inventory(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn adjust_inventory(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<AdjustInventoryRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::InventoryRow>>> {
    require_capability(&state, &principal, Module::Inventory, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::inventory::adjust_inventory(
        state.pool(),
        &principal,
        &body.ipn,
        body.signed_qty,
        body.notes.as_deref(),
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn add_bom_line(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(parent_ipn): Path<String>,
    Json(body): Json<CreateBomLineRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::BomLineRow>>> {
    require_capability(&state, &principal, Module::Parts, Action::Edit).await?;
    let row = zrp_db::inventory::insert_bom_line(
        state.pool(),
        &parent_ipn,
        &body.child_ipn,
        body.qty_per,
        body.notes.as_deref(),
        MAX_BOM_DEPTH,
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn bom_shortage(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(assembly_ipn): Path<String>,
    Query(query): Query<BomCheckQuery>,
) -> ApiResult<Json<DataEnvelope<Vec<ShortageLine>>>> {
    require_capability(&state, &principal, Module::Inventory, Action::View).await?;
    let shortages =
        zrp_workflow::inventory::bom_shortage_rollup(state.pool(), &assembly_ipn, query.qty, MAX_BOM_DEPTH)
            .await?;
    Ok(Json(DataEnvelope::new(shortages)))
}
