//! Sales order and shipment endpoints (C6.8).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_schemas::{Action, DataEnvelope, Module};

use crate::api_types::{AddShipmentLineRequest, CreateSalesOrderRequest, CreateShipmentRequest, ShipmentTransitionRequest};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

pub async fn create_shipment(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateShipmentRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::ShipmentRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::Create).await?;
    let row = zrp_db::shipments::create_shipment(state.pool(), body.shipment_type.as_str()).await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::ShipmentRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let row = zrp_db::shipments::fetch_shipment_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("shipment {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::ShipmentRow>>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let rows = zrp_db::shipments::list_shipments(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn get_shipment_lines(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::ShipmentLineRow>>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let rows = zrp_db::shipments::fetch_shipment_lines_pool(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn add_shipment_line(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    Json(body): Json<AddShipmentLineRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::ShipmentLineRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::Edit).await?;
    let row = zrp_db::with_tx(state.pool(), |tx| {
        let id = id.clone();
        let ipn = body.ipn.clone();
        let qty = body.qty;
        let sales_order_line_id = body.sales_order_line_id;
        Box::pin(async move {
            let line =
                zrp_db::shipments::insert_shipment_line(tx, &id, sales_order_line_id, &ipn, qty).await?;
            if let Some(sol_id) = sales_order_line_id {
                zrp_db::shipments::adjust_sales_order_line_allocated(tx, sol_id, qty).await?;
            }
            Ok(line)
        })
    })
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn transition_shipment(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ShipmentTransitionRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::ShipmentRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_workflow::shipments::transition(
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

pub async fn create_sales_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateSalesOrderRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::SalesOrderRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::Create).await?;
    let row = zrp_db::thin::create_sales_order(state.pool(), &body.customer, &body.lines).await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_sales_order(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::SalesOrderRow>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let row = zrp_db::thin::fetch_sales_order(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("sales order {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_sales_orders(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::thin::SalesOrderRow>>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let rows = zrp_db::thin::list_sales_orders(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn get_sales_order_lines(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::SalesOrderLineRow>>>> {
    require_capability(&state, &principal, Module::Shipments, Action::View).await?;
    let rows = zrp_db::thin::fetch_sales_order_lines(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}
