//! Vendors, RFQs, and purchase-order receiving (C6.2).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;

use zrp_db::procurement::NewPoLine;
use zrp_schemas::{Action, DataEnvelope, Module};

use crate::api_types::{
    AwardRfqQuoteRequest, CreatePoRequest, CreateRfqRequest, CreateVendorRequest, ReceivePoRequest,
    RecordRfqQuoteRequest,
};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

const LIST_LIMIT: i64 = 500;

pub async fn create_vendor(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateVendorRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::VendorRow>>> {
    require_capability(&state, &principal, Module::Vendors, Action::Create).await?;
    let row = zrp_db::thin::create_vendor(state.pool(), &body.name, body.contact.as_deref()).await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::VendorRow>>> {
    require_capability(&state, &principal, Module::Vendors, Action::View).await?;
    let row = zrp_db::thin::fetch_vendor(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("vendor {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_vendors(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::thin::VendorRow>>>> {
    require_capability(&state, &principal, Module::Vendors, Action::View).await?;
    let rows = zrp_db::thin::list_vendors(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn create_rfq(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateRfqRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::RfqRow>>> {
    require_capability(&state, &principal, Module::Quotes, Action::Create).await?;
    let row = zrp_db::thin::create_rfq(state.pool(), &body.title, &body.vendor_ids, &body.lines).await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_rfq(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::thin::RfqRow>>> {
    require_capability(&state, &principal, Module::Quotes, Action::View).await?;
    let row = zrp_db::thin::fetch_rfq(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("rfq {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_rfqs(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::thin::RfqRow>>>> {
    require_capability(&state, &principal, Module::Quotes, Action::View).await?;
    let rows = zrp_db::thin::list_rfqs(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn record_rfq_quote(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<RecordRfqQuoteRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    require_capability(&state, &principal, Module::Quotes, Action::Edit).await?;
    zrp_db::thin::record_rfq_quote(state.pool(), body.rfq_line_id, &body.vendor_id, body.unit_price).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn award_rfq_quote(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<AwardRfqQuoteRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    require_capability(&state, &principal, Module::Quotes, Action::Approve).await?;
    zrp_db::thin::award_rfq_quote(state.pool(), body.quote_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn create_po(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreatePoRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::PoRow>>> {
    require_capability(&state, &principal, Module::Procurement, Action::Create).await?;
    let lines = body
        .lines
        .into_iter()
        .map(|l| NewPoLine {
            ipn: l.ipn,
            qty_ordered: l.qty_ordered,
            unit_price: l.unit_price,
        })
        .collect();
    let (po, _lines) = zrp_db::procurement::create_po(
        state.pool(),
        &body.vendor_id,
        principal.user_id,
        body.expected_date.as_deref(),
        lines,
    )
    .await?;
    Ok(Json(DataEnvelope::new(po)))
}

pub async fn get_po(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::PoRow>>> {
    require_capability(&state, &principal, Module::Procurement, Action::View).await?;
    let row = zrp_db::procurement::fetch_po_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("po {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_pos(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::PoRow>>>> {
    require_capability(&state, &principal, Module::Procurement, Action::View).await?;
    let rows = zrp_db::procurement::list_pos(state.pool(), LIST_LIMIT).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn get_po_lines(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::PoLineRow>>>> {
    require_capability(&state, &principal, Module::Procurement, Action::View).await?;
    let rows = zrp_db::procurement::fetch_po_lines_pool(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn receive_po(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReceivePoRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::PoRow>>> {
    require_capability(&state, &principal, Module::Procurement, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let receipts = body
        .lines
        .into_iter()
        .map(|l| zrp_workflow::procurement::LineReceipt {
            po_line_id: l.po_line_id,
            qty_passed: l.qty_pass,
            qty_failed: l.qty_fail,
            qty_on_hold: l.qty_hold,
        })
        .collect();
    let (po, _lines, events) = zrp_workflow::procurement::receive_po(
        state.pool(),
        &principal,
        &id,
        receipts,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(po)))
}
