//! ZRP HTTP service library: state, middleware, route handlers, and the
//! router composition root. `main.rs` is kept thin — it loads config, wires
//! the database, and calls [`build_router`].

pub mod api_types;
pub mod auth_middleware;
pub mod error;
pub mod request_meta;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use state::AppState;

/// Assembles every route and the §4.5 middleware pipeline.
///
/// Layers are applied innermost-first: axum treats the *last* `.layer()`
/// call as the outermost wrapper, so the call order below is the reverse of
/// execution order (CSRF enforcement runs right before the handler; security
/// headers run around everything, including error responses).
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.config().max_body_bytes as usize;

    Router::new()
        .merge(auth_routes())
        .merge(inventory_routes())
        .merge(procurement_routes())
        .merge(workorder_routes())
        .merge(eco_routes())
        .merge(quality_routes())
        .merge(shipment_routes())
        .merge(campaign_routes())
        .merge(notify_routes())
        .merge(audit_routes())
        .merge(admin_routes())
        .route("/healthz", get(health))
        .with_state(state.clone())
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware::enforce_csrf))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware::resolve_principal))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new().gzip(true))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware::rate_limit))
        .layer(axum::middleware::from_fn(auth_middleware::security_headers))
        .layer(cors_layer())
}

async fn health() -> &'static str {
    "ok"
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

fn auth_routes() -> Router<AppState> {
    use routes::auth::*;
    Router::new()
        .route("/api/v1/login", post(login))
        .route("/api/v1/logout", post(logout))
        .route("/api/v1/me", get(me))
        .route("/api/v1/change-password", post(change_password))
        .route("/api/v1/csrf-token", get(issue_csrf_token))
        .route("/api/v1/keys", post(create_api_key))
        .route("/api/v1/keys/:id", axum::routing::delete(revoke_api_key))
        .route("/api/v1/permissions", get(list_permissions))
        .route("/api/v1/permissions/:role", axum::routing::put(replace_permissions))
}

fn inventory_routes() -> Router<AppState> {
    use routes::inventory::*;
    Router::new()
        .route("/api/v1/parts", get(list_parts).post(create_part))
        .route("/api/v1/parts/:ipn", get(get_part))
        .route("/api/v1/parts/:ipn/bom", post(add_bom_line))
        .route("/api/v1/parts/:ipn/bom/shortage", get(bom_shortage))
        .route("/api/v1/inventory", get(list_inventory))
        .route("/api/v1/inventory/:ipn", get(get_inventory))
        .route("/api/v1/inventory/adjust", post(adjust_inventory))
}

fn procurement_routes() -> Router<AppState> {
    use routes::procurement::*;
    Router::new()
        .route("/api/v1/vendors", get(list_vendors).post(create_vendor))
        .route("/api/v1/vendors/:id", get(get_vendor))
        .route("/api/v1/rfqs", get(list_rfqs).post(create_rfq))
        .route("/api/v1/rfqs/:id", get(get_rfq))
        .route("/api/v1/rfqs/quotes", post(record_rfq_quote))
        .route("/api/v1/rfqs/quotes/award", post(award_rfq_quote))
        .route("/api/v1/pos", get(list_pos).post(create_po))
        .route("/api/v1/pos/:id", get(get_po))
        .route("/api/v1/pos/:id/lines", get(get_po_lines))
        .route("/api/v1/pos/:id/receive", post(receive_po))
}

fn workorder_routes() -> Router<AppState> {
    use routes::workorders::*;
    Router::new()
        .route("/api/v1/workorders", get(list_work_orders).post(create_work_order))
        .route("/api/v1/workorders/:id", get(get_work_order).patch(transition_work_order))
        .route("/api/v1/workorders/:id/bom-check", get(bom_check))
        .route("/api/v1/workorders/:id/serials", get(list_wo_serials).post(create_wo_serial))
        .route("/api/v1/workorders/test-records", post(record_test))
}

fn eco_routes() -> Router<AppState> {
    use routes::eco::*;
    Router::new()
        .route("/api/v1/ecos", get(list_ecos).post(create_eco))
        .route("/api/v1/ecos/from-ncr", post(create_eco_from_ncr))
        .route("/api/v1/ecos/:id", get(get_eco))
        .route("/api/v1/ecos/:id/transition", post(transition_eco))
        .route("/api/v1/ecos/:id/approve", post(approve_eco))
        .route("/api/v1/ecos/:id/implement", post(implement_eco))
}

fn quality_routes() -> Router<AppState> {
    use routes::quality::*;
    Router::new()
        .route("/api/v1/ncrs", get(list_ncrs).post(create_ncr))
        .route("/api/v1/ncrs/:id", get(get_ncr))
        .route("/api/v1/ncrs/:id/transition", post(transition_ncr))
        .route("/api/v1/capas", get(list_capas).post(create_capa))
        .route("/api/v1/capas/:id", get(get_capa))
        .route("/api/v1/capas/:id/approve/qe", post(approve_capa_qe))
        .route("/api/v1/capas/:id/approve/manager", post(approve_capa_manager))
        .route("/api/v1/rmas", get(list_rmas).post(create_rma))
        .route("/api/v1/rmas/:id", get(get_rma))
        .route("/api/v1/rmas/:id/transition", post(transition_rma))
        .route("/api/v1/field-reports", get(list_field_reports).post(create_field_report))
        .route("/api/v1/field-reports/:id", get(get_field_report))
        .route("/api/v1/field-reports/:id/escalate", post(escalate_field_report))
}

fn shipment_routes() -> Router<AppState> {
    use routes::shipments::*;
    Router::new()
        .route("/api/v1/shipments", get(list_shipments).post(create_shipment))
        .route("/api/v1/shipments/:id", get(get_shipment))
        .route("/api/v1/shipments/:id/lines", get(get_shipment_lines).post(add_shipment_line))
        .route("/api/v1/shipments/:id/transition", post(transition_shipment))
        .route("/api/v1/sales-orders", get(list_sales_orders).post(create_sales_order))
        .route("/api/v1/sales-orders/:id", get(get_sales_order))
        .route("/api/v1/sales-orders/:id/lines", get(get_sales_order_lines))
}

fn campaign_routes() -> Router<AppState> {
    use routes::campaigns::*;
    Router::new()
        .route("/api/v1/firmware/campaigns", get(list_campaigns).post(create_campaign))
        .route("/api/v1/firmware/campaigns/:id", get(get_campaign))
        .route("/api/v1/firmware/campaigns/:id/devices", get(list_campaign_devices))
        .route("/api/v1/firmware/campaigns/:id/launch", post(launch_campaign))
        .route("/api/v1/firmware/campaigns/:id/mark-device", post(mark_device))
        .route("/api/v1/firmware/campaigns/:id/halt", post(halt_campaign))
        .route("/api/v1/firmware/campaigns/:id/progress", get(get_progress))
        .route("/api/v1/firmware/campaigns/:id/stream", get(stream_progress))
}

fn notify_routes() -> Router<AppState> {
    use routes::notify::*;
    Router::new()
        .route("/api/v1/ws", get(ws_events))
        .route("/api/v1/notifications", get(list_unread_notifications))
        .route("/api/v1/notifications/read", post(mark_notification_read))
        .route("/api/v1/notifications/subscriptions", post(set_email_subscription))
}

fn audit_routes() -> Router<AppState> {
    use routes::audit::*;
    Router::new()
        .route("/api/v1/audit/recent", get(recent_events))
        .route("/api/v1/audit/:module/:record_id", get(record_history))
        .route("/api/v1/audit/:module/:record_id/undo/:audit_event_id", get(preview_undo))
}

fn admin_routes() -> Router<AppState> {
    use routes::admin::*;
    Router::new()
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/:id", get(get_user))
        .route("/api/v1/devices", get(list_devices).post(upsert_device))
        .route("/api/v1/devices/:serial_number", get(get_device))
        .route("/api/v1/documents", get(list_documents).post(attach_document))
}
