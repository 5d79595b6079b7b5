//! WebSocket domain-event fan-out, email subscription preferences, and the
//! per-user unread notification inbox (C7).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use zrp_schemas::DataEnvelope;

use crate::api_types::{MarkReadRequest, SetEmailSubscriptionRequest};
use crate::auth_middleware::RequirePrincipal;
use crate::error::ApiResult;
use crate::state::AppState;

/// Upgrades to a WebSocket and relays every subsequent [`zrp_notify::Hub`]
/// broadcast as a JSON text frame until the client disconnects or falls
/// behind far enough to lag off the channel (§4.7).
pub async fn ws_events(
    State(state): State<AppState>,
    RequirePrincipal(_principal): RequirePrincipal,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut rx = state.hub().subscribe();
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

pub async fn set_email_subscription(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<SetEmailSubscriptionRequest>,
) -> ApiResult<impl IntoResponse> {
    zrp_db::notify_queries::set_email_subscription(
        state.pool(),
        principal.user_id,
        body.module.as_str(),
        body.event_type.as_str(),
        body.enabled,
    )
    .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn list_unread_notifications(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::NotificationRow>>>> {
    let rows = zrp_db::notify_queries::fetch_unread_notifications(state.pool(), principal.user_id, 200).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<MarkReadRequest>,
) -> ApiResult<impl IntoResponse> {
    zrp_db::notify_queries::mark_notification_read(state.pool(), body.notification_id, principal.user_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
