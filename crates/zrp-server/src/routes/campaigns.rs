//! Firmware rollout campaign endpoints (C8): enrollment, device progress
//! marking, halting, and a server-sent progress stream.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::StreamExt;

use zrp_campaign::ProgressSnapshot;
use zrp_schemas::{Action, DataEnvelope, Module};

use crate::api_types::{CreateCampaignRequest, HaltCampaignRequest, MarkDeviceRequest};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::request_meta::{client_ip, user_agent};
use crate::state::AppState;

pub async fn create_campaign(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateCampaignRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CampaignRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::Create).await?;
    let row = zrp_db::fleet::create_campaign(
        state.pool(),
        &body.name,
        &body.version,
        body.category.as_str(),
        body.target_filter.as_deref(),
    )
    .await?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn get_campaign(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CampaignRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let row = zrp_db::fleet::fetch_campaign_pool(state.pool(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("campaign {id}")))?;
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn list_campaigns(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::CampaignRow>>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let rows = zrp_db::fleet::list_campaigns(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

pub async fn list_campaign_devices(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::CampaignDeviceRow>>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let rows = zrp_db::fleet::fetch_campaign_devices(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(rows)))
}

#[derive(serde::Serialize)]
pub struct EnrollResponse {
    pub campaign: zrp_db::model::CampaignRow,
    pub enrolled: usize,
}

pub async fn enroll_campaign(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<EnrollResponse>>> {
    require_capability(&state, &principal, Module::Firmware, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (campaign, enrolled, events) =
        zrp_campaign::enroll(state.pool(), &principal, &id, Some(ip.as_str()), ua.as_deref()).await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(EnrollResponse { campaign, enrolled })))
}

/// Alias over [`enroll_campaign`] matching the external surface's
/// `POST /firmware/campaigns/{id}/launch` naming.
pub async fn launch_campaign(
    state: State<AppState>,
    principal: RequirePrincipal,
    addr: ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    id: Path<String>,
) -> ApiResult<Json<DataEnvelope<EnrollResponse>>> {
    enroll_campaign(state, principal, addr, headers, id).await
}

pub async fn mark_device(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<MarkDeviceRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CampaignDeviceRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_campaign::mark_device(
        state.pool(),
        &principal,
        &id,
        &body.serial_number,
        &body.status,
        Some(ip.as_str()),
        ua.as_deref(),
    )
    .await?;
    for event in events {
        state.hub().publish(event);
    }
    Ok(Json(DataEnvelope::new(row)))
}

pub async fn halt_campaign(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<HaltCampaignRequest>,
) -> ApiResult<Json<DataEnvelope<zrp_db::model::CampaignRow>>> {
    require_capability(&state, &principal, Module::Firmware, Action::Edit).await?;
    let ip = client_ip(addr);
    let ua = user_agent(&headers);
    let (row, events) = zrp_campaign::halt(
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

pub async fn get_progress(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<Json<DataEnvelope<ProgressSnapshot>>> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let snapshot = zrp_campaign::progress(state.pool(), &id).await?;
    Ok(Json(DataEnvelope::new(snapshot)))
}

/// Streams [`zrp_campaign::progress_stream`] ticks to the client as SSE
/// until the campaign resolves, so a dashboard doesn't have to poll.
pub async fn stream_progress(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    require_capability(&state, &principal, Module::Firmware, Action::View).await?;
    let stream = zrp_campaign::progress_stream(state.pool().clone(), id).map(|item| {
        let event = match item {
            Ok(domain_event) => Event::default().json_data(domain_event).unwrap_or_else(|_| Event::default()),
            Err(err) => Event::default().event("error").data(err.to_string()),
        };
        Ok::<_, Infallible>(event)
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
