//! Session/bearer auth, password management, and permission administration
//! (C3/C4). `/login` is the one endpoint anonymous callers reach; every
//! other handler here requires a resolved [`Principal`].

use std::net::SocketAddr;
use std::str::FromStr;

use axum::extract::{ConnectInfo, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use zrp_auth::session::SESSION_COOKIE_NAME;
use zrp_auth::LoginOutcome;
use zrp_schemas::{Action, DataEnvelope, Module, Role};

use crate::api_types::{
    ChangePasswordRequest, CreateApiKeyRequest, CreateApiKeyResponse, CsrfTokenResponse, LoginRequest,
    LoginResponse, MeResponse, ReplacePermissionsRequest,
};
use crate::auth_middleware::{require_capability, RequirePrincipal};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<DataEnvelope<LoginResponse>>)> {
    if !state.login_limiter().check(addr.ip()) {
        return Err(ApiError::RateLimited);
    }

    match zrp_auth::login_guard::attempt_login(state.pool(), &body.username, &body.password).await? {
        LoginOutcome::Success(user) => {
            let role = Role::from_str(&user.role).map_err(ApiError::Internal)?;
            let session = zrp_auth::session::create_session(state.pool(), user.id).await?;
            let csrf = zrp_auth::csrf::issue(state.pool(), user.id).await?;

            let cookie = Cookie::build((SESSION_COOKIE_NAME, session.token))
                .http_only(true)
                .secure(true)
                .same_site(SameSite::Lax)
                .path("/")
                .build();

            Ok((
                jar.add(cookie),
                Json(DataEnvelope::new(LoginResponse {
                    user_id: user.id,
                    username: user.username,
                    role: role.as_str().to_string(),
                    csrf_token: csrf.token,
                })),
            ))
        }
        LoginOutcome::InvalidCredentials => Err(ApiError::Unauthorized),
        LoginOutcome::AccountLocked => Err(ApiError::AccountLocked),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, impl IntoResponse)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        zrp_auth::session::logout(state.pool(), cookie.value()).await?;
    }
    let jar = jar.remove(Cookie::from(SESSION_COOKIE_NAME));
    Ok((jar, axum::http::StatusCode::NO_CONTENT))
}

pub async fn me(RequirePrincipal(principal): RequirePrincipal) -> Json<DataEnvelope<MeResponse>> {
    Json(DataEnvelope::new(MeResponse {
        user_id: principal.user_id,
        username: principal.username,
        role: principal.role.as_str().to_string(),
        auth_method: principal.auth_method.as_str().to_string(),
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = zrp_db::identity::fetch_user(state.pool(), principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", principal.user_id)))?;

    if !zrp_auth::password::verify_password(&body.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized);
    }

    zrp_auth::password::check_strength(&body.new_password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let recent = zrp_db::identity::recent_password_hashes(state.pool(), user.id, 5).await?;
    zrp_auth::password::check_not_reused(&body.new_password, &recent)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let hash = zrp_auth::password::hash_password(&body.new_password)?;
    zrp_db::identity::set_password(state.pool(), user.id, &hash).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn issue_csrf_token(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<CsrfTokenResponse>>> {
    let token = zrp_auth::csrf::issue(state.pool(), principal.user_id).await?;
    Ok(Json(DataEnvelope::new(CsrfTokenResponse { csrf_token: token.token })))
}

pub async fn create_api_key(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<CreateApiKeyRequest>,
) -> ApiResult<Json<DataEnvelope<CreateApiKeyResponse>>> {
    let created = zrp_auth::apikey::create(
        state.pool(),
        principal.user_id,
        &body.name,
        body.expires_at.as_deref(),
    )
    .await?;
    Ok(Json(DataEnvelope::new(CreateApiKeyResponse {
        id: created.row.id,
        plaintext: created.plaintext,
        prefix: created.row.prefix,
    })))
}

pub async fn revoke_api_key(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    zrp_auth::apikey::revoke(state.pool(), id, principal.user_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn replace_permissions(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(role): Path<Role>,
    Json(body): Json<ReplacePermissionsRequest>,
) -> ApiResult<impl IntoResponse> {
    require_capability(&state, &principal, Module::Admin, Action::Edit).await?;
    zrp_authz::replace_permissions_for_role(state.pool(), role, body.pairs).await?;
    state.reload_capabilities().await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn list_permissions(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
) -> ApiResult<Json<DataEnvelope<Vec<zrp_db::model::RolePermissionRow>>>> {
    require_capability(&state, &principal, Module::Admin, Action::View).await?;
    let rows = zrp_db::identity::fetch_role_permissions(state.pool()).await?;
    Ok(Json(DataEnvelope::new(rows)))
}
