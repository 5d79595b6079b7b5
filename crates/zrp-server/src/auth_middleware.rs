//! Auth, CSRF, and security-header stages of the §4.5 request pipeline.
//! Each stage is a `middleware::from_fn[_with_state]` layer composed in
//! `lib.rs::build_router`, mirroring the teacher's practice of keeping
//! every cross-cutting concern in its own small function rather than one
//! monolithic dispatcher.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, request::Parts, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use zrp_auth::session::{SessionOutcome, SESSION_COOKIE_NAME};
use zrp_schemas::{AuthMethod, Principal, Role};

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the caller's identity: bearer token, then session cookie, then
/// anonymous (§4.5 order). A resolved identity is attached to the request
/// as a `Principal` extension; anonymous requests proceed with none, and
/// handlers that require auth reject via the `RequirePrincipal` extractor.
pub async fn resolve_principal(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(header_value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = header_value.strip_prefix("Bearer ") {
            match zrp_auth::apikey::validate(state.pool(), token).await {
                Ok(Some(key)) => {
                    if let Ok(Some(user)) = zrp_db::identity::fetch_user(state.pool(), key.user_id).await {
                        if user.active {
                            if let Ok(role) = user.role.parse::<Role>() {
                                req.extensions_mut().insert(Principal {
                                    user_id: user.id,
                                    username: user.username,
                                    role,
                                    auth_method: AuthMethod::Bearer,
                                });
                                return next.run(req).await;
                            }
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => return ApiError::Internal(err).into_response(),
            }
            return ApiError::Unauthorized.into_response();
        }
    }

    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        match zrp_auth::session::resolve_session(state.pool(), cookie.value()).await {
            Ok(SessionOutcome::Valid(session)) => {
                match zrp_db::identity::fetch_user(state.pool(), session.user_id).await {
                    Ok(Some(user)) if user.active => {
                        if let Ok(role) = user.role.parse::<Role>() {
                            req.extensions_mut().insert(Principal {
                                user_id: user.id,
                                username: user.username,
                                role,
                                auth_method: AuthMethod::Cookie,
                            });
                        }
                    }
                    Ok(_) => {}
                    Err(err) => return ApiError::Internal(err).into_response(),
                }
            }
            Ok(SessionOutcome::Invalid) => {}
            Err(err) => return ApiError::Internal(err).into_response(),
        }
    }

    next.run(req).await
}

/// CSRF stage (§4.3/§4.5): cookie-authenticated mutating requests must
/// present a matching `x-csrf-token` header. Bearer and anonymous requests
/// skip this check entirely — anonymous mutations fail later at RBAC.
pub async fn enforce_csrf(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let is_mutation = matches!(
        *req.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );

    if is_mutation {
        if let Some(principal) = req.extensions().get::<Principal>().cloned() {
            if principal.auth_method == AuthMethod::Cookie {
                let token = req
                    .headers()
                    .get(zrp_auth::csrf::CSRF_HEADER_NAME)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let Some(token) = token else {
                    return ApiError::Forbidden.into_response();
                };
                match zrp_auth::csrf::verify(state.pool(), principal.user_id, &token).await {
                    Ok(true) => {}
                    Ok(false) => return ApiError::Forbidden.into_response(),
                    Err(err) => return ApiError::Internal(err).into_response(),
                }
            }
        }
    }

    next.run(req).await
}

/// Static security headers (§4.5), applied to every response regardless of
/// outcome.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'self'"),
    );
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("same-origin"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    response
}

/// Global per-IP token-bucket rate limiter (§4.5), keyed on the peer
/// address seen by the listener. Denials carry `Retry-After` and the
/// `X-RateLimit-*` trio.
pub async fn rate_limit(
    State(state): State<AppState>,
    addr: axum::extract::ConnectInfo<std::net::SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let allowed = state.global_limiter().check(addr.0.ip());
    if !allowed {
        let mut response = ApiError::RateLimited.into_response();
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from_static("1"));
        return response;
    }
    next.run(req).await
}

/// Axum extractor pulling the resolved `Principal` out of request
/// extensions, rejecting with 401 when the auth stage attached none.
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(RequirePrincipal)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Optional variant for endpoints that behave differently for anonymous
/// callers (none exist yet, kept for parity with the extractor above).
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalPrincipal(parts.extensions.get::<Principal>().cloned()))
    }
}

/// RBAC check (§4.4), called as the first statement of every capability-
/// gated handler. Bearer auth bypasses the table inside `Capabilities::check`.
pub async fn require_capability(
    state: &AppState,
    principal: &Principal,
    module: zrp_schemas::Module,
    action: zrp_schemas::Action,
) -> Result<(), ApiError> {
    let caps = state.capabilities().await;
    if caps.check(principal.auth_method, principal.role, module, action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
