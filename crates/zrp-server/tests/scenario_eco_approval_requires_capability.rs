//! Scenario: ECO approval requires the `ecos.approve` capability (§4.4/§4.6.5).
//!
//! A cookie-authenticated caller with a revoked `ecos.approve` grant must
//! get 403 FORBIDDEN from `POST /api/v1/ecos/{id}/approve`; a caller who
//! holds the capability must get 200 and see the ECO land in `approved`
//! with `approved_by` stamped to their own user id.
//!
//! # Invariant under test
//! RBAC denial happens before the handler ever touches the ECO row — the
//! capability check in `require_capability` runs first, so a denied caller
//! leaves the ECO status untouched.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use zrp_authz::{default_permissions, replace_permissions_for_role, seed_default_permissions, Capabilities};
use zrp_config::RuntimeConfig;
use zrp_schemas::{Action, Module, Role};
use zrp_server::state::AppState;

const PEER: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 51234));

async fn seed_user(pool: &SqlitePool, username: &str, role: Role) -> i64 {
    let hash = zrp_auth::password::hash_password("Correct-Horse-1").unwrap();
    let row = zrp_db::identity::create_user(pool, username, &hash, username, &format!("{username}@zrp.test"), role.as_str())
        .await
        .unwrap();
    row.id
}

/// Revokes `ecos.approve` from `user` while leaving every other default
/// grant in place, so the 403 below is attributable to that one capability.
async fn revoke_eco_approve_from_user(pool: &SqlitePool) {
    let pairs: Vec<(Module, Action)> = default_permissions()
        .into_iter()
        .filter(|(role, _, _)| *role == Role::User)
        .map(|(_, module, action)| (module, action))
        .filter(|(module, action)| !(*module == Module::Ecos && *action == Action::Approve))
        .collect();
    replace_permissions_for_role(pool, Role::User, pairs).await.unwrap();
}

async fn build_state(pool: SqlitePool) -> AppState {
    let capabilities = Capabilities::load(&pool).await.unwrap();
    AppState::new(pool, RuntimeConfig::default(), capabilities, None)
}

fn with_peer(mut req: Request<Body>) -> Request<Body> {
    req.extensions_mut().insert(ConnectInfo(PEER));
    req
}

async fn login(router: &axum::Router, username: &str) -> (String, String) {
    let body = serde_json::json!({ "username": username, "password": "Correct-Horse-1" }).to_string();
    let req = with_peer(
        Request::builder()
            .method("POST")
            .uri("/api/v1/login")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "login for {username} should succeed");

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("login must set a session cookie")
        .to_string();

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let csrf = json["data"]["csrf_token"].as_str().unwrap().to_string();
    (cookie, csrf)
}

async fn approve_eco(router: &axum::Router, eco_id: &str, cookie: &str, csrf: &str) -> (StatusCode, serde_json::Value) {
    let req = with_peer(
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/ecos/{eco_id}/approve"))
            .header("cookie", cookie)
            .header("x-csrf-token", csrf)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn user_role_is_forbidden_admin_role_succeeds() {
    let pool = zrp_db::connect_in_memory().await.unwrap();
    zrp_db::migrate(&pool).await.unwrap();
    seed_default_permissions(&pool).await.unwrap();
    revoke_eco_approve_from_user(&pool).await;

    let alice_id = seed_user(&pool, "alice", Role::User).await;
    let _bob_id = seed_user(&pool, "bob", Role::Admin).await;

    let eco = zrp_db::quality::create_eco(&pool, "Swap connector", "revise the wire harness", "medium", "[]", None)
        .await
        .unwrap();
    let admin_principal = zrp_schemas::Principal {
        user_id: alice_id,
        username: "setup".into(),
        role: Role::Admin,
        auth_method: zrp_schemas::AuthMethod::Bearer,
    };
    zrp_workflow::eco::transition(&pool, &admin_principal, &eco.id, zrp_schemas::EcoStatus::Review, None, None)
        .await
        .unwrap();

    let state = build_state(pool).await;
    let router = zrp_server::build_router(state);

    let (alice_cookie, alice_csrf) = login(&router, "alice").await;
    let (status, body) = approve_eco(&router, &eco.id, &alice_cookie, &alice_csrf).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "user role must not approve ECOs: {body}");
    assert_eq!(body["code"], "FORBIDDEN");

    let (bob_cookie, bob_csrf) = login(&router, "bob").await;
    let (status, body) = approve_eco(&router, &eco.id, &bob_cookie, &bob_csrf).await;
    assert_eq!(status, StatusCode::OK, "admin role must approve ECOs: {body}");
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["approved_by"], serde_json::json!(find_user_id(&router, "bob").await));
}

/// Re-resolves a seeded username to its row id via `/me` under that
/// username's own session, rather than threading ids out of `seed_user`
/// across the login/approve helper boundary above.
async fn find_user_id(router: &axum::Router, username: &str) -> i64 {
    let (cookie, _) = login(router, username).await;
    let req = with_peer(
        Request::builder()
            .method("GET")
            .uri("/api/v1/me")
            .header("cookie", &cookie)
            .body(Body::empty())
            .unwrap(),
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["data"]["user_id"].as_i64().unwrap()
}

#[tokio::test]
async fn missing_csrf_header_on_cookie_mutation_is_forbidden() {
    let pool = zrp_db::connect_in_memory().await.unwrap();
    zrp_db::migrate(&pool).await.unwrap();
    seed_default_permissions(&pool).await.unwrap();
    seed_user(&pool, "carol", Role::Admin).await;

    let eco = zrp_db::quality::create_eco(&pool, "Update label", "new compliance marking", "low", "[]", None)
        .await
        .unwrap();

    let state = build_state(pool).await;
    let router = zrp_server::build_router(state);
    let (cookie, _csrf) = login(&router, "carol").await;

    let req = with_peer(
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/ecos/{}/approve", eco.id))
            .header("cookie", &cookie)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN, "a cookie mutation with no CSRF header must be refused");
}

#[tokio::test]
async fn bearer_auth_has_implicit_full_capability() {
    let pool = zrp_db::connect_in_memory().await.unwrap();
    zrp_db::migrate(&pool).await.unwrap();
    seed_default_permissions(&pool).await.unwrap();
    revoke_eco_approve_from_user(&pool).await;

    let user_id = seed_user(&pool, "dave", Role::User).await;
    let created = zrp_auth::apikey::create(&pool, user_id, "ci-bot", None).await.unwrap();

    let eco = zrp_db::quality::create_eco(&pool, "Replace capacitor", "obsolete part substitution", "high", "[]", None)
        .await
        .unwrap();
    let principal = zrp_schemas::Principal {
        user_id,
        username: "dave".into(),
        role: Role::User,
        auth_method: zrp_schemas::AuthMethod::Bearer,
    };
    zrp_workflow::eco::transition(&pool, &principal, &eco.id, zrp_schemas::EcoStatus::Review, None, None)
        .await
        .unwrap();

    let state = build_state(pool).await;
    let router = zrp_server::build_router(state);

    let req = with_peer(
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/ecos/{}/approve", eco.id))
            .header("authorization", format!("Bearer {}", created.plaintext))
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    );
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(
        resp.status(),
        StatusCode::OK,
        "bearer auth is a trusted service principal per §4.4 even though dave's cookie session would be refused"
    );
}
