//! Scenario: session fixation is prevented by construction (§4.3, scenario 4).
//!
//! A client that arrives holding an attacker-chosen cookie value and then
//! logs in must end up with a session token the server generated itself,
//! never the value the client walked in with — and that walked-in value
//! must never resolve to an authenticated session, before or after login.
//!
//! # Invariant under test
//! `zrp_auth::session::create_session` always draws a fresh 256-bit token
//! from the CSPRNG; it never reads, inspects, or reuses any token a caller
//! presents. The login handler in `routes::auth::login` ignores whatever
//! cookie is already on the request.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::net::SocketAddr;
use tower::ServiceExt;

use zrp_authz::{seed_default_permissions, Capabilities};
use zrp_config::RuntimeConfig;
use zrp_schemas::Role;
use zrp_server::state::AppState;

const PEER: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 51235));
const PLANTED_TOKEN: &str = "0000000000000000000000000000000000000000000000000000000000000000";

fn with_peer(mut req: Request<Body>) -> Request<Body> {
    req.extensions_mut().insert(ConnectInfo(PEER));
    req
}

#[tokio::test]
async fn login_never_reuses_a_client_supplied_token() {
    let pool = zrp_db::connect_in_memory().await.unwrap();
    zrp_db::migrate(&pool).await.unwrap();
    seed_default_permissions(&pool).await.unwrap();

    let hash = zrp_auth::password::hash_password("Correct-Horse-1").unwrap();
    zrp_db::identity::create_user(&pool, "erin", &hash, "erin", "erin@zrp.test", Role::User.as_str())
        .await
        .unwrap();

    let capabilities = Capabilities::load(&pool).await.unwrap();
    let state = AppState::new(pool, RuntimeConfig::default(), capabilities, None);
    let router = zrp_server::build_router(state);

    // Before login: the planted token doesn't authenticate anything.
    let probe = with_peer(
        Request::builder()
            .method("GET")
            .uri("/api/v1/me")
            .header("cookie", format!("zrp_session={PLANTED_TOKEN}"))
            .body(Body::empty())
            .unwrap(),
    );
    let resp = router.clone().oneshot(probe).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "a planted cookie must not resolve to any session");

    // Log in while presenting the planted cookie.
    let login_body = serde_json::json!({ "username": "erin", "password": "Correct-Horse-1" }).to_string();
    let login_req = with_peer(
        Request::builder()
            .method("POST")
            .uri("/api/v1/login")
            .header("content-type", "application/json")
            .header("cookie", format!("zrp_session={PLANTED_TOKEN}"))
            .body(Body::from(login_body))
            .unwrap(),
    );
    let resp = router.clone().oneshot(login_req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let issued_cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("login must set a fresh session cookie")
        .to_string();
    assert!(
        !issued_cookie.contains(PLANTED_TOKEN),
        "the issued cookie must never echo back the client-supplied value: {issued_cookie}"
    );

    let issued_token = issued_cookie
        .split(';')
        .next()
        .and_then(|kv| kv.split('=').nth(1))
        .expect("cookie must have a value");
    assert_ne!(issued_token, PLANTED_TOKEN);

    // The genuine session the server issued now authenticates.
    let me_req = with_peer(
        Request::builder()
            .method("GET")
            .uri("/api/v1/me")
            .header("cookie", format!("zrp_session={issued_token}"))
            .body(Body::empty())
            .unwrap(),
    );
    let resp = router.clone().oneshot(me_req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["username"], "erin");

    // The planted token still authenticates nothing, even after login.
    let probe_again = with_peer(
        Request::builder()
            .method("GET")
            .uri("/api/v1/me")
            .header("cookie", format!("zrp_session={PLANTED_TOKEN}"))
            .body(Body::empty())
            .unwrap(),
    );
    let resp = router.clone().oneshot(probe_again).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
