//! Session lifecycle (§4.3): creation, idle-timeout resolution, logout.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::RngCore;
use zrp_db::model::SessionRow;

pub const SESSION_TTL: Duration = Duration::hours(24);
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::minutes(30);
pub const SESSION_COOKIE_NAME: &str = "zrp_session";

pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub async fn create_session(pool: &sqlx::SqlitePool, user_id: i64) -> Result<SessionRow> {
    let token = generate_session_token();
    let expires_at = (Utc::now() + SESSION_TTL).to_rfc3339();
    zrp_db::identity::create_session(pool, &token, user_id, &expires_at).await
}

/// Outcome of resolving a presented session token against the store.
pub enum SessionOutcome {
    Valid(SessionRow),
    /// Either the token doesn't exist, or it exists but has expired/gone
    /// idle — the caller treats both as anonymous and the row is deleted
    /// either way.
    Invalid,
}

/// Resolves `token`, enforcing both the absolute TTL and the idle timeout
/// (§4.3: "valid if expires_at > now ∧ now − last_activity ≤ 30 min").
/// A session failing either check is deleted so it can't be resurrected.
pub async fn resolve_session(pool: &sqlx::SqlitePool, token: &str) -> Result<SessionOutcome> {
    let Some(row) = zrp_db::identity::fetch_session(pool, token).await? else {
        return Ok(SessionOutcome::Invalid);
    };

    let now = Utc::now();
    let idle_for = now.signed_duration_since(row.last_activity);
    if row.expires_at <= now || idle_for > SESSION_IDLE_TIMEOUT {
        zrp_db::identity::delete_session(pool, token).await?;
        return Ok(SessionOutcome::Invalid);
    }

    // At most once per request per §4.3; the caller only reaches this path
    // once per inbound request, so a single touch here satisfies that.
    zrp_db::identity::touch_session(pool, token).await?;
    Ok(SessionOutcome::Valid(row))
}

pub async fn logout(pool: &sqlx::SqlitePool, token: &str) -> Result<()> {
    zrp_db::identity::delete_session(pool, token).await
}

pub async fn purge_expired(pool: &sqlx::SqlitePool) -> Result<u64> {
    zrp_db::identity::purge_expired_sessions(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_session_resolves_valid() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let user = zrp_db::identity::create_user(&pool, "alice", "hash", "Alice", "a@x.com", "user")
            .await
            .unwrap();

        let session = create_session(&pool, user.id).await.unwrap();
        match resolve_session(&pool, &session.token).await.unwrap() {
            SessionOutcome::Valid(row) => assert_eq!(row.user_id, user.id),
            SessionOutcome::Invalid => panic!("expected valid session"),
        }
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        match resolve_session(&pool, "does-not-exist").await.unwrap() {
            SessionOutcome::Invalid => {}
            SessionOutcome::Valid(_) => panic!("expected invalid"),
        }
    }
}
