//! CSRF token issuance and verification (§4.3). Required only for
//! cookie-authenticated mutating requests; bearer-token callers skip it.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::RngCore;
use zrp_db::model::CsrfTokenRow;

pub const CSRF_TTL: Duration = Duration::hours(1);
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";
/// At most this many live tokens per user, LRU-evicted (§4.3).
pub const MAX_LIVE_TOKENS_PER_USER: i64 = 5;

pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub async fn issue(pool: &sqlx::SqlitePool, user_id: i64) -> Result<CsrfTokenRow> {
    let token = generate_csrf_token();
    let expires_at = (Utc::now() + CSRF_TTL).to_rfc3339();
    zrp_db::identity::issue_csrf_token(pool, &token, user_id, &expires_at, MAX_LIVE_TOKENS_PER_USER).await
}

/// Verifies `token` belongs to `user_id` and hasn't expired. Does not
/// consume the token — CSRF tokens are reused across requests until they
/// expire or are rotated at next login.
pub async fn verify(pool: &sqlx::SqlitePool, user_id: i64, token: &str) -> Result<bool> {
    let Some(row) = zrp_db::identity::fetch_csrf_token(pool, token).await? else {
        return Ok(false);
    };
    Ok(row.user_id == user_id && row.expires_at > Utc::now())
}

pub async fn purge_expired(pool: &sqlx::SqlitePool) -> Result<u64> {
    zrp_db::identity::purge_expired_csrf_tokens(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_verifies_for_owner_only() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let user = zrp_db::identity::create_user(&pool, "bob", "hash", "Bob", "b@x.com", "user")
            .await
            .unwrap();

        let token = issue(&pool, user.id).await.unwrap();
        assert!(verify(&pool, user.id, &token.token).await.unwrap());
        assert!(!verify(&pool, user.id + 1, &token.token).await.unwrap());
    }

    #[tokio::test]
    async fn old_tokens_are_evicted_past_the_cap() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let user = zrp_db::identity::create_user(&pool, "carl", "hash", "Carl", "c@x.com", "user")
            .await
            .unwrap();

        let mut tokens = Vec::new();
        for _ in 0..(MAX_LIVE_TOKENS_PER_USER + 3) {
            tokens.push(issue(&pool, user.id).await.unwrap().token);
        }

        assert!(!verify(&pool, user.id, &tokens[0]).await.unwrap());
        assert!(verify(&pool, user.id, tokens.last().unwrap()).await.unwrap());
    }
}
