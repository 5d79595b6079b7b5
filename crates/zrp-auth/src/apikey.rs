//! API key issuance and validation (§4.3).
//!
//! Plaintext format: `zrp_` + 32 lowercase hex characters (128 random bits).
//! Only SHA-256(plaintext) is ever persisted; the plaintext is returned to
//! the caller exactly once, at creation.

use anyhow::{Context, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zrp_db::model::ApiKeyRow;

pub const KEY_PREFIX: &str = "zrp_";
/// Characters of the plaintext (after the prefix) surfaced in listings so a
/// user can recognize a key without ever seeing the rest of it again.
const PREFIX_DISPLAY_LEN: usize = 12;

pub struct NewApiKey {
    pub plaintext: String,
    pub row: ApiKeyRow,
}

fn generate_plaintext() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

fn hash_plaintext(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn create(
    pool: &sqlx::SqlitePool,
    user_id: i64,
    name: &str,
    expires_at: Option<&str>,
) -> Result<NewApiKey> {
    let plaintext = generate_plaintext();
    let hash = hash_plaintext(&plaintext);
    let prefix: String = plaintext.chars().take(PREFIX_DISPLAY_LEN).collect();

    let row = zrp_db::identity::create_api_key(pool, user_id, &hash, &prefix, name, expires_at)
        .await
        .context("create_api_key failed")?;

    Ok(NewApiKey { plaintext, row })
}

/// Validates a presented bearer token: hash lookup, `enabled`, not expired.
/// On success, updates `last_used` and returns the owning key row.
pub async fn validate(pool: &sqlx::SqlitePool, plaintext: &str) -> Result<Option<ApiKeyRow>> {
    if !plaintext.starts_with(KEY_PREFIX) {
        return Ok(None);
    }
    let hash = hash_plaintext(plaintext);
    let Some(row) = zrp_db::identity::fetch_api_key_by_hash(pool, &hash).await? else {
        return Ok(None);
    };
    if let Some(expires_at) = row.expires_at {
        if expires_at <= chrono::Utc::now() {
            return Ok(None);
        }
    }
    zrp_db::identity::touch_api_key(pool, row.id).await?;
    Ok(Some(row))
}

pub async fn revoke(pool: &sqlx::SqlitePool, id: i64, user_id: i64) -> Result<()> {
    zrp_db::identity::revoke_api_key(pool, id, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_key_validates_and_stores_hash_only() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let user = zrp_db::identity::create_user(&pool, "svc", "hash", "Service", "s@x.com", "user")
            .await
            .unwrap();

        let created = create(&pool, user.id, "ci", None).await.unwrap();
        assert!(created.plaintext.starts_with(KEY_PREFIX));
        assert_ne!(created.row.hash, created.plaintext);

        let validated = validate(&pool, &created.plaintext).await.unwrap();
        assert_eq!(validated.unwrap().id, created.row.id);

        assert!(validate(&pool, "zrp_not-a-real-key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoked_key_no_longer_validates() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        let user = zrp_db::identity::create_user(&pool, "svc2", "hash", "Service", "s2@x.com", "user")
            .await
            .unwrap();

        let created = create(&pool, user.id, "ci", None).await.unwrap();
        revoke(&pool, created.row.id, user.id).await.unwrap();
        assert!(validate(&pool, &created.plaintext).await.unwrap().is_none());
    }
}
