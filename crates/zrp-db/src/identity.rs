//! Auth-adjacent queries: users, sessions, CSRF tokens, API keys,
//! password history, role permissions. Backs C3/C4.

use anyhow::{Context, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::model::{ApiKeyRow, CsrfTokenRow, RolePermissionRow, SessionRow, UserRow};
use crate::now_str;

pub async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("fetch_user_by_username failed")
}

pub async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("fetch_user failed")
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    display_name: &str,
    email: &str,
    role: &str,
) -> Result<UserRow> {
    crate::with_tx(pool, |tx| {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        let display_name = display_name.to_string();
        let email = email.to_string();
        let role = role.to_string();
        Box::pin(async move {
            let id = sqlx::query(
                "INSERT INTO users (username, password_hash, display_name, email, role, active, failed_login_attempts, created_at)
                 VALUES (?, ?, ?, ?, ?, 1, 0, ?)",
            )
            .bind(&username)
            .bind(&password_hash)
            .bind(&display_name)
            .bind(&email)
            .bind(&role)
            .bind(now_str())
            .execute(&mut **tx)
            .await
            .context("insert user failed")?
            .last_insert_rowid();

            record_password_history(tx, id, &password_hash).await?;

            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
                .bind(id)
                .fetch_one(&mut **tx)
                .await
                .context("reload user failed")
        })
    })
    .await
}

pub async fn set_password(pool: &SqlitePool, user_id: i64, password_hash: &str) -> Result<()> {
    crate::with_tx(pool, |tx| {
        let password_hash = password_hash.to_string();
        Box::pin(async move {
            sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                .bind(&password_hash)
                .bind(user_id)
                .execute(&mut **tx)
                .await
                .context("set_password failed")?;
            record_password_history(tx, user_id, &password_hash).await
        })
    })
    .await
}

async fn record_password_history(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    password_hash: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO password_history (user_id, password_hash, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(password_hash)
        .bind(now_str())
        .execute(&mut **tx)
        .await
        .context("record_password_history failed")?;
    Ok(())
}

/// Last N password hashes for reuse checking (C3.1).
pub async fn recent_password_hashes(pool: &SqlitePool, user_id: i64, limit: i64) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT password_hash FROM password_history WHERE user_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("recent_password_hashes failed")?;
    Ok(rows.into_iter().map(|(h,)| h).collect())
}

pub async fn record_login_success(pool: &SqlitePool, user_id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE users SET last_login = ?, failed_login_attempts = 0, locked_until = NULL WHERE id = ?",
    )
    .bind(now_str())
    .bind(user_id)
    .execute(pool)
    .await
    .context("record_login_success failed")?;
    Ok(())
}

pub async fn record_login_failure(
    pool: &SqlitePool,
    user_id: i64,
    lockout_threshold: i64,
    locked_until: Option<&str>,
) -> Result<i64> {
    sqlx::query(
        "UPDATE users SET failed_login_attempts = failed_login_attempts + 1,
           locked_until = CASE WHEN failed_login_attempts + 1 >= ? THEN ? ELSE locked_until END
         WHERE id = ?",
    )
    .bind(lockout_threshold)
    .bind(locked_until)
    .bind(user_id)
    .execute(pool)
    .await
    .context("record_login_failure failed")?;

    let (attempts,): (i64,) = sqlx::query_as("SELECT failed_login_attempts FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("reload failed_login_attempts failed")?;
    Ok(attempts)
}

pub async fn create_session(
    pool: &SqlitePool,
    token: &str,
    user_id: i64,
    expires_at: &str,
) -> Result<SessionRow> {
    let created_at = now_str();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at, last_activity) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_id)
    .bind(&created_at)
    .bind(expires_at)
    .bind(&created_at)
    .execute(pool)
    .await
    .context("create_session failed")?;

    sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_one(pool)
        .await
        .context("reload session failed")
}

pub async fn fetch_session(pool: &SqlitePool, token: &str) -> Result<Option<SessionRow>> {
    sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("fetch_session failed")
}

pub async fn touch_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_activity = ? WHERE token = ?")
        .bind(now_str())
        .bind(token)
        .execute(pool)
        .await
        .context("touch_session failed")?;
    Ok(())
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("delete_session failed")?;
    Ok(())
}

pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(now_str())
        .execute(pool)
        .await
        .context("purge_expired_sessions failed")?;
    Ok(result.rows_affected())
}

pub async fn issue_csrf_token(
    pool: &SqlitePool,
    token: &str,
    user_id: i64,
    expires_at: &str,
    max_live: i64,
) -> Result<CsrfTokenRow> {
    crate::with_tx(pool, |tx| {
        let token = token.to_string();
        let expires_at = expires_at.to_string();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO csrf_tokens (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&token)
            .bind(user_id)
            .bind(now_str())
            .bind(&expires_at)
            .execute(&mut **tx)
            .await
            .context("insert csrf token failed")?;

            // LRU-evict down to `max_live` tokens per user (§3 redesign note: 5 max).
            // `rowid DESC` breaks ties between tokens issued within the same
            // second, which `created_at` alone (second resolution) cannot.
            sqlx::query(
                "DELETE FROM csrf_tokens WHERE user_id = ? AND token NOT IN (
                   SELECT token FROM csrf_tokens WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?
                 )",
            )
            .bind(user_id)
            .bind(user_id)
            .bind(max_live)
            .execute(&mut **tx)
            .await
            .context("evict old csrf tokens failed")?;

            sqlx::query_as::<_, CsrfTokenRow>("SELECT * FROM csrf_tokens WHERE token = ?")
                .bind(&token)
                .fetch_one(&mut **tx)
                .await
                .context("reload csrf token failed")
        })
    })
    .await
}

pub async fn fetch_csrf_token(pool: &SqlitePool, token: &str) -> Result<Option<CsrfTokenRow>> {
    sqlx::query_as::<_, CsrfTokenRow>("SELECT * FROM csrf_tokens WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("fetch_csrf_token failed")
}

pub async fn purge_expired_csrf_tokens(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM csrf_tokens WHERE expires_at < ?")
        .bind(now_str())
        .execute(pool)
        .await
        .context("purge_expired_csrf_tokens failed")?;
    Ok(result.rows_affected())
}

pub async fn create_api_key(
    pool: &SqlitePool,
    user_id: i64,
    hash: &str,
    prefix: &str,
    name: &str,
    expires_at: Option<&str>,
) -> Result<ApiKeyRow> {
    let id = sqlx::query(
        "INSERT INTO api_keys (user_id, hash, prefix, name, enabled, expires_at, created_at) VALUES (?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(user_id)
    .bind(hash)
    .bind(prefix)
    .bind(name)
    .bind(expires_at)
    .bind(now_str())
    .execute(pool)
    .await
    .context("create_api_key failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("reload api key failed")
}

pub async fn fetch_api_key_by_hash(pool: &SqlitePool, hash: &str) -> Result<Option<ApiKeyRow>> {
    sqlx::query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE hash = ? AND enabled = 1")
        .bind(hash)
        .fetch_optional(pool)
        .await
        .context("fetch_api_key_by_hash failed")
}

pub async fn touch_api_key(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE api_keys SET last_used = ? WHERE id = ?")
        .bind(now_str())
        .bind(id)
        .execute(pool)
        .await
        .context("touch_api_key failed")?;
    Ok(())
}

pub async fn revoke_api_key(pool: &SqlitePool, id: i64, user_id: i64) -> Result<()> {
    sqlx::query("UPDATE api_keys SET enabled = 0 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("revoke_api_key failed")?;
    Ok(())
}

pub async fn fetch_role_permissions(pool: &SqlitePool) -> Result<Vec<RolePermissionRow>> {
    sqlx::query_as::<_, RolePermissionRow>("SELECT * FROM role_permissions")
        .fetch_all(pool)
        .await
        .context("fetch_role_permissions failed")
}

pub async fn replace_role_permissions(
    pool: &SqlitePool,
    entries: Vec<(String, String, String)>,
) -> Result<()> {
    crate::with_tx(pool, |tx| {
        let entries = entries.clone();
        Box::pin(async move {
            sqlx::query("DELETE FROM role_permissions")
                .execute(&mut **tx)
                .await
                .context("clear role_permissions failed")?;
            for (role, module, action) in entries {
                sqlx::query(
                    "INSERT INTO role_permissions (role, module, action) VALUES (?, ?, ?)",
                )
                .bind(role)
                .bind(module)
                .bind(action)
                .execute(&mut **tx)
                .await
                .context("insert role_permission failed")?;
            }
            Ok(())
        })
    })
    .await
}
