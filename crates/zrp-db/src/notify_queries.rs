//! Notification, subscription, and email-log queries backing C7.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::model::NotificationRow;
use crate::now_str;

pub async fn insert_notification(
    pool: &SqlitePool,
    notif_type: &str,
    severity: &str,
    title: &str,
    message: &str,
    record_id: Option<&str>,
    module: Option<&str>,
    user_id: Option<i64>,
) -> Result<NotificationRow> {
    let id = sqlx::query(
        "INSERT INTO notifications (type, severity, title, message, record_id, module, user_id, emailed, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(notif_type)
    .bind(severity)
    .bind(title)
    .bind(message)
    .bind(record_id)
    .bind(module)
    .bind(user_id)
    .bind(now_str())
    .execute(pool)
    .await
    .context("insert_notification failed")?
    .last_insert_rowid();

    sqlx::query_as::<_, NotificationRow>("SELECT * FROM notifications WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .context("reload notification failed")
}

pub async fn mark_notification_emailed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE notifications SET emailed = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("mark_notification_emailed failed")?;
    Ok(())
}

pub async fn mark_notification_read(pool: &SqlitePool, id: i64, user_id: i64) -> Result<()> {
    sqlx::query("UPDATE notifications SET read_at = ? WHERE id = ? AND (user_id = ? OR user_id IS NULL)")
        .bind(now_str())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("mark_notification_read failed")?;
    Ok(())
}

pub async fn fetch_unread_notifications(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<NotificationRow>> {
    sqlx::query_as::<_, NotificationRow>(
        "SELECT * FROM notifications WHERE (user_id = ? OR user_id IS NULL) AND read_at IS NULL
         ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("fetch_unread_notifications failed")
}

/// Active users eligible to be emailed for `module`/`event_type` (§4.7:
/// "default enabled" — a user with no row is still a subscriber; only an
/// explicit `enabled = 0` row opts them out).
pub async fn fetch_email_subscribers(
    pool: &SqlitePool,
    module: &str,
    event_type: &str,
) -> Result<Vec<(i64, String)>> {
    sqlx::query_as::<_, (i64, String)>(
        "SELECT u.id, u.email FROM users u
         LEFT JOIN email_subscriptions s
           ON s.user_id = u.id AND s.module = ? AND s.event_type = ?
         WHERE u.active = 1 AND COALESCE(s.enabled, 1) = 1",
    )
    .bind(module)
    .bind(event_type)
    .fetch_all(pool)
    .await
    .context("fetch_email_subscribers failed")
}

pub async fn set_email_subscription(
    pool: &SqlitePool,
    user_id: i64,
    module: &str,
    event_type: &str,
    enabled: bool,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO email_subscriptions (user_id, module, event_type, enabled) VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id, module, event_type) DO UPDATE SET enabled = excluded.enabled",
    )
    .bind(user_id)
    .bind(module)
    .bind(event_type)
    .bind(enabled)
    .execute(pool)
    .await
    .context("set_email_subscription failed")?;
    Ok(())
}

pub async fn append_email_log(
    pool: &SqlitePool,
    recipient: &str,
    subject: &str,
    status: &str,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO email_log (recipient, subject, status, error, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(recipient)
    .bind(subject)
    .bind(status)
    .bind(error)
    .bind(now_str())
    .execute(pool)
    .await
    .context("append_email_log failed")?;
    Ok(())
}

pub async fn fetch_pending_email_retries(pool: &SqlitePool, limit: i64) -> Result<Vec<(i64, String, String)>> {
    sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, recipient, subject FROM email_log WHERE status = 'failed' ORDER BY id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("fetch_pending_email_retries failed")
}
