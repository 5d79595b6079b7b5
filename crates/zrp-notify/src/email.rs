//! Email dispatch: default-enabled subscriber lookup, an injected
//! `EmailSender` capability (grounded in the teacher's
//! `mqk-md::HistoricalProvider` async-trait adapter pattern), and a
//! `lettre`-backed SMTP implementation.

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use sqlx::SqlitePool;
use zrp_schemas::{EmailEventType, Module};

/// Outbound mail capability, injected so tests never touch a real SMTP
/// server (mirrors the teacher's `HistoricalProvider` trait boundary
/// between a live data source and its callers).
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Production sender: one persistent connection pool to an SMTP relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(relay: &str, username: &str, password: &str, from: &str) -> Result<Self> {
        let creds = Credentials::new(username.to_string(), password.to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)?
            .credentials(creds)
            .build();
        let from: Mailbox = from.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .body(body.to_string())?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Sends to every active, non-opted-out subscriber of `(module, event_type)`
/// and appends one `email_log` row per attempt (§4.7: "every attempt is
/// logged, success or failure"). A per-recipient failure never aborts the
/// remaining sends.
pub async fn dispatch(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    module: Module,
    event_type: EmailEventType,
    subject: &str,
    body: &str,
) -> Result<()> {
    let subscribers =
        zrp_db::notify_queries::fetch_email_subscribers(pool, module.as_str(), event_type.as_str())
            .await?;

    for (_user_id, recipient) in subscribers {
        match sender.send(&recipient, subject, body).await {
            Ok(()) => {
                zrp_db::notify_queries::append_email_log(pool, &recipient, subject, "sent", None)
                    .await?;
            }
            Err(err) => {
                tracing::warn!(recipient = %recipient, error = %err, "email send failed");
                zrp_db::notify_queries::append_email_log(
                    pool,
                    &recipient,
                    subject,
                    "failed",
                    Some(&err.to_string()),
                )
                .await?;
            }
        }
    }
    Ok(())
}

/// Re-attempts every `email_log` row currently `failed`, used by the
/// server's retry sweep loop (§4.7). Recipients are re-sent the exact
/// subject that was logged; a fresh log row records the outcome of the
/// retry rather than mutating the original.
pub async fn retry_failed(pool: &SqlitePool, sender: &dyn EmailSender, limit: i64) -> Result<usize> {
    let pending = zrp_db::notify_queries::fetch_pending_email_retries(pool, limit).await?;
    let mut retried = 0usize;
    for (_id, recipient, subject) in pending {
        match sender.send(&recipient, &subject, &subject).await {
            Ok(()) => {
                zrp_db::notify_queries::append_email_log(pool, &recipient, &subject, "sent", None)
                    .await?;
            }
            Err(err) => {
                zrp_db::notify_queries::append_email_log(
                    pool,
                    &recipient,
                    &subject,
                    "failed",
                    Some(&err.to_string()),
                )
                .await?;
            }
        }
        retried += 1;
    }
    Ok(retried)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use zrp_db::connect_in_memory;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail_for: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
            if self.fail_for.lock().unwrap().iter().any(|f| f == to) {
                anyhow::bail!("simulated failure for {to}");
            }
            self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    async fn seed_user(pool: &SqlitePool, id: i64, email: &str) {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, display_name, email, role, active, created_at)
             VALUES (?, ?, 'hash', 'Name', ?, 'user', 1, datetime('now'))",
        )
        .bind(id)
        .bind(format!("user{id}"))
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn default_enabled_subscriber_receives_mail_without_opting_in() {
        let pool = connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_user(&pool, 1, "engineer@example.com").await;

        let sender = RecordingSender::default();
        dispatch(&pool, &sender, Module::Ecos, EmailEventType::EcoApproved, "ECO-2026-0001 approved", "body")
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "engineer@example.com");
    }

    #[tokio::test]
    async fn explicit_opt_out_suppresses_delivery() {
        let pool = connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_user(&pool, 2, "opted-out@example.com").await;
        zrp_db::notify_queries::set_email_subscription(&pool, 2, "ecos", "eco_approved", false)
            .await
            .unwrap();

        let sender = RecordingSender::default();
        dispatch(&pool, &sender, Module::Ecos, EmailEventType::EcoApproved, "subject", "body")
            .await
            .unwrap();

        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_send_is_logged_and_does_not_abort_remaining_recipients() {
        let pool = connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_user(&pool, 3, "fails@example.com").await;
        seed_user(&pool, 4, "ok@example.com").await;

        let sender = RecordingSender::default();
        sender.fail_for.lock().unwrap().push("fails@example.com".to_string());

        dispatch(&pool, &sender, Module::Procurement, EmailEventType::PoReceived, "PO received", "body")
            .await
            .unwrap();

        assert_eq!(sender.sent.lock().unwrap().len(), 1);
        let retried = zrp_db::notify_queries::fetch_pending_email_retries(&pool, 10).await.unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].1, "fails@example.com");
    }
}
