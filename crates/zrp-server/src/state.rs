//! Composition-root shared state (C5/C9), grounded on the teacher's
//! `mqk-daemon::state::AppState` shape: one cloneable struct handed to
//! every handler through axum's `State` extractor, holding the pool, the
//! notification hub, and the capability table — no per-request re-reads of
//! any of it from the database except where the data is genuinely
//! per-request (sessions, CSRF tokens).

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use zrp_auth::LoginLimiter;
use zrp_authz::Capabilities;
use zrp_config::RuntimeConfig;
use zrp_notify::email::EmailSender;
use zrp_notify::Hub;

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pool: sqlx::SqlitePool,
    config: RuntimeConfig,
    hub: Hub,
    capabilities: RwLock<Capabilities>,
    email_sender: Option<Arc<dyn EmailSender>>,
    login_limiter: LoginLimiter,
    global_limiter: RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>,
}

impl AppState {
    pub fn new(
        pool: sqlx::SqlitePool,
        config: RuntimeConfig,
        capabilities: Capabilities,
        email_sender: Option<Arc<dyn EmailSender>>,
    ) -> Self {
        let per_minute = config.global_rate_per_minute.max(1);
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap());
        Self(Arc::new(Inner {
            pool,
            config,
            hub: Hub::new(),
            capabilities: RwLock::new(capabilities),
            email_sender,
            login_limiter: LoginLimiter::new(),
            global_limiter: RateLimiter::keyed(quota),
        }))
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.0.pool
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    pub fn hub(&self) -> &Hub {
        &self.0.hub
    }

    pub async fn capabilities(&self) -> tokio::sync::RwLockReadGuard<'_, Capabilities> {
        self.0.capabilities.read().await
    }

    pub async fn reload_capabilities(&self) -> anyhow::Result<()> {
        let fresh = Capabilities::load(&self.0.pool).await?;
        *self.0.capabilities.write().await = fresh;
        Ok(())
    }

    pub fn email_sender(&self) -> Option<&Arc<dyn EmailSender>> {
        self.0.email_sender.as_ref()
    }

    pub fn login_limiter(&self) -> &LoginLimiter {
        &self.0.login_limiter
    }

    pub fn global_limiter(
        &self,
    ) -> &RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock> {
        &self.0.global_limiter
    }
}
