//! zrp-server entry point.
//!
//! Thin by design: load config, open the database, seed the capability
//! table, spawn the background sweeps, then hand everything to
//! [`zrp_server::build_router`]. All route handlers live in
//! `zrp_server::routes`; all shared state lives in `zrp_server::state`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn, Level};

use zrp_config::{CliOverrides, RuntimeConfig};
use zrp_notify::email::{EmailSender, SmtpEmailSender};
use zrp_server::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "zrp-server", about = "ZRP inventory, quality and production backend")]
struct Cli {
    /// Path to the SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Port to bind the HTTP listener on.
    #[arg(long)]
    port: Option<u16>,

    /// Directory backups are written to.
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Optional YAML config file, applied between built-in defaults and
    /// `ZRP_*` environment variables.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<Cli> for CliOverrides {
    fn from(cli: Cli) -> Self {
        CliOverrides {
            db_path: cli.db_path,
            port: cli.port,
            backup_dir: cli.backup_dir,
            config_file: cli.config,
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "zrp-server exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::load(&cli.into()).context("loading configuration")?;

    let pool = zrp_db::connect(&config.db_path)
        .await
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;
    zrp_db::migrate(&pool).await.context("running database migrations")?;
    zrp_authz::seed_default_permissions(&pool)
        .await
        .context("seeding default role permissions")?;

    let capabilities = zrp_authz::Capabilities::load(&pool)
        .await
        .context("loading capability table")?;

    let email_sender = build_email_sender(&config)?;

    let port = config.port;
    let state = AppState::new(pool, config, capabilities, email_sender);

    spawn_session_sweep(state.clone());
    spawn_email_retry_sweep(state.clone());
    spawn_email_fanout(state.clone());

    let app = zrp_server::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("zrp-server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn build_email_sender(config: &RuntimeConfig) -> anyhow::Result<Option<Arc<dyn EmailSender>>> {
    let Some(smtp) = &config.smtp else {
        warn!("no SMTP settings configured; notification emails are disabled");
        return Ok(None);
    };
    let sender = SmtpEmailSender::new(&smtp.host, &smtp.user, &smtp.pass, &smtp.from)
        .context("building SMTP transport")?;
    Ok(Some(Arc::new(sender)))
}

/// Purges expired sessions and CSRF tokens on a fixed interval, mirroring
/// the teacher's heartbeat task shape but doing real cleanup work instead of
/// just ticking a counter.
fn spawn_session_sweep(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            if let Err(err) = zrp_auth::session::purge_expired(state.pool()).await {
                warn!(error = %err, "session purge sweep failed");
            }
            if let Err(err) = zrp_auth::csrf::purge_expired(state.pool()).await {
                warn!(error = %err, "csrf purge sweep failed");
            }
        }
    });
}

/// Re-attempts failed email sends. A no-op sweep (zero retried) when no
/// SMTP sender is configured.
fn spawn_email_retry_sweep(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let Some(sender) = state.email_sender() else { continue };
            match zrp_notify::email::retry_failed(state.pool(), sender.as_ref(), 50).await {
                Ok(retried) if retried > 0 => info!(retried, "retried failed notification emails"),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "email retry sweep failed"),
            }
        }
    });
}

/// Subscribes to the domain event bus and dispatches email notifications for
/// every event [`zrp_notify::email_event_for`] maps to a subscribable
/// `(module, event_type)` pair (§4.7). Runs for the lifetime of the process;
/// a lagging subscriber just drops the oldest events rather than blocking
/// the publisher.
fn spawn_email_fanout(state: AppState) {
    tokio::spawn(async move {
        let mut rx = state.hub().subscribe();
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            let Some(sender) = state.email_sender() else { continue };
            let Some((module, event_type)) = zrp_notify::email_event_for(&event) else { continue };
            let subject = format!("[ZRP] {}", event.event_type());
            let body = event_summary(&event);
            if let Err(err) =
                zrp_notify::email::dispatch(state.pool(), sender.as_ref(), module, event_type, &subject, &body)
                    .await
            {
                warn!(error = %err, "email fanout dispatch failed");
            }
        }
    });
}

fn event_summary(event: &zrp_schemas::DomainEvent) -> String {
    match event {
        zrp_schemas::DomainEvent::EcoApproved { eco_id, approved_by } => {
            format!("ECO {eco_id} approved by user {approved_by}.")
        }
        zrp_schemas::DomainEvent::EcoImplemented { eco_id } => format!("ECO {eco_id} implemented."),
        zrp_schemas::DomainEvent::PoReceived { po_id } => format!("Purchase order {po_id} received."),
        zrp_schemas::DomainEvent::NcrCreated { ncr_id, severity } => {
            format!("NCR {ncr_id} opened with severity {}.", severity.as_str())
        }
        other => format!("{other:?}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!(level = ?Level::INFO, "shutdown signal received, draining connections");
}
