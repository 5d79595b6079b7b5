//! Layered runtime configuration for the ZRP server.
//!
//! Precedence, lowest to highest: built-in defaults → optional YAML file →
//! `ZRP_*` environment variables → CLI flags. Each layer only overrides the
//! keys it sets, mirroring `mqk-config::load_layered_yaml`'s deep-merge
//! model but applied to a typed struct instead of a `serde_json::Value`
//! tree (the ZRP settings surface is small and fixed, unlike the engine's
//! open-ended strategy config).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// CLI flags as described in spec §6. `None` means "not passed on the
/// command line" so the env/file layers underneath are allowed to win.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub backup_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Optional on-disk YAML layer. Every field is optional; absent keys fall
/// through to the env/default layers.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileLayer {
    db_path: Option<PathBuf>,
    port: Option<u16>,
    backup_dir: Option<PathBuf>,
    upload_dir: Option<PathBuf>,
    session_ttl_secs: Option<u64>,
    session_idle_secs: Option<u64>,
    csrf_ttl_secs: Option<u64>,
    csrf_max_live_per_user: Option<usize>,
    bcrypt_cost: Option<u32>,
    password_history_len: Option<usize>,
    account_lockout_threshold: Option<u32>,
    account_lockout_secs: Option<u64>,
    login_ip_rate_per_minute: Option<u32>,
    global_rate_per_minute: Option<u32>,
    max_body_bytes: Option<u64>,
    max_list_size: Option<usize>,
    max_upload_bytes: Option<u64>,
    undo_ttl_secs: Option<u64>,
    max_bom_depth: Option<u32>,
}

/// SMTP credentials. `Debug` redacts the password — never log it, never
/// put it in an audit payload (mirrors `mqk-config::secrets`'s redaction
/// contract).
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<REDACTED>")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub backup_dir: PathBuf,
    pub upload_dir: PathBuf,

    pub session_ttl: Duration,
    pub session_idle_timeout: Duration,
    pub csrf_ttl: Duration,
    pub csrf_max_live_per_user: usize,

    pub bcrypt_cost: u32,
    pub password_history_len: usize,
    pub account_lockout_threshold: u32,
    pub account_lockout_duration: Duration,
    pub login_ip_rate_per_minute: u32,
    pub global_rate_per_minute: u32,

    pub max_body_bytes: u64,
    pub max_list_size: usize,
    pub max_upload_bytes: u64,
    pub undo_ttl: Duration,
    pub max_bom_depth: u32,

    pub smtp: Option<SmtpSettings>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("zrp.db"),
            port: 9000,
            backup_dir: PathBuf::from("backups"),
            upload_dir: PathBuf::from("uploads"),
            session_ttl: Duration::from_secs(24 * 3600),
            session_idle_timeout: Duration::from_secs(30 * 60),
            csrf_ttl: Duration::from_secs(3600),
            csrf_max_live_per_user: 5,
            bcrypt_cost: 10,
            password_history_len: 5,
            account_lockout_threshold: 10,
            account_lockout_duration: Duration::from_secs(15 * 60),
            login_ip_rate_per_minute: 5,
            global_rate_per_minute: 120,
            max_body_bytes: 8 * 1024 * 1024,
            max_list_size: 500,
            max_upload_bytes: 16 * 1024 * 1024,
            undo_ttl: Duration::from_secs(5 * 60),
            max_bom_depth: 32,
            smtp: None,
        }
    }
}

impl RuntimeConfig {
    /// Build the effective configuration from defaults + optional YAML file
    /// + `ZRP_*` env vars + CLI flags, in that precedence order.
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(path) = &cli.config_file {
            let layer = read_file_layer(path)
                .with_context(|| format!("loading config file {}", path.display()))?;
            cfg.apply_file_layer(layer);
        }

        cfg.apply_env();
        cfg.apply_cli(cli);
        cfg.smtp = resolve_smtp_from_env();

        Ok(cfg)
    }

    fn apply_file_layer(&mut self, l: FileLayer) {
        if let Some(v) = l.db_path {
            self.db_path = v;
        }
        if let Some(v) = l.port {
            self.port = v;
        }
        if let Some(v) = l.backup_dir {
            self.backup_dir = v;
        }
        if let Some(v) = l.upload_dir {
            self.upload_dir = v;
        }
        if let Some(v) = l.session_ttl_secs {
            self.session_ttl = Duration::from_secs(v);
        }
        if let Some(v) = l.session_idle_secs {
            self.session_idle_timeout = Duration::from_secs(v);
        }
        if let Some(v) = l.csrf_ttl_secs {
            self.csrf_ttl = Duration::from_secs(v);
        }
        if let Some(v) = l.csrf_max_live_per_user {
            self.csrf_max_live_per_user = v;
        }
        if let Some(v) = l.bcrypt_cost {
            self.bcrypt_cost = v;
        }
        if let Some(v) = l.password_history_len {
            self.password_history_len = v;
        }
        if let Some(v) = l.account_lockout_threshold {
            self.account_lockout_threshold = v;
        }
        if let Some(v) = l.account_lockout_secs {
            self.account_lockout_duration = Duration::from_secs(v);
        }
        if let Some(v) = l.login_ip_rate_per_minute {
            self.login_ip_rate_per_minute = v;
        }
        if let Some(v) = l.global_rate_per_minute {
            self.global_rate_per_minute = v;
        }
        if let Some(v) = l.max_body_bytes {
            self.max_body_bytes = v;
        }
        if let Some(v) = l.max_list_size {
            self.max_list_size = v;
        }
        if let Some(v) = l.max_upload_bytes {
            self.max_upload_bytes = v;
        }
        if let Some(v) = l.undo_ttl_secs {
            self.undo_ttl = Duration::from_secs(v);
        }
        if let Some(v) = l.max_bom_depth {
            self.max_bom_depth = v;
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_path("ZRP_DB_PATH") {
            self.db_path = v;
        }
        if let Some(v) = env_parsed::<u16>("ZRP_PORT") {
            self.port = v;
        }
        if let Some(v) = env_path("ZRP_BACKUP_DIR") {
            self.backup_dir = v;
        }
        if let Some(v) = env_path("ZRP_UPLOAD_DIR") {
            self.upload_dir = v;
        }
    }

    fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(v) = &cli.db_path {
            self.db_path = v.clone();
        }
        if let Some(v) = cli.port {
            self.port = v;
        }
        if let Some(v) = &cli.backup_dir {
            self.backup_dir = v.clone();
        }
    }
}

fn read_file_layer(path: &std::path::Path) -> Result<FileLayer> {
    let raw = std::fs::read_to_string(path)?;
    let layer: FileLayer = serde_yaml::from_str(&raw)?;
    Ok(layer)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// SMTP is entirely optional: the core never hard-fails if it's absent, it
/// just has no outbound email capability (§6 "External capabilities
/// injected at boot").
fn resolve_smtp_from_env() -> Option<SmtpSettings> {
    let host = std::env::var("ZRP_SMTP_HOST").ok()?;
    let port = env_parsed::<u16>("ZRP_SMTP_PORT").unwrap_or(587);
    let user = std::env::var("ZRP_SMTP_USER").unwrap_or_default();
    let pass = std::env::var("ZRP_SMTP_PASS").unwrap_or_default();
    let from = std::env::var("ZRP_SMTP_FROM").unwrap_or_else(|_| user.clone());
    Some(SmtpSettings {
        host,
        port,
        user,
        pass,
        from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_limits() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.max_list_size, 500);
        assert_eq!(cfg.max_body_bytes, 8 * 1024 * 1024);
        assert_eq!(cfg.max_bom_depth, 32);
        assert_eq!(cfg.account_lockout_threshold, 10);
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = CliOverrides {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
            port: Some(1234),
            backup_dir: None,
            config_file: None,
        };
        let cfg = RuntimeConfig::load(&cli).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(cfg.port, 1234);
    }

    #[test]
    fn smtp_debug_redacts_password() {
        let smtp = SmtpSettings {
            host: "smtp.example.com".into(),
            port: 587,
            user: "bot".into(),
            pass: "super-secret".into(),
            from: "bot@example.com".into(),
        };
        let dbg = format!("{:?}", smtp);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
