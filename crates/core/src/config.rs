use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::threshold::{default_thresholds, parse_thresholds, Threshold};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Env lookup ────────────────────────────────────────────────

/// Profiled key lookup: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
struct EnvReader<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        let get = |k: &str| (self.lookup)(k).filter(|s| !s.is_empty());
        if !self.profile.is_empty() {
            if let Some(v) = get(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        get(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr + std::fmt::Display + Copy>(&self, key: &str, default: T) -> T {
        match self.opt(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, default = %default, "invalid config value, using default");
                default
            }),
            None => default,
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.opt(key)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PLANIT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env::var("PLANIT_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let lookup = |key: &str| env::var(key).ok();
        Self::build(profile, &lookup)
    }

    /// Build config from an explicit key/value map instead of the process env.
    pub fn from_vars(profile: &str, vars: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| vars.get(key).cloned();
        Self::build(profile, &lookup)
    }

    fn build(profile: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let p = profile.to_uppercase();
        let env = EnvReader {
            profile: &p,
            lookup,
        };
        Self {
            profile: p.clone(),
            server: ServerConfig::from_env(&env),
            store: StoreConfig::from_env(&env),
            queue: QueueConfig::from_env(&env),
            scheduler: SchedulerConfig::from_env(&env),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:     {}:{} (debug={})", self.server.host, self.server.port, self.server.debug);
        tracing::info!("  store:      {}", self.store.redacted_url());
        tracing::info!("  queue:      url={}, health={}", self.queue.url, self.queue.health_url);
        tracing::info!(
            "  scheduler:  interval={}m, thresholds=[{}], misfire_grace={}s, timeout={}s",
            self.scheduler.interval_minutes,
            self.scheduler.threshold_labels().join(","),
            self.scheduler.misfire_grace_secs,
            self.scheduler.outbound_timeout_secs,
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "store": {
                "url": self.store.redacted_url(),
                "backend": self.store.backend(),
                "max_connections": self.store.max_connections,
            },
            "queue": { "url": self.queue.url, "health_url": self.queue.health_url },
            "scheduler": {
                "interval_minutes": self.scheduler.interval_minutes,
                "thresholds": self.scheduler.thresholds,
                "misfire_grace_secs": self.scheduler.misfire_grace_secs,
                "outbound_timeout_secs": self.scheduler.outbound_timeout_secs,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub debug: bool,
}

impl ServerConfig {
    fn from_env(env: &EnvReader<'_>) -> Self {
        Self {
            host: env.or("HOST", "0.0.0.0"),
            port: env.parsed("SCHEDULER_PORT", 5006),
            cors_origin: env.or("CORS_ORIGIN", "*"),
            debug: env.flag("DEBUG"),
        }
    }
}

// ── Task store ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `postgres://…` or `memory://`.
    pub url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    fn from_env(env: &EnvReader<'_>) -> Self {
        Self {
            url: env.or("TASK_STORE_URL", "memory://"),
            max_connections: env.parsed("TASK_STORE_MAX_CONNECTIONS", 5),
        }
    }

    /// Backend selected by the URL scheme; anything unrecognized is `None`.
    pub fn backend(&self) -> Option<StoreBackend> {
        let scheme = self.url.split("://").next().unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Some(StoreBackend::Postgres),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }

    /// The store URL with any password replaced by `***`.
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) if parsed.password().is_some() => {
                let _ = parsed.set_password(Some("***"));
                parsed.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

// ── Messaging queue (notification sink) ───────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub url: String,
    pub health_url: String,
}

impl QueueConfig {
    fn from_env(env: &EnvReader<'_>) -> Self {
        Self {
            url: env.or("MESSAGING_QUEUE_URL", "http://messaging_queue:5001/queue"),
            health_url: env.or("MESSAGING_QUEUE_HEALTH_URL", "http://messaging_queue:5001/health"),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Poll interval in minutes; also the length of every deadline window.
    pub interval_minutes: u32,
    /// Ordered thresholds, evaluated in this order every cycle.
    pub thresholds: Vec<Threshold>,
    /// Ticks delivered later than this past their schedule are skipped.
    pub misfire_grace_secs: u64,
    /// Bound on every outbound call (store, sink, probes).
    pub outbound_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            thresholds: default_thresholds(),
            misfire_grace_secs: 120,
            outbound_timeout_secs: 5,
        }
    }
}

impl SchedulerConfig {
    fn from_env(env: &EnvReader<'_>) -> Self {
        let defaults = Self::default();

        let mut interval_minutes = env.parsed("SCHEDULER_CHECK_INTERVAL", defaults.interval_minutes);
        if interval_minutes == 0 {
            tracing::warn!("SCHEDULER_CHECK_INTERVAL must be at least 1 minute, using default");
            interval_minutes = defaults.interval_minutes;
        }

        let thresholds = match env.opt("NOTIFICATION_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw).unwrap_or_else(|e| {
                tracing::warn!(value = %raw, error = %e, "invalid NOTIFICATION_THRESHOLDS, using default");
                default_thresholds()
            }),
            None => defaults.thresholds,
        };

        Self {
            interval_minutes,
            thresholds,
            misfire_grace_secs: env.parsed("SCHEDULER_MISFIRE_GRACE_SECS", defaults.misfire_grace_secs),
            outbound_timeout_secs: env.parsed("OUTBOUND_TIMEOUT_SECS", defaults.outbound_timeout_secs),
        }
    }

    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.interval_minutes))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    pub fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_secs)
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(self.outbound_timeout_secs)
    }

    pub fn threshold_labels(&self) -> Vec<String> {
        self.thresholds.iter().map(|t| t.label()).collect()
    }
}
