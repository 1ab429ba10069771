use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CobraError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64_opt(profile: &str, key: &str) -> Option<u64> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub scheduler: SchedulerSettings,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `COBRA_PROFILE` env var. When set (e.g. `BENCH`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("COBRA_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            ledger: LedgerConfig::from_env_profiled(p),
            scheduler: SchedulerSettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:     host={}, port={}", self.server.host, self.server.port);
        tracing::info!(
            "  ledger:     backend={}, data_dir={}",
            self.ledger.backend,
            self.ledger.data_dir.display()
        );
        tracing::info!(
            "  scheduler:  policy={}, lambda={}, epsilon={}, latency_scale={}, seeded={}",
            self.scheduler.policy,
            self.scheduler.lambda,
            self.scheduler.epsilon,
            self.scheduler.latency_time_scale,
            self.scheduler.rng_seed.is_some()
        );
    }

    /// Return a view safe for API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "ledger": { "backend": self.ledger.backend, "data_dir": self.ledger.data_dir },
            "scheduler": {
                "policy": self.scheduler.policy,
                "lambda": self.scheduler.lambda,
                "epsilon": self.scheduler.epsilon,
                "latency_time_scale": self.scheduler.latency_time_scale,
                "seeded": self.scheduler.rng_seed.is_some(),
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
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Ledger ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Memory,
    File,
}

impl std::fmt::Display for LedgerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerBackend::Memory => write!(f, "memory"),
            LedgerBackend::File => write!(f, "file"),
        }
    }
}

impl FromStr for LedgerBackend {
    type Err = CobraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(LedgerBackend::Memory),
            "file" => Ok(LedgerBackend::File),
            _ => Err(CobraError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
    pub backend: LedgerBackend,
}

impl LedgerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let raw = profiled_env_or(p, "LEDGER_BACKEND", "memory");
        let backend = raw.parse().unwrap_or_else(|e: CobraError| {
            tracing::warn!("{}; falling back to the in-memory ledger", e);
            LedgerBackend::Memory
        });
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            backend,
        }
    }

    /// Snapshot file used by the file backend.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("ledger.json")
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Policy used when a dispatch request does not name one.
    pub policy: String,
    pub lambda: f64,
    pub epsilon: f64,
    /// Multiplier applied to the drawn latency before sleeping. 0 disables the wait.
    pub latency_time_scale: f64,
    pub rng_seed: Option<u64>,
}

impl SchedulerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            policy: profiled_env_or(p, "DISPATCH_POLICY", "cobra"),
            lambda: profiled_env_f64(p, "COBRA_LAMBDA", 0.3),
            epsilon: profiled_env_f64(p, "COBRA_EPSILON", 0.7),
            latency_time_scale: profiled_env_f64(p, "LATENCY_TIME_SCALE", 1.0),
            rng_seed: profiled_env_u64_opt(p, "COBRA_RNG_SEED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_profile_falls_back_to_defaults() {
        let cfg = Config::for_profile("cobra_cfg_test_unset");
        assert_eq!(cfg.profile, "COBRA_CFG_TEST_UNSET");
        assert_eq!(cfg.profile_label(), "COBRA_CFG_TEST_UNSET");
        assert!(cfg.ledger.snapshot_path().ends_with("ledger.json"));
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("CFGTESTA_COBRA_LAMBDA", "0.55");
        let cfg = Config::for_profile("cfgtesta");
        assert_eq!(cfg.scheduler.lambda, 0.55);
        env::remove_var("CFGTESTA_COBRA_LAMBDA");
    }

    #[test]
    fn ledger_backend_parsing() {
        assert_eq!("FILE".parse::<LedgerBackend>().unwrap(), LedgerBackend::File);
        assert_eq!(" memory ".parse::<LedgerBackend>().unwrap(), LedgerBackend::Memory);
        assert_eq!(
            "sqlite".parse::<LedgerBackend>().unwrap_err(),
            CobraError::UnknownBackend("sqlite".into())
        );
    }

    #[test]
    fn unrecognised_backend_falls_back_to_memory() {
        env::set_var("CFGTESTB_LEDGER_BACKEND", "sqlite");
        let cfg = Config::for_profile("cfgtestb");
        assert_eq!(cfg.ledger.backend, LedgerBackend::Memory);
        env::remove_var("CFGTESTB_LEDGER_BACKEND");

        env::set_var("CFGTESTC_LEDGER_BACKEND", "File");
        let cfg = Config::for_profile("cfgtestc");
        assert_eq!(cfg.ledger.backend, LedgerBackend::File);
        env::remove_var("CFGTESTC_LEDGER_BACKEND");
    }

    #[test]
    fn redacted_summary_shape() {
        let cfg = Config::for_profile("");
        let v = cfg.redacted_summary();
        assert_eq!(v["profile"], "default");
        assert!(v["scheduler"]["seeded"].is_boolean());
    }
}
