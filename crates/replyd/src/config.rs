//! Configuration management for replyd.
//!
//! Loads settings from /etc/replyd/config.toml when present, then applies
//! environment variable overrides. Every field has a safe default so the
//! daemon always starts; values are normalized (clamped, trimmed) at load.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/replyd/config.toml";

/// Timeouts below this are raised to it.
pub const MIN_TIMEOUT_SECS: u64 = 3;

/// Which source serves the live response by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryMode {
    ExternalModel,
    RulesOnly,
    /// Unrecognized configured value; treated as rules-only with a recorded
    /// configuration warning.
    Unknown(String),
}

impl PrimaryMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "external_model" => Self::ExternalModel,
            "rules_only" => Self::RulesOnly,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listener bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listener bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// "external_model" or "rules_only"
    #[serde(default = "default_primary_mode")]
    pub primary_mode: String,

    /// Timeout for the primary external-model call (min 3)
    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_secs: u64,

    /// Shadow calibration enabled
    #[serde(default = "default_shadow_enabled")]
    pub shadow_enabled: bool,

    /// Fraction of requests sampled for shadow comparison, in [0, 1]
    #[serde(default = "default_shadow_sample_rate")]
    pub shadow_sample_rate: f64,

    /// Timeout for the shadow external-model call (min 3)
    #[serde(default = "default_shadow_timeout")]
    pub shadow_timeout_secs: u64,

    /// Completion API credential; empty means not configured
    #[serde(default)]
    pub api_key: String,

    /// Completion model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion endpoint base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Append-only shadow comparison log (newline-delimited JSON)
    #[serde(default = "default_shadow_log_path")]
    pub shadow_log_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_primary_mode() -> String {
    "external_model".to_string()
}

fn default_primary_timeout() -> u64 {
    12
}

fn default_shadow_enabled() -> bool {
    true
}

fn default_shadow_sample_rate() -> f64 {
    1.0
}

fn default_shadow_timeout() -> u64 {
    12
}

fn default_model() -> String {
    "gpt-4.1-nano".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_shadow_log_path() -> PathBuf {
    PathBuf::from("shadow_logs.jsonl")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            primary_mode: default_primary_mode(),
            primary_timeout_secs: default_primary_timeout(),
            shadow_enabled: default_shadow_enabled(),
            shadow_sample_rate: default_shadow_sample_rate(),
            shadow_timeout_secs: default_shadow_timeout(),
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            shadow_log_path: default_shadow_log_path(),
        }
    }
}

impl Config {
    /// Load config from file (or defaults), apply env overrides, normalize.
    pub fn load() -> Self {
        let mut config = Self::load_from_path(CONFIG_PATH).unwrap_or_else(|e| {
            warn!("Config file not found, using defaults: {}", e);
            Config::default()
        });
        config.apply_env();
        config.normalize();
        config
    }

    fn load_from_path(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path);
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(host) = env_string("REPLYD_HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse::<u16>("REPLYD_PORT") {
            self.port = port;
        }
        if let Some(mode) = env_string("PRIMARY_MODE") {
            self.primary_mode = mode;
        }
        if let Some(timeout) = env_parse::<u64>("PRIMARY_TIMEOUT_SEC") {
            self.primary_timeout_secs = timeout;
        }
        if let Some(enabled) = env_bool("SHADOW_MODE") {
            self.shadow_enabled = enabled;
        }
        if let Some(rate) = env_parse::<f64>("SHADOW_SAMPLE_RATE") {
            self.shadow_sample_rate = rate;
        }
        if let Some(timeout) = env_parse::<u64>("SHADOW_TIMEOUT_SEC") {
            self.shadow_timeout_secs = timeout;
        }
        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.api_key = key;
        }
        if let Some(model) = env_string("OPENAI_MODEL") {
            self.model = model;
        }
        if let Some(base) = env_string("OPENAI_BASE_URL") {
            self.base_url = base;
        }
        if let Some(path) = env_string("SHADOW_LOG_PATH") {
            self.shadow_log_path = PathBuf::from(path);
        }
    }

    /// Clamp and canonicalize loaded values.
    pub fn normalize(&mut self) {
        self.primary_mode = self.primary_mode.trim().to_lowercase();
        self.primary_timeout_secs = self.primary_timeout_secs.max(MIN_TIMEOUT_SECS);
        self.shadow_timeout_secs = self.shadow_timeout_secs.max(MIN_TIMEOUT_SECS);
        self.shadow_sample_rate = self.shadow_sample_rate.clamp(0.0, 1.0);
        self.api_key = self.api_key.trim().to_string();
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }

    pub fn primary_mode(&self) -> PrimaryMode {
        PrimaryMode::parse(&self.primary_mode)
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn shadow_timeout(&self) -> Duration {
        Duration::from_secs(self.shadow_timeout_secs)
    }

    pub fn api_key_present(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|v| v.parse().ok())
}
