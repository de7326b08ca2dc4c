//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use reckon_reconcile::EngineSettings;
use reckon_types::TrustPolicy;

use crate::{LogFormat, NodeError, SchedulerConfig};

/// Configuration for a reckon node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB record store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Number of reconcile workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Bounded queue length per worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single source read, in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Keep manually overridden statuses pinned across automatic passes.
    #[serde(default = "default_true")]
    pub respect_manual_override: bool,

    /// Superseded signals kept per record.
    #[serde(default = "default_signal_history_limit")]
    pub signal_history_limit: usize,

    /// Lifetime of a scan session, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Maximum number of concurrently open scan sessions.
    #[serde(default = "default_session_capacity")]
    pub session_capacity: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Trust weights and scoring thresholds.
    #[serde(default)]
    pub trust: TrustPolicy,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./reckon_data")
}

fn default_map_size() -> usize {
    1 << 30
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_source_timeout_ms() -> u64 {
    5_000
}

fn default_max_write_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_signal_history_limit() -> usize {
    20
}

fn default_session_ttl_secs() -> u64 {
    15 * 60
}

fn default_session_capacity() -> usize {
    10_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.worker_count == 0 {
            return Err(NodeError::Config("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be at least 1".into()));
        }
        if self.max_write_attempts == 0 {
            return Err(NodeError::Config(
                "max_write_attempts must be at least 1".into(),
            ));
        }
        self.log_format.parse::<LogFormat>()?;
        self.trust
            .validate()
            .map_err(|e| NodeError::Config(format!("trust: {e}")))?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            respect_manual_override: self.respect_manual_override,
            signal_history_limit: self.signal_history_limit,
            max_write_attempts: self.max_write_attempts,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            worker_count: self.worker_count,
            queue_capacity: self.queue_capacity,
            source_timeout: self.source_timeout(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            source_timeout_ms: default_source_timeout_ms(),
            max_write_attempts: default_max_write_attempts(),
            respect_manual_override: default_true(),
            signal_history_limit: default_signal_history_limit(),
            session_ttl_secs: default_session_ttl_secs(),
            session_capacity: default_session_capacity(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            trust: TrustPolicy::default(),
        }
    }
}
