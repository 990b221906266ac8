//! Playlog configuration
//!
//! One YAML file, one struct per section. Every field has a default, so a
//! partial file (or none at all) is valid input.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Playlog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub breaker: BreakerConfig,
    pub queue: QueueConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Telemetry service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the telemetry service, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    /// Optional bearer token sent with every request.
    pub api_key: Option<String>,
    /// Upper bound on a single request, independent of the breaker.
    pub request_timeout_secs: u64,
}

/// Circuit breaker and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a trial call is allowed.
    pub open_timeout_secs: u64,
    /// Attempts per call, including the first one.
    pub max_attempts: u32,
    /// Base of the exponential backoff between attempts.
    pub base_delay_ms: u64,
    /// Upper bound of the random jitter added to each backoff.
    pub max_jitter_ms: u64,
}

/// Pending-operation queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Flush cycles after which an undeliverable operation is dropped.
    pub max_flush_attempts: u32,
}

/// Periodic sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub library_interval_secs: u64,
    pub achievements_interval_secs: u64,
    /// Cooldown applied when the server refuses a sync without an expiry.
    pub default_cooldown_secs: u64,
    /// How long a fetched allowed-source list stays fresh.
    pub allowed_sources_ttl_secs: u64,
}

/// Where the state files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`; `RUST_LOG` overrides it.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but any read or parse failure yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Where the config file is looked up when `--config` is not given.
    ///
    /// Typically `$XDG_CONFIG_HOME/playlog/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("playlog")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.playlog.app/v1".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout_secs: 60,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_flush_attempts: 5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            library_interval_secs: 3600,
            achievements_interval_secs: 3600,
            default_cooldown_secs: 900,
            allowed_sources_ttl_secs: 86400,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("playlog"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Duration accessors
// ---------------------------------------------------------------------------

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl BreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }
}

impl SyncConfig {
    pub fn library_interval(&self) -> Duration {
        Duration::from_secs(self.library_interval_secs)
    }

    pub fn achievements_interval(&self) -> Duration {
        Duration::from_secs(self.achievements_interval_secs)
    }

    pub fn default_cooldown(&self) -> chrono::Duration {
        chrono_seconds(self.default_cooldown_secs)
    }

    pub fn allowed_sources_ttl(&self) -> chrono::Duration {
        chrono_seconds(self.allowed_sources_ttl_secs)
    }
}

/// `chrono::Duration::seconds` panics past `i64::MAX / 1000`
fn chrono_seconds(seconds: u64) -> chrono::Duration {
    let capped = i64::try_from(seconds).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    chrono::Duration::seconds(capped)
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"breaker.max_attempts"`.
    pub field: String,
    /// What is wrong with the value.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn require_positive(errors: &mut Vec<ValidationError>, field: &str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field: field.into(),
            message: "must be greater than 0".into(),
        });
    }
}

impl Config {
    /// Checks every section and collects all problems; empty means valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        let url = self.remote.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{url}'"),
            });
        }
        require_positive(
            &mut errors,
            "remote.request_timeout_secs",
            self.remote.request_timeout_secs,
        );

        // --- breaker ---
        require_positive(
            &mut errors,
            "breaker.failure_threshold",
            self.breaker.failure_threshold.into(),
        );
        require_positive(
            &mut errors,
            "breaker.open_timeout_secs",
            self.breaker.open_timeout_secs,
        );
        require_positive(
            &mut errors,
            "breaker.max_attempts",
            self.breaker.max_attempts.into(),
        );

        // --- queue ---
        require_positive(
            &mut errors,
            "queue.max_flush_attempts",
            self.queue.max_flush_attempts.into(),
        );

        // --- sync ---
        require_positive(
            &mut errors,
            "sync.library_interval_secs",
            self.sync.library_interval_secs,
        );
        require_positive(
            &mut errors,
            "sync.achievements_interval_secs",
            self.sync.achievements_interval_secs,
        );
        require_positive(
            &mut errors,
            "sync.default_cooldown_secs",
            self.sync.default_cooldown_secs,
        );
        require_positive(
            &mut errors,
            "sync.allowed_sources_ttl_secs",
            self.sync.allowed_sources_ttl_secs,
        );

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Programmatic [`Config`] construction, mostly for tests and embedders.
///
/// Unset fields keep their defaults.
///
/// # Example
///
/// ```rust,no_run
/// use playlog_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .remote_base_url("https://telemetry.local/api")
///     .breaker_failure_threshold(5)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Builder over the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.remote.api_key = Some(key.into());
        self
    }

    pub fn remote_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.remote.request_timeout_secs = seconds;
        self
    }

    // --- breaker ---

    pub fn breaker_failure_threshold(mut self, n: u32) -> Self {
        self.config.breaker.failure_threshold = n;
        self
    }

    pub fn breaker_open_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.breaker.open_timeout_secs = seconds;
        self
    }

    pub fn breaker_max_attempts(mut self, n: u32) -> Self {
        self.config.breaker.max_attempts = n;
        self
    }

    pub fn breaker_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.breaker.base_delay_ms = ms;
        self
    }

    pub fn breaker_max_jitter_ms(mut self, ms: u64) -> Self {
        self.config.breaker.max_jitter_ms = ms;
        self
    }

    // --- queue ---

    pub fn queue_max_flush_attempts(mut self, n: u32) -> Self {
        self.config.queue.max_flush_attempts = n;
        self
    }

    // --- sync ---

    pub fn sync_library_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.library_interval_secs = seconds;
        self
    }

    pub fn sync_achievements_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync.achievements_interval_secs = seconds;
        self
    }

    pub fn sync_default_cooldown_secs(mut self, seconds: u64) -> Self {
        self.config.sync.default_cooldown_secs = seconds;
        self
    }

    pub fn sync_allowed_sources_ttl_secs(mut self, seconds: u64) -> Self {
        self.config.sync.allowed_sources_ttl_secs = seconds;
        self
    }

    // --- storage ---

    pub fn storage_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.data_dir = dir;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Returns the config without validating it.
    pub fn build(self) -> Config {
        self.config
    }

    /// Returns the config, or every validation error found.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
