//! Configuration management with validation and defaults
//!
//! Values come from an optional TOML file, then `WINGO_*` environment
//! overrides, then validation.

use crate::common::money::Amount;
use crate::errors::{ConfigurationError, WingoResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WingoConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub wallet: WalletConfig,
}

/// Round engine timing and labelling
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of one round (milliseconds)
    pub round_interval_ms: u64,
    /// Betting closes this long before the next round opens (milliseconds)
    pub betting_grace_ms: u64,
    pub period_prefix: String,
    /// First suffix issued when no persisted round exists
    pub default_counter: u16,
    /// Fixed seed for reproducible outcomes; entropy when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_seed: Option<u64>,
    /// Upper bound for history queries
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            round_interval_ms: 30_000,
            betting_grace_ms: 5_000,
            period_prefix: "WG".to_string(),
            default_counter: 1,
            outcome_seed: None,
            history_limit: 20,
        }
    }
}

impl EngineConfig {
    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    pub fn betting_grace(&self) -> Duration {
        Duration::from_millis(self.betting_grace_ms)
    }

    /// How long after opening a round still accepts bets
    pub fn betting_window(&self) -> Duration {
        self.round_interval().saturating_sub(self.betting_grace())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            data_directory: "./DB/wingo_data".to_string(),
            write_buffer_size_mb: 64,
            clear_on_start: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Balance granted to newly registered users
    pub starting_balance: Amount,
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> WingoResult<WingoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => WingoConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> WingoResult<WingoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut WingoConfig) -> WingoResult<()> {
        if let Some(value) = env_parse::<u64>("WINGO_ROUND_INTERVAL_MS")? {
            config.engine.round_interval_ms = value;
        }
        if let Some(value) = env_parse::<u64>("WINGO_BETTING_GRACE_MS")? {
            config.engine.betting_grace_ms = value;
        }
        if let Ok(prefix) = env::var("WINGO_PERIOD_PREFIX") {
            config.engine.period_prefix = prefix;
        }
        if let Some(seed) = env_parse::<u64>("WINGO_OUTCOME_SEED")? {
            config.engine.outcome_seed = Some(seed);
        }

        if let Ok(data_dir) = env::var("WINGO_DATA_DIR") {
            config.storage.data_directory = data_dir;
        }
        if let Ok(backend) = env::var("WINGO_STORAGE_BACKEND") {
            config.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "rocksdb" => StorageBackend::Rocksdb,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "WINGO_STORAGE_BACKEND".to_string(),
                        value: backend,
                        reason: "expected 'rocksdb' or 'memory'".to_string(),
                    }
                    .into())
                }
            };
        }

        if let Ok(host) = env::var("WINGO_API_HOST") {
            config.api.host = host;
        }
        if let Some(port) = env_parse::<u16>("WINGO_API_PORT")? {
            config.api.port = port;
        }
        if let Some(balance) = env_parse::<Amount>("WINGO_STARTING_BALANCE")? {
            config.wallet.starting_balance = balance;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &WingoConfig) -> WingoResult<()> {
        let engine = &config.engine;
        if engine.round_interval_ms == 0 {
            return Err(invalid("engine.round_interval_ms", "0", "Round interval cannot be zero"));
        }
        if engine.betting_grace_ms >= engine.round_interval_ms {
            return Err(invalid(
                "engine.betting_grace_ms",
                &engine.betting_grace_ms.to_string(),
                "Grace must be shorter than the round interval",
            ));
        }
        if engine.period_prefix.is_empty() {
            return Err(ConfigurationError::MissingRequired("engine.period_prefix".to_string()).into());
        }
        if engine.default_counter > 999 {
            return Err(invalid(
                "engine.default_counter",
                &engine.default_counter.to_string(),
                "Counter is three digits",
            ));
        }
        if engine.history_limit == 0 {
            return Err(invalid("engine.history_limit", "0", "History limit cannot be zero"));
        }

        if config.storage.backend == StorageBackend::Rocksdb && config.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if config.api.port == 0 {
            return Err(invalid("api.port", "0", "Port cannot be zero"));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &WingoConfig, path: &str) -> WingoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::errors::GameError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> WingoResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| {
            ConfigurationError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: "could not parse value".to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
