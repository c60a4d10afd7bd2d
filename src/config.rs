// src/config.rs

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metrics::DEFAULT_INTERVAL;
use crate::store::Retention;

pub const CONFIG_ENV: &str = "METRICS_AGENT_CONFIG";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
const CONFIG_DIR: &str = "metrics-agent";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub cpu: bool,
    pub memory: bool,
    pub processes: bool,
    pub system: bool,
    pub cpu_sample_window_ms: u64,     // Default: 1000
    pub process_limit: Option<usize>,  // Default: all processes
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            cpu: true,
            memory: true,
            processes: true,
            system: false,
            cpu_sample_window_ms: 1000,
            process_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server_address: String,
    // Stored for clients; requests are not authenticated against it.
    pub api_key: Option<String>,
    pub collection_interval_secs: u64,
    pub retention: Retention,
    pub collectors: CollectorSettings,
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            server_address: "127.0.0.1:9464".to_string(),
            api_key: None,
            collection_interval_secs: DEFAULT_INTERVAL.as_secs(),
            retention: Retention::Unbounded,
            collectors: CollectorSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    /// Loads the config at `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(AgentConfig::default());
        }

        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AgentConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let data = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, data).map_err(write_err)
    }

    /// Writes a fresh default config with a generated API key. Refuses to
    /// replace an existing file unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<Self, ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.display().to_string()));
        }
        let config = AgentConfig {
            api_key: Some(generate_api_key()),
            ..AgentConfig::default()
        };
        config.save(path)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.collection_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "collection_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server_address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.server_address.clone()))
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs.max(1))
    }

    /// `LOG_LEVEL` wins over the configured level.
    pub fn effective_log_level(&self) -> String {
        env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| self.log_level.clone())
    }
}

/// Resolves the config file location: explicit path, then the
/// `METRICS_AGENT_CONFIG` variable, then the platform config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    Ok(path)
}

/// 32 random bytes, hex encoded.
pub fn generate_api_key() -> String {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    key.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn api_key_is_64_hex_chars() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn defaults_are_valid() {
        let config = AgentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.collection_interval(), Duration::from_secs(30));
        assert_eq!(config.retention, Retention::Unbounded);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AgentConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"server_address": "0.0.0.0:9000", "retention": {"capacity": 120}}"#,
        )
        .unwrap();

        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.server_address, "0.0.0.0:9000");
        assert_eq!(config.retention, Retention::capacity(120).unwrap());
        assert_eq!(config.collectors, CollectorSettings::default());
    }

    #[test]
    fn invalid_address_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"server_address": "not an address"}"#).unwrap();
        assert!(matches!(
            AgentConfig::load(&path),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = AgentConfig {
            collection_interval_secs: 0,
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            AgentConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn init_writes_key_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let created = AgentConfig::init(&path, false).unwrap();
        assert!(created.api_key.is_some());
        assert_eq!(AgentConfig::load(&path).unwrap(), created);

        assert!(matches!(
            AgentConfig::init(&path, false),
            Err(ConfigError::AlreadyExists(_))
        ));

        let replaced = AgentConfig::init(&path, true).unwrap();
        assert_ne!(replaced.api_key, created.api_key);
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/tmp/explicit.json");
        assert_eq!(resolve_config_path(Some(&path)).unwrap(), path);
    }
}
