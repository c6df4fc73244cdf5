use std::{fs, path::PathBuf};

use common::prelude::SecretKey;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "blade";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const KEY_FILE_NAME: &str = "key.pem";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the public federation server
    #[serde(default = "default_federation_port")]
    pub federation_port: u16,
    /// Port for the private owner API
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Address other nodes reach us at (defaults to localhost:<federation_port>)
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    /// Image served at the avatar endpoint
    #[serde(default)]
    pub avatar_path: Option<PathBuf>,
    /// Run a sync pass on this interval (never if unset)
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
    /// Timeout for requests to other nodes
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Directory for log files (stdout only if unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_federation_port() -> u16 {
    5000
}

fn default_api_port() -> u16 {
    5001
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            federation_port: default_federation_port(),
            api_port: default_api_port(),
            address: None,
            display_name: String::new(),
            bio: String::new(),
            avatar_path: None,
            sync_interval_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// The advertised address, falling back to the local federation port
    pub fn address(&self) -> String {
        self.address
            .clone()
            .unwrap_or_else(|| format!("localhost:{}", self.federation_port))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the blade directory (~/.blade)
    pub blade_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the node key PEM file
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the blade directory path (custom or default ~/.blade)
    pub fn blade_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new blade state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let blade_dir = Self::blade_dir(custom_path)?;

        if blade_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&blade_dir)?;

        // Generate and save key
        let key = SecretKey::generate();
        let key_path = blade_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;

        // Create config (use provided or default)
        let config = config.unwrap_or_default();
        let config_path = blade_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Empty database file, migrated by the service on first start
        let db_path = blade_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            blade_dir,
            db_path,
            key_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the blade directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let blade_dir = Self::blade_dir(custom_path)?;

        if !blade_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = blade_dir.join(DB_FILE_NAME);
        let key_path = blade_dir.join(KEY_FILE_NAME);
        let config_path = blade_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            blade_dir,
            db_path,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the secret key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("blade directory not initialized. Run 'blade init' first")]
    NotInitialized,

    #[error("blade directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blade");
        let config = AppConfig {
            display_name: "alice".into(),
            sync_interval_secs: Some(30),
            ..Default::default()
        };

        let initialized = AppState::init(Some(path.clone()), Some(config.clone())).unwrap();
        assert!(initialized.db_path.exists());

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config, config);
        assert_eq!(
            loaded.load_key().unwrap().public(),
            initialized.load_key().unwrap().public()
        );

        assert!(matches!(
            AppState::init(Some(path), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("nope"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_sparse_config_uses_defaults() {
        let config: AppConfig = toml::from_str("display_name = \"bob\"").unwrap();
        assert_eq!(config.federation_port, 5000);
        assert_eq!(config.api_port, 5001);
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.address(), "localhost:5000");
    }
}
