use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::ProviderType;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cloudinary: CloudinaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    /// Where multipart file parts are spooled; empty means the system temp dir
    #[serde(default)]
    pub spool_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    /// URL prefix under which `local_path` is served
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

/// Cloudinary account, only read when `storage.provider = "cloudinary"`
#[derive(Debug, Clone, Deserialize)]
pub struct CloudinaryConfig {
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_cloudinary_api_base")]
    pub api_base_url: String,
    /// Files larger than this go through the chunked upload API
    #[serde(default = "default_chunk_threshold_mb")]
    pub chunk_threshold_mb: u64,
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_mb() -> usize {
    1024
}

fn default_db_path() -> String {
    "data/clipvault.db".to_string()
}

fn default_provider() -> ProviderType {
    ProviderType::Local
}

fn default_local_path() -> String {
    "data/uploads".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8000/uploads".to_string()
}

fn default_cloudinary_api_base() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_chunk_threshold_mb() -> u64 {
    100
}

fn default_chunk_size_mb() -> u64 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
            spool_dir: String::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            local_path: default_local_path(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base_url: default_cloudinary_api_base(),
            chunk_threshold_mb: default_chunk_threshold_mb(),
            chunk_size_mb: default_chunk_size_mb(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.validate()?;
        config.ensure_directories()?;
        tracing::info!(
            "Storage config: provider={}, local_path={}",
            config.storage.provider.as_str(),
            config.storage.local_path
        );
        Ok(config)
    }

    /// Load configuration from conf.ini or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["conf.ini", "config.toml", "data/conf.ini", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: CV_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("CV_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("CV_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("CV_CONF_SERVER_MAX_UPLOAD_MB") {
            if let Ok(mb) = val.parse() {
                self.server.max_upload_mb = mb;
            }
        }
        if let Ok(val) = env::var("CV_CONF_SERVER_SPOOL_DIR") {
            self.server.spool_dir = val;
        }

        // Database overrides
        if let Ok(val) = env::var("CV_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Storage overrides
        if let Ok(val) = env::var("CV_CONF_STORAGE_PROVIDER") {
            match ProviderType::from_str(&val) {
                Some(provider) => self.storage.provider = provider,
                None => tracing::warn!("Ignoring unknown storage provider {:?}", val),
            }
        }
        if let Ok(val) = env::var("CV_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("CV_CONF_STORAGE_PUBLIC_BASE_URL") {
            self.storage.public_base_url = val;
        }

        // Cloudinary overrides
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_CLOUD_NAME") {
            self.cloudinary.cloud_name = val;
        }
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_API_KEY") {
            self.cloudinary.api_key = val;
        }
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_API_SECRET") {
            self.cloudinary.api_secret = val;
        }
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_API_BASE_URL") {
            if !val.trim().is_empty() {
                self.cloudinary.api_base_url = val;
            }
        }
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_CHUNK_THRESHOLD_MB") {
            if let Ok(mb) = val.parse() {
                self.cloudinary.chunk_threshold_mb = mb;
            }
        }
        if let Ok(val) = env::var("CV_CONF_CLOUDINARY_CHUNK_SIZE_MB") {
            if let Ok(mb) = val.parse() {
                self.cloudinary.chunk_size_mb = mb;
            }
        }
    }

    /// Reject provider selections that cannot work
    fn validate(&self) -> anyhow::Result<()> {
        if self.storage.provider == ProviderType::Cloudinary {
            let c = &self.cloudinary;
            if c.cloud_name.is_empty() || c.api_key.is_empty() || c.api_secret.is_empty() {
                anyhow::bail!(
                    "cloudinary provider requires cloud_name, api_key and api_secret"
                );
            }
            // Cloudinary rejects non-final chunks under 5 MB
            if c.chunk_size_mb < 5 {
                anyhow::bail!("cloudinary.chunk_size_mb must be at least 5");
            }
        }
        Ok(())
    }

    /// Directory multipart uploads are spooled to
    pub fn spool_dir(&self) -> PathBuf {
        if self.server.spool_dir.trim().is_empty() {
            env::temp_dir()
        } else {
            PathBuf::from(&self.server.spool_dir)
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        fs::create_dir_all(self.spool_dir())?;

        if let Some(parent) = Path::new(&self.database.path).parent() {
            fs::create_dir_all(parent)?;
        }

        if self.storage.provider == ProviderType::Local {
            fs::create_dir_all(&self.storage.local_path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_local_storage() {
        let config = Config::default();
        assert_eq!(config.storage.provider, ProviderType::Local);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, "data/clipvault.db");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            provider = "cloudinary"

            [cloudinary]
            cloud_name = "demo"
            api_key = "key"
            api_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.provider, ProviderType::Cloudinary);
        assert_eq!(config.storage.local_path, "data/uploads");
        assert_eq!(config.cloudinary.api_base_url, "https://api.cloudinary.com/v1_1");
        assert_eq!(config.server.max_upload_mb, 1024);
        assert_eq!(config.cloudinary.chunk_threshold_mb, 100);
        assert_eq!(config.cloudinary.chunk_size_mb, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_spool_dir_falls_back_to_temp_dir() {
        let mut config = Config::default();
        assert_eq!(config.spool_dir(), env::temp_dir());

        config.server.spool_dir = "data/spool".to_string();
        assert_eq!(config.spool_dir(), PathBuf::from("data/spool"));
    }

    #[test]
    fn test_cloudinary_without_credentials_is_rejected() {
        let mut config = Config::default();
        config.storage.provider = ProviderType::Cloudinary;
        assert!(config.validate().is_err());
    }
}
