pub mod cloudinary;
pub mod local;
pub mod provider;

pub use cloudinary::CloudinaryStorage;
pub use local::*;
pub use provider::*;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::models::ProviderType;

/// Storage manager holding the configured upload provider
pub struct StorageManager {
    provider: Arc<dyn StorageProvider>,
}

impl StorageManager {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Build the provider selected by `storage.provider`
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Arc<dyn StorageProvider> = match config.storage.provider {
            ProviderType::Local => Arc::new(LocalStorage::new(
                &config.storage.local_path,
                &config.storage.public_base_url,
            )),
            ProviderType::Cloudinary => {
                Arc::new(CloudinaryStorage::new(config.cloudinary.clone())?)
            }
        };

        tracing::info!("Using {} storage provider", provider.storage_type());
        Ok(Self::new(provider))
    }

    pub fn provider(&self) -> &dyn StorageProvider {
        self.provider.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_local_provider() {
        let manager = StorageManager::from_config(&Config::default()).unwrap();
        assert_eq!(manager.provider().storage_type(), "local");
    }
}
