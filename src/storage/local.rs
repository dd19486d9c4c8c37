use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::StorageProvider;

/// Local file system storage provider
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Fresh object key: {yyyy}/{mm}/{uuid}[.ext]
    fn object_key(local_path: &Path) -> String {
        let now = Utc::now();
        let id = Uuid::new_v4();
        match local_path.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => {
                format!("{}/{}.{}", now.format("%Y/%m"), id, ext.to_lowercase())
            }
            _ => format!("{}/{}", now.format("%Y/%m"), id),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let key = Self::object_key(local_path);
        let full_path = self.base_path.join(&key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Upload(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        fs::copy(local_path, &full_path).await.map_err(|e| {
            AppError::Upload(format!("Failed to copy {:?} to {:?}: {}", local_path, full_path, e))
        })?;

        tracing::debug!("Copied file from {:?} to {:?}", local_path, full_path);
        Ok(self.public_url(&key))
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
