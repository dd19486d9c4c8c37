use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Storage provider trait
///
/// Pushes a local file to durable blob storage. Implementations are not
/// idempotent: uploading the same file twice stores it twice. Content-level
/// idempotence comes from the asset registry around the call.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload a local file and return its public URL.
    /// Any storage or network failure surfaces as `AppError::Upload`.
    async fn upload(&self, local_path: &Path) -> Result<String>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
