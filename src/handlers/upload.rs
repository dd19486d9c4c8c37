use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Multipart form with file parts spooled to temp files.
/// Call `cleanup` once the request is done with the files.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, PathBuf>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain a multipart body. Parts named in `file_fields` are streamed to
    /// files under `spool_dir`; every other part is read as text.
    pub async fn read(
        mut multipart: Multipart,
        file_fields: &[&str],
        spool_dir: &Path,
    ) -> Result<Self> {
        let mut form = Self::default();
        match form.fill(&mut multipart, file_fields, spool_dir).await {
            Ok(()) => Ok(form),
            Err(e) => {
                form.cleanup().await;
                Err(e)
            }
        }
    }

    async fn fill(
        &mut self,
        multipart: &mut Multipart,
        file_fields: &[&str],
        spool_dir: &Path,
    ) -> Result<()> {
        while let Some(mut field) = multipart.next_field().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to process multipart: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            if file_fields.contains(&name.as_str()) {
                let ext = field
                    .file_name()
                    .and_then(|n| Path::new(n).extension())
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                let temp_path =
                    spool_dir.join(format!("clipvault_upload_{}{}", Uuid::new_v4(), ext));

                // Track before writing so a failed write is still cleaned up
                if let Some(previous) = self.files.insert(name.clone(), temp_path.clone()) {
                    remove_temp(&previous).await;
                }

                let mut file = tokio::fs::File::create(&temp_path).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create temp file: {}", e))
                })?;

                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file chunk: {}", e))
                })? {
                    file.write_all(&chunk).await.map_err(|e| {
                        AppError::Internal(format!("Failed to write to temp file: {}", e))
                    })?;
                }

                file.flush().await.map_err(|e| {
                    AppError::Internal(format!("Failed to flush temp file: {}", e))
                })?;
            } else if !name.is_empty() {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read field {}: {}", name, e))
                })?;
                self.fields.insert(name, text);
            }
        }

        Ok(())
    }

    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    pub fn require_file(&self, name: &str) -> Result<&Path> {
        self.file(name)
            .ok_or_else(|| AppError::BadRequest(format!("No {} provided", name)))
    }

    /// Text field, blank values treated as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|s| {
                s.parse::<T>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", name, s)))
            })
            .transpose()
    }

    /// Remove every spooled temp file
    pub async fn cleanup(self) {
        for path in self.files.values() {
            remove_temp(path).await;
        }
    }
}

async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!("Failed to remove temp file {:?}: {}", path, e);
        }
    }
}
