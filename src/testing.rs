//! Shared test fixtures.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Barrier;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::ContentDigest;
use crate::storage::StorageProvider;

/// Fresh migrated database in its own temp directory
pub async fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = Database::new(path.to_str().unwrap()).await.unwrap();
    db.run_migrations().await.unwrap();
    (dir, db)
}

pub fn digest_of(bytes: &[u8]) -> ContentDigest {
    ContentDigest::from_bytes(&Sha256::digest(bytes))
}

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Storage provider that records every upload and hands out fake URLs
#[derive(Default)]
pub struct RecordingStorage {
    uploads: Mutex<Vec<PathBuf>>,
    failing: Mutex<HashSet<PathBuf>>,
    fail_all: AtomicBool,
    gate: Option<(Arc<Barrier>, HashSet<PathBuf>)>,
    seq: AtomicUsize,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads of `paths` block until all of them are in flight
    pub fn gated(paths: &[&Path]) -> Self {
        let set = paths.iter().map(|p| p.to_path_buf()).collect();
        Self {
            gate: Some((Arc::new(Barrier::new(paths.len())), set)),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, path: &Path) {
        self.failing.lock().unwrap().insert(path.to_path_buf());
    }

    /// Reject every upload, whatever the path
    pub fn fail_always(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageProvider for RecordingStorage {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        if let Some((barrier, paths)) = &self.gate {
            if paths.contains(local_path) {
                barrier.wait().await;
            }
        }

        self.uploads.lock().unwrap().push(local_path.to_path_buf());

        let failing = self.fail_all.load(Ordering::SeqCst)
            || self.failing.lock().unwrap().contains(local_path);
        if failing {
            return Err(AppError::Upload(format!("injected failure for {:?}", local_path)));
        }

        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://blobs.test/{}", n))
    }

    fn storage_type(&self) -> &'static str {
        "recording"
    }
}
