use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::Result;
use crate::models::ContentDigest;

const READ_CHUNK: usize = 64 * 1024;

/// Compute the content digest of a whole file.
///
/// Reads the file to the end in fixed-size chunks, so large media never sits
/// in memory. Fails with `AppError::Io` if the file cannot be opened or read.
pub async fn fingerprint(local_path: &Path) -> Result<ContentDigest> {
    let mut file = tokio::fs::File::open(local_path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = ContentDigest::from_bytes(&hasher.finalize());
    tracing::debug!("Fingerprinted {:?} -> {}", local_path, digest.short());
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        let digest = fingerprint(&path).await.unwrap();
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_deterministic_and_path_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("one.mp4");
        let b = dir.path().join("renamed-copy.bin");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let first = fingerprint(&a).await.unwrap();
        let again = fingerprint(&a).await.unwrap();
        let copy = fingerprint(&b).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(first, copy);
    }

    #[tokio::test]
    async fn test_distinct_content_distinct_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"frame-0001").unwrap();
        std::fs::write(&b, b"frame-0002").unwrap();

        assert_ne!(fingerprint(&a).await.unwrap(), fingerprint(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_past_first_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let mut content = vec![7u8; READ_CHUNK * 2 + 10];
        std::fs::write(&a, &content).unwrap();
        *content.last_mut().unwrap() = 8;
        std::fs::write(&b, &content).unwrap();

        assert_ne!(fingerprint(&a).await.unwrap(), fingerprint(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fingerprint(&dir.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
