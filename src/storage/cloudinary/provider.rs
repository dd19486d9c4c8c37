use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::signer::Signer;
use crate::config::CloudinaryConfig;
use crate::error::{AppError, Result};
use crate::storage::StorageProvider;

const MIB: u64 = 1024 * 1024;
const STREAM_BUFFER: usize = 64 * 1024;

/// Body returned by the upload endpoint, on success or failure.
/// Intermediate chunk responses carry no URL.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signed fields shared by every request of one upload
struct SignedParams {
    timestamp: String,
    signature: String,
}

/// Cloudinary storage provider
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    http: reqwest::Client,
    chunk_threshold: u64,
    chunk_size: u64,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let chunk_threshold = config.chunk_threshold_mb.saturating_mul(MIB);
        let chunk_size = config.chunk_size_mb.saturating_mul(MIB).max(MIB);

        Ok(Self {
            config,
            http,
            chunk_threshold,
            chunk_size,
        })
    }

    /// Resource type `auto` lets the service detect video vs image
    fn upload_url(&self) -> String {
        format!(
            "{}/{}/auto/upload",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    fn sign(&self) -> SignedParams {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = Signer::new()
            .param("timestamp", timestamp.clone())
            .sign(&self.config.api_secret);

        SignedParams {
            timestamp,
            signature,
        }
    }

    /// Stream `len` bytes of the file starting at `offset`
    async fn file_part(local_path: &Path, offset: u64, len: u64) -> Result<Part> {
        let mut file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| AppError::Upload(format!("Failed to open {:?}: {}", local_path, e)))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| AppError::Upload(format!("Failed to seek {:?}: {}", local_path, e)))?;
        }

        let stream = ReaderStream::with_capacity(file.take(len), STREAM_BUFFER);

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime_type = mime_guess::from_path(local_path).first_or_octet_stream();

        Part::stream_with_length(Body::wrap_stream(stream), len)
            .file_name(file_name)
            .mime_str(mime_type.as_ref())
            .map_err(|e| AppError::Upload(format!("Invalid content type: {}", e)))
    }

    fn form(&self, part: Part, params: &SignedParams) -> Form {
        Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", params.timestamp.clone())
            .text("signature", params.signature.clone())
    }

    /// Send one request; `chunk` carries the upload id and byte range
    async fn send(&self, form: Form, chunk: Option<(&str, String)>) -> Result<UploadResponse> {
        let mut request = self.http.post(self.upload_url()).multipart(form);
        if let Some((upload_id, range)) = chunk {
            request = request
                .header("X-Unique-Upload-Id", upload_id)
                .header(reqwest::header::CONTENT_RANGE, range);
        }

        let res = request
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Cloudinary request failed: {}", e)))?;

        let status = res.status();
        let body: UploadResponse = res.json().await.map_err(|e| {
            AppError::Upload(format!("Unreadable Cloudinary response ({}): {}", status, e))
        })?;

        if !status.is_success() {
            let message = body
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "no error message".to_string());
            return Err(AppError::Upload(format!(
                "Cloudinary upload failed: [{}] {}",
                status, message
            )));
        }

        Ok(body)
    }

    /// Large files go up in ranges sharing one upload id; the last response
    /// describes the assembled asset
    async fn upload_chunked(&self, local_path: &Path, size: u64) -> Result<UploadResponse> {
        let upload_id = Uuid::new_v4().simple().to_string();
        let params = self.sign();
        let mut offset = 0;
        let mut last = None;

        tracing::info!(
            "Using chunked upload for {:?} ({} bytes, id {})",
            local_path,
            size,
            upload_id
        );

        while offset < size {
            let len = self.chunk_size.min(size - offset);
            let range = format!("bytes {}-{}/{}", offset, offset + len - 1, size);
            let part = Self::file_part(local_path, offset, len).await?;

            tracing::debug!("Uploading chunk {} of {}", range, upload_id);
            let form = self.form(part, &params);
            last = Some(self.send(form, Some((upload_id.as_str(), range))).await?);
            offset += len;
        }

        last.ok_or_else(|| AppError::Upload("Nothing to upload".to_string()))
    }
}

#[async_trait]
impl StorageProvider for CloudinaryStorage {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read {:?}: {}", local_path, e)))?
            .len();

        tracing::info!("Uploading {:?} to Cloudinary", local_path);

        let body = if size > self.chunk_threshold {
            self.upload_chunked(local_path, size).await?
        } else {
            let part = Self::file_part(local_path, 0, size).await?;
            self.send(self.form(part, &self.sign()), None).await?
        };

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| AppError::Upload("Cloudinary response carried no URL".to_string()))?;

        tracing::info!("Successfully uploaded to Cloudinary: {}", url);
        Ok(url)
    }

    fn storage_type(&self) -> &'static str {
        "cloudinary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Path as UrlPath, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// One request as seen by the fake API
    #[derive(Debug, Clone)]
    struct Received {
        fields: HashMap<String, Vec<u8>>,
        upload_id: Option<String>,
        range: Option<String>,
    }

    type Captured = Arc<Mutex<Vec<Received>>>;

    fn header(headers: &HeaderMap, name: &str) -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn fake_upload(
        State(captured): State<Captured>,
        UrlPath(cloud): UrlPath<String>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or("").to_string();
            let bytes = field.bytes().await.unwrap();
            fields.insert(name, bytes.to_vec());
        }

        let timestamp = String::from_utf8(fields["timestamp"].clone()).unwrap();
        let signature = String::from_utf8(fields["signature"].clone()).unwrap();
        let expected = Signer::new().param("timestamp", timestamp).sign("shh");

        let range = header(&headers, "content-range");
        captured.lock().unwrap().push(Received {
            fields,
            upload_id: header(&headers, "x-unique-upload-id"),
            range: range.clone(),
        });

        if signature != expected {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "message": "Invalid Signature" } })),
            );
        }

        // "bytes start-end/total": only the final range completes the asset
        let pending = range.and_then(|r| {
            let (span, total) = r.trim_start_matches("bytes ").split_once('/')?;
            let end: u64 = span.split_once('-')?.1.parse().ok()?;
            let total: u64 = total.parse().ok()?;
            Some(end + 1 < total)
        });
        if pending == Some(true) {
            return (StatusCode::OK, Json(json!({ "done": false })));
        }

        (
            StatusCode::OK,
            Json(json!({ "secure_url": format!("https://res.test/{}/clip.mp4", cloud) })),
        )
    }

    async fn spawn_fake_api(captured: Captured) -> String {
        let app = Router::new()
            .route("/:cloud/auto/upload", post(fake_upload))
            .with_state(captured);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(api_base_url: String, api_secret: &str) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key-123".to_string(),
            api_secret: api_secret.to_string(),
            api_base_url,
            chunk_threshold_mb: 100,
            chunk_size_mb: 20,
        }
    }

    #[tokio::test]
    async fn test_signed_upload_returns_secure_url() {
        let captured = Captured::default();
        let base = spawn_fake_api(captured.clone()).await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"moving pictures").unwrap();

        let storage = CloudinaryStorage::new(config(base, "shh")).unwrap();
        let url = storage.upload(&file).await.unwrap();

        assert_eq!(url, "https://res.test/demo/clip.mp4");
        let received = captured.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].fields["file"], b"moving pictures");
        assert_eq!(received[0].fields["api_key"], b"key-123");
        assert_eq!(received[0].range, None);
    }

    #[tokio::test]
    async fn test_large_file_is_uploaded_in_ranges() {
        let captured = Captured::default();
        let base = spawn_fake_api(captured.clone()).await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("long.mp4");
        let size = 2 * MIB as usize + 512 * 1024;
        let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file, &content).unwrap();

        let mut cfg = config(base, "shh");
        cfg.chunk_threshold_mb = 1;
        cfg.chunk_size_mb = 1;
        let storage = CloudinaryStorage::new(cfg).unwrap();
        let url = storage.upload(&file).await.unwrap();

        assert_eq!(url, "https://res.test/demo/clip.mp4");
        let received = captured.lock().unwrap();
        let ranges: Vec<_> = received.iter().map(|r| r.range.clone().unwrap()).collect();
        assert_eq!(
            ranges,
            vec![
                "bytes 0-1048575/2621440",
                "bytes 1048576-2097151/2621440",
                "bytes 2097152-2621439/2621440",
            ]
        );

        let upload_id = received[0].upload_id.clone().unwrap();
        assert!(received.iter().all(|r| r.upload_id.as_deref() == Some(upload_id.as_str())));

        let reassembled: Vec<u8> = received
            .iter()
            .flat_map(|r| r.fields["file"].iter().copied())
            .collect();
        assert_eq!(reassembled, content);
    }

    #[tokio::test]
    async fn test_rejected_upload_is_upload_error() {
        let captured = Captured::default();
        let base = spawn_fake_api(captured).await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("thumb.png");
        std::fs::write(&file, b"pixels").unwrap();

        let storage = CloudinaryStorage::new(config(base, "wrong")).unwrap();
        let err = storage.upload(&file).await.unwrap_err();

        match err {
            AppError::Upload(msg) => assert!(msg.contains("Invalid Signature")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_api_is_upload_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("thumb.png");
        std::fs::write(&file, b"pixels").unwrap();

        // Port 9 (discard) is never an HTTP endpoint in test environments
        let storage =
            CloudinaryStorage::new(config("http://127.0.0.1:9".to_string(), "shh")).unwrap();
        let err = storage.upload(&file).await.unwrap_err();

        assert!(matches!(err, AppError::Upload(_)));
    }
}
