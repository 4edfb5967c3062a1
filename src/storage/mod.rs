//! Object storage for uploaded media, contract files, signature images and
//! EPK template previews.

use axum::body::Bytes;
use axum::http::Method;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use futures::stream::BoxStream;
use object_store::{ObjectStore, PutPayload};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::{self, StorageBackend, StorageConfig};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file data: {0}")]
    InvalidData(String),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage misconfigured: {0}")]
    Config(String),
    #[error(transparent)]
    Backend(#[from] object_store::Error),
}

/// Result of storing one object
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    /// hex sha256
    pub checksum: String,
}

/// An object opened for streaming back to a client
pub struct ObjectStream {
    pub size: u64,
    pub content_type: &'static str,
    pub body: BoxStream<'static, object_store::Result<Bytes>>,
}

/// Decoded `data:` URL or bare base64 payload
#[derive(Debug, Clone)]
pub struct DecodedData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct MediaStorage {
    store: Arc<dyn ObjectStore>,
    /// Set for S3 so reads can use presigned URLs
    s3: Option<Arc<AmazonS3>>,
    public_base_url: String,
    signed_url_expiry: Duration,
}

impl MediaStorage {
    pub fn from_config() -> Result<Self, StorageError> {
        let storage = &config::config().storage;
        match storage.backend {
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::Local => {
                std::fs::create_dir_all(&storage.local_root)
                    .map_err(|e| StorageError::Config(format!("cannot create {}: {}", storage.local_root, e)))?;
                let store = LocalFileSystem::new_with_prefix(&storage.local_root)?;
                Ok(Self::with_store(Arc::new(store), None, storage))
            }
            StorageBackend::S3 => {
                let bucket = storage
                    .bucket
                    .as_deref()
                    .ok_or_else(|| StorageError::Config("AWS_BUCKET_NAME is not set".to_string()))?;
                // Credentials come from the standard AWS_* environment variables
                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(&storage.region);
                if let Some(endpoint) = &storage.endpoint {
                    builder = builder.with_endpoint(endpoint).with_virtual_hosted_style_request(false);
                }
                let s3 = Arc::new(builder.build()?);
                Ok(Self::with_store(s3.clone(), Some(s3), storage))
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemory::new()), None, &config::config().storage)
    }

    fn with_store(store: Arc<dyn ObjectStore>, s3: Option<Arc<AmazonS3>>, storage: &StorageConfig) -> Self {
        Self {
            store,
            s3,
            public_base_url: storage.public_base_url.clone(),
            signed_url_expiry: Duration::from_secs(storage.signed_url_expiry_secs),
        }
    }

    /// `{area}/{owner}/{uuid}-{sanitised name}`
    pub fn object_key(area: &str, owner: Uuid, file_name: &str) -> String {
        format!("{}/{}/{}-{}", area, owner, Uuid::new_v4(), sanitize_file_name(file_name))
    }

    pub async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError> {
        let size = bytes.len() as u64;
        let checksum = hex_digest(&bytes);
        self.store.put(&ObjectPath::from(key), PutPayload::from(bytes)).await?;
        Ok(StoredObject { key: key.to_string(), size, checksum })
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let result = self.store.get(&ObjectPath::from(key)).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::Backend(other),
        })?;
        Ok(result.bytes().await?.to_vec())
    }

    /// Opens a client-supplied key. Keys with empty, `.` or `..` segments are treated as missing.
    pub async fn open(&self, key: &str) -> Result<ObjectStream, StorageError> {
        let path = ObjectPath::parse(key).map_err(|_| StorageError::NotFound(key.to_string()))?;
        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::Backend(other),
        })?;
        Ok(ObjectStream {
            size: result.meta.size,
            content_type: content_type_for(key),
            body: result.into_stream(),
        })
    }

    /// Deleting a missing object is not an error
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.store.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort delete used when a record is removed
    pub async fn delete_quietly(&self, key: &str) {
        if let Err(e) = self.delete(key).await {
            warn!(key, error = %e, "Failed to delete stored object");
        }
    }

    /// Presigned GET URL on S3, otherwise `{public_base_url}/{key}`
    pub async fn url(&self, key: &str) -> String {
        if let Some(s3) = &self.s3 {
            match s3.signed_url(Method::GET, &ObjectPath::from(key), self.signed_url_expiry).await {
                Ok(url) => return url.to_string(),
                Err(e) => warn!(key, error = %e, "Failed to presign URL"),
            }
        }
        format!("{}/{}", self.public_base_url, key)
    }
}

pub fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{:02x}", b)).collect()
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}

/// Accepts `data:<mime>;base64,<payload>` or bare base64 (assumed PNG)
pub fn decode_data_url(input: &str) -> Result<DecodedData, StorageError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(StorageError::InvalidData("empty image data".to_string()));
    }

    let (mime_type, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| StorageError::InvalidData("malformed data URL".to_string()))?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or_else(|| StorageError::InvalidData("data URL must be base64 encoded".to_string()))?;
            (if mime.is_empty() { "application/octet-stream" } else { mime }, payload)
        }
        None => ("image/png", input),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| StorageError::InvalidData(format!("invalid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(StorageError::InvalidData("empty image data".to_string()));
    }
    Ok(DecodedData { mime_type: mime_type.to_string(), bytes })
}

/// File extension for the image types we accept as data URLs
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/gif" => "gif",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}

/// Content type served for a stored key, from its file extension
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_data_urls_and_bare_base64() {
        let decoded = decode_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.mime_type, "image/jpeg");
        assert_eq!(decoded.bytes, b"hello");

        let bare = decode_data_url("aGVsbG8=").unwrap();
        assert_eq!(bare.mime_type, "image/png");

        assert!(decode_data_url("data:image/png,plain").is_err());
        assert!(decode_data_url("%%%").is_err());
        assert!(decode_data_url("").is_err());
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("Call Sheet (final).pdf"), "Call_Sheet__final_.pdf");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            hex_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn memory_roundtrip_and_public_urls() {
        let storage = MediaStorage::in_memory();
        let owner = Uuid::new_v4();
        let key = MediaStorage::object_key("media", owner, "still.png");
        assert!(key.starts_with(&format!("media/{}/", owner)));
        assert!(key.ends_with("-still.png"));

        let stored = storage.put(&key, b"pixels".to_vec()).await.unwrap();
        assert_eq!(stored.size, 6);
        assert_eq!(storage.get(&key).await.unwrap(), b"pixels");
        assert!(storage.url(&key).await.ends_with(&key));

        let opened = storage.open(&key).await.unwrap();
        assert_eq!(opened.size, 6);
        assert_eq!(opened.content_type, "image/png");
        assert!(matches!(storage.open("media/../secret").await, Err(StorageError::NotFound(_))));

        storage.delete(&key).await.unwrap();
        storage.delete(&key).await.unwrap();
        assert!(matches!(storage.get(&key).await, Err(StorageError::NotFound(_))));
    }
}
