//! Blob storage backend for uploaded video payloads
//!
//! Either a local directory (LOCAL_STORAGE_PATH) or a GCS bucket. The catalog
//! stores the object key produced here verbatim; deletion and URL derivation
//! both start from that key, never from a parsed-apart display URL.

use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::STORAGE_TRANSFER_TIMEOUT_SECS;

#[derive(Debug)]
pub enum StorageError {
    /// Backend unreachable or rejected the transfer
    Unavailable(String),
    /// Transfer exceeded the allowed window
    Timeout,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable(m) => write!(f, "storage unavailable: {}", m),
            StorageError::Timeout => write!(f, "storage transfer timed out"),
        }
    }
}

pub enum BlobStore {
    Local {
        root: PathBuf,
    },
    Gcs {
        client: google_cloud_storage::client::Storage,
        bucket: String,
    },
}

impl BlobStore {
    /// Transfer a payload to durable storage under the given object key.
    /// Awaited to completion; either the object is fully stored or this
    /// returns an error and the caller runs the cleanup path.
    pub async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let transfer = self.put_inner(key, data);
        match tokio::time::timeout(Duration::from_secs(STORAGE_TRANSFER_TIMEOUT_SECS), transfer)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout),
        }
    }

    async fn put_inner(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        match self {
            BlobStore::Local { root } => {
                let full_path = root.join(key);
                if let Some(parent) = full_path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StorageError::Unavailable(e.to_string()))?;
                }
                tokio::fs::write(&full_path, &data)
                    .await
                    .map_err(|e| StorageError::Unavailable(e.to_string()))
            }
            BlobStore::Gcs { client, bucket } => {
                let bucket_path = format!("projects/_/buckets/{}", bucket);
                client
                    .write_object(&bucket_path, key, data)
                    .send_buffered()
                    .await
                    .map(|_| ())
                    .map_err(|e| StorageError::Unavailable(e.to_string()))
            }
        }
    }

    /// Release the object behind a key. Callers treat failures as
    /// best-effort hygiene and log them.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            BlobStore::Local { root } => {
                let full_path = root.join(key);
                match tokio::fs::remove_file(&full_path).await {
                    Ok(()) => Ok(()),
                    // Already gone counts as released
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(StorageError::Unavailable(e.to_string())),
                }
            }
            BlobStore::Gcs { bucket, .. } => {
                let client = cloud_storage::Client::default();
                client
                    .object()
                    .delete(bucket, key)
                    .await
                    .map_err(|e| StorageError::Unavailable(e.to_string()))
            }
        }
    }

    /// Derive the URL a browser can fetch the object from. The key itself is
    /// the durable reference; this is display-only.
    pub fn media_url(&self, key: &str) -> String {
        match self {
            BlobStore::Local { .. } => format!("/media/{}", key),
            BlobStore::Gcs { bucket, .. } => {
                format!("https://storage.googleapis.com/{}/{}", bucket, key)
            }
        }
    }

    pub fn local_root(&self) -> Option<&PathBuf> {
        match self {
            BlobStore::Local { root } => Some(root),
            BlobStore::Gcs { .. } => None,
        }
    }
}
