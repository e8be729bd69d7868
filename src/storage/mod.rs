//! Object Storage & Signed URL Issuance
//!
//! The engine never serves documents itself. Carriers that fetch documents
//! over HTTP get a pre-authorized URL against an external S3-compatible
//! store; the URL alone is the credential.

pub mod presign;
pub mod s3;

pub use presign::{Presigner, SignedUrl};
pub use s3::S3Store;

use async_trait::async_trait;
use thiserror::Error;

/// URL issuance failures. Producing a malformed URL is never an option;
/// anything that would be one surfaces here instead.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Object store configuration unusable: {0}")]
    Config(String),

    #[error("Requested ttl out of range: {0}s")]
    InvalidTtl(i64),

    #[error("Constructed URL failed verification: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// Network-level failure or timeout; safe to retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store processed and refused the upload
    #[error("Object store refused the upload (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),
}

/// Interface over the external object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload one object. Exactly one store call; no internal retry.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Issue a pre-authorized GET URL valid for `ttl` from now
    async fn grant_get(&self, key: &str, ttl: chrono::Duration)
    -> Result<SignedUrl, SigningError>;
}

/// Mock store for adapter tests
#[cfg(test)]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    pub struct MockObjectStore {
        /// (key, byte length, content type) per upload, in order
        puts: Mutex<Vec<(String, usize, String)>>,
        grant_count: AtomicUsize,
        fail_put: Mutex<bool>,
    }

    impl MockObjectStore {
        pub fn new() -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
                grant_count: AtomicUsize::new(0),
                fail_put: Mutex::new(false),
            }
        }

        pub fn set_fail_put(&self, fail: bool) {
            *self.fail_put.lock().unwrap() = fail;
        }

        pub fn puts(&self) -> Vec<(String, usize, String)> {
            self.puts.lock().unwrap().clone()
        }

        pub fn grant_count(&self) -> usize {
            self.grant_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ObjectStore for MockObjectStore {
        async fn put(
            &self,
            key: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<(), StorageError> {
            if *self.fail_put.lock().unwrap() {
                return Err(StorageError::Transport("mock upload failure".to_string()));
            }
            self.puts.lock().unwrap().push((
                key.to_string(),
                bytes.len(),
                content_type.to_string(),
            ));
            Ok(())
        }

        async fn grant_get(
            &self,
            key: &str,
            ttl: chrono::Duration,
        ) -> Result<SignedUrl, SigningError> {
            self.grant_count.fetch_add(1, Ordering::SeqCst);
            let url = Url::parse(&format!(
                "https://mock-bucket.store.example.com/{}?X-Amz-Signature=deadbeef",
                key
            ))
            .map_err(|e| SigningError::Malformed(e.to_string()))?;
            Ok(SignedUrl {
                url,
                key: key.to_string(),
                expires_at: Utc::now() + ttl,
            })
        }
    }
}

#[cfg(test)]
pub use mock::MockObjectStore;
