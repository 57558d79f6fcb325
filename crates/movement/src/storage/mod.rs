//! Object storage for uploaded application documents.

mod cloudinary;
mod local;

use bytes::Bytes;
use sha2::{Digest, Sha256};

pub use cloudinary::CloudinaryStorage;
pub use local::LocalDocumentStorage;

/// Document handed to a storage backend.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Logical folder, e.g. `applications/APP123456AB`.
    pub folder: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend rejected the request: {0}")]
    Backend(String),
    #[error("storage transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("document not found")]
    NotFound,
    #[error("document url is not recognised: {0}")]
    InvalidUrl(String),
}

/// Trait for document storage (allows different backends)
#[async_trait::async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn upload(&self, document: DocumentUpload) -> Result<StoredDocument, StorageError>;
    async fn fetch(&self, url: &str) -> Result<Bytes, StorageError>;
}

/// `<prefix>-<first 12 hex chars of sha256(prefix, original name, nanos)><ext>`.
pub fn secure_file_name(prefix: &str, original: &str, extension: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(original.as_bytes());
    hasher.update(nanos.to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{prefix}-{}{extension}", &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_file_name_keeps_prefix_and_extension() {
        let name = secure_file_name("APP123456AB", "My Budget.PDF", ".pdf");
        assert!(name.starts_with("APP123456AB-"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "APP123456AB-".len() + 12 + ".pdf".len());
        assert!(!name.contains(' '));
    }
}
