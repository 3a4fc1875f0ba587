//! Object storage for uploaded files.
//!
//! Handlers validate an upload with [`validate_upload`], derive a
//! content-addressed key with [`object_key`] and hand the bytes to an
//! [`ObjectStorage`] implementation, which returns the public URL that is
//! stored on the row. [`LocalStorage`] writes below a directory that the
//! router also serves at `/files`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use crewline_core::hashing::sha256_hex;

/// Accepted image extensions (profile pictures).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Accepted document extensions (registration documents, HSE files,
/// receipts).
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which extension list an upload is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
}

impl UploadKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::Image => IMAGE_EXTENSIONS,
            UploadKind::Document => DOCUMENT_EXTENSIONS,
        }
    }
}

/// A file received in a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Stores bytes under a key and returns the object's public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<String, StorageError>;
}

/// Lower-cased extension of `filename`, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check size and extension. Returns the normalized extension.
pub fn validate_upload(file: &UploadedFile, kind: UploadKind, max_bytes: usize) -> Result<String, String> {
    if file.bytes.is_empty() {
        return Err("Uploaded file is empty".into());
    }
    if file.bytes.len() > max_bytes {
        return Err(format!(
            "File '{}' exceeds the maximum upload size of {max_bytes} bytes",
            file.filename
        ));
    }
    let allowed = kind.allowed_extensions();
    match extension_of(&file.filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(format!(
            "Unsupported file type for '{}'. Allowed: {}",
            file.filename,
            allowed.join(", ")
        )),
    }
}

/// `{prefix}/{sha256}.{ext}`: identical uploads map to the same object.
pub fn object_key(prefix: &str, bytes: &[u8], ext: &str) -> String {
    format!("{prefix}/{}.{ext}", sha256_hex(bytes))
}

/// Filesystem-backed storage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: Option<&str>) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, size = bytes.len(), "Stored object");
        Ok(format!("{}/{key}", self.public_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            filename: name.into(),
            content_type: None,
            bytes: vec![1; size],
        }
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Scan.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".png"), None);
    }

    #[test]
    fn image_uploads_reject_pdf() {
        assert!(validate_upload(&file("a.pdf", 10), UploadKind::Image, 100).is_err());
        assert_eq!(
            validate_upload(&file("a.WEBP", 10), UploadKind::Image, 100).unwrap(),
            "webp"
        );
    }

    #[test]
    fn document_uploads_reject_webp() {
        assert!(validate_upload(&file("a.webp", 10), UploadKind::Document, 100).is_err());
        assert!(validate_upload(&file("a.pdf", 10), UploadKind::Document, 100).is_ok());
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate_upload(&file("a.png", 100), UploadKind::Image, 100).is_ok());
        assert!(validate_upload(&file("a.png", 101), UploadKind::Image, 100).is_err());
        assert!(validate_upload(&file("a.png", 0), UploadKind::Image, 100).is_err());
    }

    #[test]
    fn keys_are_content_addressed() {
        let a = object_key("users", b"same", "png");
        let b = object_key("users", b"same", "png");
        assert_eq!(a, b);
        assert!(a.starts_with("users/"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, object_key("users", b"other", "png"));
    }

    #[tokio::test]
    async fn local_storage_writes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://files.test/");
        let url = storage.put("docs/x.pdf", b"%PDF", Some("application/pdf")).await.unwrap();

        assert_eq!(url, "http://files.test/docs/x.pdf");
        let written = tokio::fs::read(dir.path().join("docs/x.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF");
    }

    #[tokio::test]
    async fn local_storage_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://files.test");
        let err = storage.put("../escape.pdf", b"x", None).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
