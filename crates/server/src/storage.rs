//! Filesystem-backed media store with bucket semantics.
//!
//! Uploaded objects live under a single directory served publicly at
//! `/media`. Keys are `<upload-unix-millis>-<sanitized-filename>` so
//! concurrent uploads of the same file never collide.
//!
//! Removal is idempotent: the record row is the source of truth, so
//! removing an object that is already gone succeeds. A crash between
//! steps can leave an orphaned file but never a dangling `image_url`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during media store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Object key failed validation (empty, path traversal, separators).
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Object does not exist in the store.
    #[error("object not found: {0}")]
    NotFound(String),
}

/// A stored object: its key within the store and its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
}

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    /// Public prefix for object URLs, e.g. `http://localhost:3000/media`.
    public_base: String,
}

impl MediaStore {
    /// Create a media store rooted at `root`, publishing objects under
    /// `<base_url>/media`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base: format!("{}/media", base_url.trim_end_matches('/')),
        }
    }

    /// Directory the objects are stored in (mounted via `ServeDir`).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upload bytes under a collision-free key derived from the original
    /// filename and return the stored object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the filename sanitizes to
    /// nothing, or `StorageError::Io` if the write fails.
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, StorageError> {
        let key = object_key(chrono::Utc::now().timestamp_millis(), original_name)?;

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&key), bytes).await?;

        let public_url = self.public_url(&key);
        tracing::debug!(key = %key, "uploaded media object");

        Ok(StoredObject { key, public_url })
    }

    /// Remove an object. Removing a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` for malformed keys, or
    /// `StorageError::Io` for filesystem failures other than not-found.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Read an object's bytes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;

        match tokio::fs::read(self.root.join(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Public URL for an object key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    /// Recover the object key from a public URL, if the URL points into
    /// this store.
    #[must_use]
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let (_, key) = url.split_once("/media/")?;
        validate_key(key).ok()?;
        Some(key.to_string())
    }
}

/// Build an object key from an upload timestamp and the original filename.
fn object_key(timestamp_millis: i64, original_name: &str) -> Result<String, StorageError> {
    let name = sanitize_file_name(original_name);
    if name.is_empty() {
        return Err(StorageError::InvalidKey(format!(
            "filename {original_name:?} sanitizes to nothing"
        )));
    }
    Ok(format!("{timestamp_millis}-{name}"))
}

/// Keep `[A-Za-z0-9._-]`, map everything else to `_`, and strip leading
/// dots so a key can never start a traversal.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Reject keys that are empty or escape the store directory.
fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store() -> MediaStore {
        let root = std::env::temp_dir().join(format!(
            "darshan-media-test-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        MediaStore::new(root, "http://localhost:3000")
    }

    #[test]
    fn test_object_key_format() {
        let key = object_key(1_700_000_000_123, "photo.jpg").unwrap();
        assert_eq!(key, "1700000000123-photo.jpg");
    }

    #[test]
    fn test_sanitize_replaces_odd_characters() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("däršan.png"), "d_r_an.png");
    }

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_file_name("..hidden.png"), "hidden.png");
    }

    #[test]
    fn test_object_key_rejects_empty_name() {
        assert!(object_key(1, "...").is_err());
        assert!(object_key(1, "").is_err());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b.png").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("1700000000123-photo.jpg").is_ok());
    }

    #[test]
    fn test_public_url_and_key_roundtrip() {
        let store = MediaStore::new("media", "http://localhost:3000/");
        let url = store.public_url("1-a.jpg");
        assert_eq!(url, "http://localhost:3000/media/1-a.jpg");
        assert_eq!(store.key_from_url(&url).unwrap(), "1-a.jpg");
    }

    #[test]
    fn test_key_from_url_rejects_foreign_urls() {
        let store = MediaStore::new("media", "http://localhost:3000");
        assert!(store.key_from_url("https://elsewhere.example.com/img.jpg").is_none());
        assert!(store.key_from_url("http://localhost:3000/media/../x").is_none());
    }

    #[tokio::test]
    async fn test_upload_read_remove_cycle() {
        let store = temp_store();

        let object = store.upload("photo.jpg", b"bytes").await.unwrap();
        assert!(object.key.ends_with("-photo.jpg"));
        assert_eq!(object.public_url, store.public_url(&object.key));

        let bytes = store.read(&object.key).await.unwrap();
        assert_eq!(bytes, b"bytes");

        store.remove(&object.key).await.unwrap();
        assert!(matches!(
            store.read(&object.key).await,
            Err(StorageError::NotFound(_))
        ));

        // Idempotent: removing again still succeeds
        store.remove(&object.key).await.unwrap();

        tokio::fs::remove_dir_all(store.root()).await.unwrap();
    }
}
