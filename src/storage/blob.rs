//! Filesystem-backed blob store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::BlobStore;
use crate::error::BlobError;

/// Stores durable raw copies of uploads under a local directory.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, BlobError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Keep only the final path component so an uploaded filename cannot
    /// escape the blob directory.
    fn sanitize(name: &str) -> String {
        let base = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if base.is_empty() { "blob".to_string() } else { base }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError> {
        // Random prefix: repeated uploads of the same filename must not
        // overwrite each other
        let file_name = format!("{}-{}", Uuid::new_v4(), Self::sanitize(name));
        let path = self.dir.join(file_name);

        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().to_string())
    }

    async fn delete(&self, location: &str) -> Result<(), BlobError> {
        let path = PathBuf::from(location);
        if !path.starts_with(&self.dir) {
            return Err(BlobError::InvalidLocation(location.to_string()));
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let location = store.store("report.pdf", b"hello").await.unwrap();
        assert!(location.ends_with("report.pdf"));
        assert_eq!(std::fs::read(&location).unwrap(), b"hello");

        store.delete(&location).await.unwrap();
        assert!(!Path::new(&location).exists());

        // Deleting again is a no-op
        store.delete(&location).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_name_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let first = store.store("notes.txt", b"one").await.unwrap();
        let second = store.store("notes.txt", b"two").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_path_components_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let location = store.store("../../etc/passwd", b"x").await.unwrap();
        assert!(PathBuf::from(&location).starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_delete_outside_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        assert!(store.delete("/tmp/unrelated-file").await.is_err());
    }
}
