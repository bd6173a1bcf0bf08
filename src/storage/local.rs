//! Directory-backed store: `bucket/key` is the file `<root>/<bucket>/<key>`.

use super::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// [`ObjectStore`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/key`, refusing anything that would escape the root.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || key.is_empty() {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StorageError> {
        let src = self.object_path(bucket, key)?;
        match tokio::fs::copy(&src, dest).await {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        store
            .upload("public", "certificates/jpg/a.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert!(root.path().join("public/certificates/jpg/a.jpg").exists());

        let dest = root.path().join("copy.jpg");
        let n = store
            .download("public", "certificates/jpg/a.jpg", &dest)
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let err = store
            .download("public", "nope.pptx", &root.path().join("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn traversal_is_refused() {
        let store = LocalStore::new("/srv/objects");
        assert!(store.object_path("public", "../etc/passwd").is_err());
        assert!(store.object_path("public", "/abs").is_err());
        assert_eq!(
            store.object_path("public", "a/b.pptx").unwrap(),
            PathBuf::from("/srv/objects/public/a/b.pptx")
        );
    }
}
