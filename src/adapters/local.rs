use std::fmt;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;

use crate::identity::BackendKind;
use crate::{Error, Result, StorageAdapter};

/// The local filesystem adapter, the terminal fallback backend.
///
/// - Keys are *relative* object paths (e.g. `"2024/invoice.pdf"`).
/// - All objects live under a configured root directory.
/// - Keys are validated to prevent directory traversal (`..`) and absolute
///   paths.
///
/// `store` returns the object key: mapping keys to public URLs is the
/// embedder's concern.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("root", &self.root)
            .finish()
    }
}

impl LocalStorage {
    /// Create a new local storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Generic("key cannot be empty".into()));
        }

        let path = Path::new(key);

        if path.is_absolute() {
            return Err(Error::PermissionDenied(format!(
                "absolute paths are not allowed: {key}"
            )));
        }

        // Disallow traversal and tricky prefixes.
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    return Err(Error::PermissionDenied(format!(
                        "parent dir components ('..') are not allowed: {key}"
                    )));
                }
                Component::Prefix(_) => {
                    // Windows drive prefixes like C:\
                    return Err(Error::PermissionDenied(format!(
                        "path prefixes are not allowed: {key}"
                    )));
                }
                Component::RootDir => {
                    return Err(Error::PermissionDenied(format!(
                        "root dir component is not allowed: {key}"
                    )));
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }

        Ok(())
    }

    fn path_for_key(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.root.join(key))
    }

    async fn ensure_parent_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StorageAdapter for LocalStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<String> {
        let path = self.path_for_key(key)?;
        Self::ensure_parent_dir(&path).await?;

        // Write to a temp file then rename into place for a more atomic
        // update.
        let tmp_path = path.with_extension("tmp.berth");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        drop(file);

        // Best-effort replace.
        if tokio::fs::metadata(&path).await.is_ok() {
            let _ = tokio::fs::remove_file(&path).await;
        }
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        let path = self.path_for_key(key)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for_key(key)?;

        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for_key(key)?;

        match tokio::fs::metadata(path).await {
            Ok(md) => Ok(md.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
