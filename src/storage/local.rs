use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::{error::StorageError, storage::ObjectStore};

/// Stores objects as files below a root directory, one file per key.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Creates the root directory if needed.
    pub async fn open(root: PathBuf) -> Result<Self, StorageError> {
        async_fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// File path for `key`; keys may not leave the root.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid object key '{}'", key),
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        async_fs::write(&path, body).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
