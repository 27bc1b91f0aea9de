//! Directory-backed secret store

use crate::{SecretPayload, SecretStore, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Serves each secret from a file under a root directory.
///
/// Identifier `team/db-pass` maps to `<root>/team/db-pass`. A missing file
/// is [`StoreError::NotFound`]. Identifiers that are absolute or contain
/// `.`/`..` components are rejected with [`StoreError::InvalidIdentifier`],
/// which does not fall through to the remote tier.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `id`
    ///
    /// # Errors
    /// Returns error if `id` would resolve outside the root directory.
    pub fn secret_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidIdentifier {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        if id.is_empty() {
            return Err(invalid("identifier is empty"));
        }

        let relative = Path::new(id);
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(invalid("identifier must be a relative path without '.' or '..'"));
            }
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SecretStore for FileStore {
    fn store_name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, id: &str) -> Result<SecretPayload, StoreError> {
        let path = self.secret_path(id)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(SecretPayload::new(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::not_found(id)),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
