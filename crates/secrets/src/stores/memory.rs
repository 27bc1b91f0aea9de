//! In-memory secret store

use crate::{SecretPayload, SecretStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

/// Serves secrets from a fixed identifier -> payload mapping.
///
/// The mapping is built once and read-only afterwards. A lookup miss is
/// [`StoreError::NotFound`]; lookups never fail any other way.
#[derive(Default)]
pub struct MemoryStore {
    secrets: HashMap<String, SecretPayload>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an identifier -> bytes mapping
    #[must_use]
    #[allow(clippy::implicit_hasher)]
    pub fn from_map(secrets: HashMap<String, Vec<u8>>) -> Self {
        secrets.into_iter().collect()
    }

    /// Load a store from a JSON object of string values.
    ///
    /// ```json
    /// { "db-pass": "hunter2", "api-key": "s3cr3t" }
    /// ```
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a JSON object of strings.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let secrets: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| {
                StoreError::backend(format!(
                    "Invalid secrets file {}: {e}",
                    path.display()
                ))
            })?;

        Ok(secrets
            .into_iter()
            .map(|(id, value)| (id, value.into_bytes()))
            .collect())
    }

    /// Number of secrets in the store
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Check if the store holds `id`
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.secrets.contains_key(id)
    }
}

impl FromIterator<(String, Vec<u8>)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            secrets: iter
                .into_iter()
                .map(|(id, bytes)| (id, SecretPayload::new(bytes)))
                .collect(),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("count", &self.secrets.len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &str) -> Result<SecretPayload, StoreError> {
        self.secrets
            .get(id)
            .map(|payload| SecretPayload::from(payload.expose()))
            .ok_or_else(|| StoreError::not_found(id))
    }
}
