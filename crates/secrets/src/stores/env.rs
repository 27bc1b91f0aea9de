//! Environment variable secret store

use crate::{SecretPayload, SecretStore, StoreError};
use async_trait::async_trait;
use std::env::VarError;

/// Prefix used by [`EnvStore::new`]
pub const DEFAULT_ENV_PREFIX: &str = "KEYWARD_SECRET_";

/// Serves secrets from environment variables.
///
/// Identifier `DB_PASS` is read from `<prefix>DB_PASS`. An unset variable
/// is [`StoreError::NotFound`].
#[derive(Debug, Clone)]
pub struct EnvStore {
    prefix: String,
}

impl EnvStore {
    /// Create a store using [`DEFAULT_ENV_PREFIX`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Create a store reading variables named `<prefix><id>`
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Name of the variable holding `id`
    ///
    /// # Errors
    /// Returns error if the variable name would be empty or contain `=` or NUL.
    pub fn var_name(&self, id: &str) -> Result<String, StoreError> {
        let name = format!("{}{id}", self.prefix);
        if name.is_empty() || name.contains(['=', '\0']) {
            return Err(StoreError::InvalidIdentifier {
                id: id.to_string(),
                reason: format!("'{name}' is not a valid environment variable name"),
            });
        }
        Ok(name)
    }
}

impl Default for EnvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvStore {
    fn store_name(&self) -> &'static str {
        "env"
    }

    async fn get(&self, id: &str) -> Result<SecretPayload, StoreError> {
        let name = self.var_name(id)?;
        match std::env::var(&name) {
            Ok(value) => Ok(SecretPayload::from(value)),
            Err(VarError::NotPresent) => Err(StoreError::not_found(id)),
            Err(VarError::NotUnicode(_)) => Err(StoreError::backend(format!(
                "Environment variable {name} is not valid unicode"
            ))),
        }
    }
}
