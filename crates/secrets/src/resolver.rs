//! Two-tier secret resolution: local store, then remote server

use crate::{
    ConfigError, MAX_SECRET_SIZE, RemoteClient, ResolverConfig, SecretError, SecretPayload,
    SecretStore,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tier that produced a payload, for log fields
#[derive(Debug, Clone, Copy)]
enum Tier {
    Local,
    Remote,
}

impl Tier {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Resolves secrets from a local store with a remote fallback.
///
/// Resolution order for an identifier:
/// 1. Ask the local [`SecretStore`].
/// 2. Only if the store reports [`StoreError::NotFound`], ask the remote
///    server (when one is configured). Any other store error is returned as
///    [`SecretError::Store`] without contacting the server.
/// 3. Reject payloads longer than [`MAX_SECRET_SIZE`] with
///    [`SecretError::InvalidSize`], whichever tier produced them.
///
/// The resolver holds no mutable state and caches nothing, so one instance
/// can serve any number of concurrent resolutions.
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    remote: Option<RemoteClient>,
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("store", &self.store.store_name())
            .field("remote", &self.remote.as_ref().map(RemoteClient::base_url))
            .finish()
    }
}

impl SecretResolver {
    /// Create a resolver over `store` with the remote tier described by `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client for the remote tier cannot be created.
    pub fn new(store: Arc<dyn SecretStore>, config: &ResolverConfig) -> Result<Self, ConfigError> {
        let remote = RemoteClient::from_config(config)?;
        Ok(Self::with_remote(store, remote))
    }

    /// Create a resolver from an already-built remote client.
    #[must_use]
    pub fn with_remote(store: Arc<dyn SecretStore>, remote: Option<RemoteClient>) -> Self {
        Self { store, remote }
    }

    /// Create a resolver with no remote tier.
    #[must_use]
    pub fn local_only(store: Arc<dyn SecretStore>) -> Self {
        Self::with_remote(store, None)
    }

    /// Whether a remote tier is configured.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Resolve the secret named `id`.
    ///
    /// # Errors
    /// - [`SecretError::NotFound`] if no tier has the secret
    /// - [`SecretError::Store`] if the local store fails for another reason
    /// - [`SecretError::Transport`] / [`SecretError::RequestConstruction`] from the remote tier
    /// - [`SecretError::InvalidSize`] if the payload exceeds [`MAX_SECRET_SIZE`]
    pub async fn resolve(&self, id: &str) -> Result<SecretPayload, SecretError> {
        if id.is_empty() {
            return Err(SecretError::not_found(id));
        }

        let (payload, tier) = self.lookup(id).await?;

        let size = payload.len();
        if size > MAX_SECRET_SIZE {
            warn!(secret = %id, tier = tier.as_str(), size, "Rejecting oversized secret");
            return Err(SecretError::InvalidSize {
                id: id.to_string(),
                size,
                max: MAX_SECRET_SIZE,
            });
        }

        debug!(secret = %id, tier = tier.as_str(), size, "Resolved secret");
        Ok(payload)
    }

    async fn lookup(&self, id: &str) -> Result<(SecretPayload, Tier), SecretError> {
        let store = self.store.store_name();

        match self.store.get(id).await {
            Ok(payload) => Ok((payload, Tier::Local)),
            Err(err) if err.is_not_found() => {
                let Some(remote) = &self.remote else {
                    debug!(secret = %id, store, "Secret not in local store and no remote configured");
                    return Err(SecretError::not_found(id));
                };

                debug!(secret = %id, store, "Secret not in local store, asking secret server");
                let payload = remote.fetch(id).await?;
                Ok((payload, Tier::Remote))
            }
            Err(source) => {
                warn!(secret = %id, store, error = %source, "Local secret store failed");
                Err(SecretError::Store {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }
}
