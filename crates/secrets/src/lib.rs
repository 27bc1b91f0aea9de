//! Secret Resolution for keyward
//!
//! Resolves opaque secret identifiers to byte payloads using two tiers:
//! a local [`SecretStore`] first, then a remote secret server reached over
//! authenticated HTTP when (and only when) the local store reports the
//! identifier as unknown. Every payload, whichever tier produced it, is
//! checked against [`MAX_SECRET_SIZE`] before it is handed back.
//!
//! # Example
//!
//! ```ignore
//! use keyward_secrets::{MemoryStore, ResolverConfig, SecretResolver};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::from_map(secrets));
//! let config = ResolverConfig::new("https://secrets.internal", token);
//! let resolver = SecretResolver::new(store, &config)?;
//!
//! let payload = resolver.resolve("db-pass").await?;
//! write_secret(payload.expose());
//! // The payload is zeroed when it goes out of scope
//! ```

mod batch;
mod config;
mod remote;
mod resolver;
pub mod stores;
mod types;

pub use config::{ConfigError, ResolverConfig};
pub use remote::{AUTH_HEADER, RemoteClient, SECRETS_API_PATH};
pub use resolver::SecretResolver;
pub use types::{SecretBatch, SecretPayload};

// Built-in local stores
pub use stores::{EnvStore, FileStore, MemoryStore};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Maximum byte length allowed for a resolved secret (500 KiB).
pub const MAX_SECRET_SIZE: usize = 500 * 1024;

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Neither tier produced the secret
    #[error("Secret '{id}' not found")]
    NotFound {
        /// Secret identifier
        id: String,
    },

    /// The secret server could not be reached or the response could not be read
    #[error("Failed to fetch secret '{id}' from the secret server: {source}")]
    Transport {
        /// Secret identifier
        id: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The local store failed for a reason other than a missing secret
    #[error("Local secret store failed for '{id}': {source}")]
    Store {
        /// Secret identifier
        id: String,
        /// Error reported by the store
        #[source]
        source: StoreError,
    },

    /// The resolved payload is larger than [`MAX_SECRET_SIZE`]
    #[error("Invalid secret size {size} for '{id}' (maximum {max} bytes)")]
    InvalidSize {
        /// Secret identifier
        id: String,
        /// Observed payload length in bytes
        size: usize,
        /// Size limit that was exceeded
        max: usize,
    },

    /// The remote request could not be built
    #[error("Cannot build secret server request for '{id}': {message}")]
    RequestConstruction {
        /// Secret identifier
        id: String,
        /// What made the request unbuildable
        message: String,
    },
}

impl SecretError {
    /// The discriminant of this error, for callers mapping errors onto
    /// their own status vocabulary.
    #[must_use]
    pub const fn kind(&self) -> SecretErrorKind {
        match self {
            Self::NotFound { .. } => SecretErrorKind::NotFound,
            Self::Transport { .. } => SecretErrorKind::Transport,
            Self::Store { .. } => SecretErrorKind::Store,
            Self::InvalidSize { .. } => SecretErrorKind::InvalidSize,
            Self::RequestConstruction { .. } => SecretErrorKind::RequestConstruction,
        }
    }

    /// The identifier the failed resolution was for.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::NotFound { id }
            | Self::Transport { id, .. }
            | Self::Store { id, .. }
            | Self::InvalidSize { id, .. }
            | Self::RequestConstruction { id, .. } => id,
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}

/// Fieldless classification of a [`SecretError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretErrorKind {
    /// See [`SecretError::NotFound`]
    NotFound,
    /// See [`SecretError::Transport`]
    Transport,
    /// See [`SecretError::Store`]
    Store,
    /// See [`SecretError::InvalidSize`]
    InvalidSize,
    /// See [`SecretError::RequestConstruction`]
    RequestConstruction,
}

impl SecretErrorKind {
    /// Stable lowercase name, suitable for logs and machine-readable output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Transport => "transport",
            Self::Store => "store",
            Self::InvalidSize => "invalid_size",
            Self::RequestConstruction => "request_construction",
        }
    }

    /// Whether this is the user-visible "not found" case.
    #[must_use]
    pub const fn is_not_found(self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl std::fmt::Display for SecretErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a [`SecretStore`].
///
/// [`StoreError::NotFound`] is the only variant that lets resolution fall
/// through to the remote tier.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has no secret under this identifier
    #[error("Secret '{id}' is not in the store")]
    NotFound {
        /// Secret identifier
        id: String,
    },

    /// The identifier cannot be used as a key by this store
    #[error("Invalid secret identifier '{id}': {reason}")]
    InvalidIdentifier {
        /// Secret identifier
        id: String,
        /// Why the store rejected it
        reason: String,
    },

    /// Reading the backing storage failed
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Any other store-specific failure
    #[error("{message}")]
    Backend {
        /// Error message from the store
        message: String,
    },
}

impl StoreError {
    /// Create a not-found error for `id`
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a backend error with a free-form message
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Whether the store reported the identifier as unknown
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Capability for looking up secrets locally.
///
/// Implementations must distinguish an unknown identifier
/// ([`StoreError::NotFound`]) from every other failure, and must be safe to
/// call concurrently.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret by identifier.
    async fn get(&self, id: &str) -> Result<SecretPayload, StoreError>;

    /// Short name of the store, used in log fields.
    ///
    /// Examples: `"memory"`, `"file"`, `"env"`
    fn store_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_error_not_found() {
        let err = SecretError::not_found("api-key");
        let msg = err.to_string();
        assert!(msg.contains("api-key"));
        assert_eq!(err.kind(), SecretErrorKind::NotFound);
        assert!(err.kind().is_not_found());
    }

    #[test]
    fn test_secret_error_invalid_size() {
        let err = SecretError::InvalidSize {
            id: "big".to_string(),
            size: 614_400,
            max: MAX_SECRET_SIZE,
        };
        let msg = err.to_string();
        assert!(msg.contains("614400"));
        assert!(msg.contains("512000"));
        assert_eq!(err.kind(), SecretErrorKind::InvalidSize);
        assert!(!err.kind().is_not_found());
    }

    #[test]
    fn test_secret_error_store_keeps_source() {
        let err = SecretError::Store {
            id: "db-pass".to_string(),
            source: StoreError::backend("disk on fire"),
        };
        assert!(err.to_string().contains("disk on fire"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.id(), "db-pass");
    }

    #[test]
    fn test_secret_error_request_construction() {
        let err = SecretError::RequestConstruction {
            id: "a?b".to_string(),
            message: "identifier adds a query string".to_string(),
        };
        assert_eq!(err.kind(), SecretErrorKind::RequestConstruction);
        assert!(err.to_string().contains("query string"));
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(SecretErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(SecretErrorKind::Transport.as_str(), "transport");
        assert_eq!(SecretErrorKind::Store.as_str(), "store");
        assert_eq!(SecretErrorKind::InvalidSize.as_str(), "invalid_size");
        assert_eq!(
            SecretErrorKind::RequestConstruction.as_str(),
            "request_construction"
        );
    }

    #[test]
    fn test_store_error_not_found() {
        let err = StoreError::not_found("missing");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("missing"));
        assert!(!StoreError::backend("boom").is_not_found());
    }

    #[test]
    fn test_store_error_io_display() {
        let err = StoreError::Io {
            path: PathBuf::from("/run/secrets/db-pass"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/run/secrets/db-pass"));
        assert!(msg.contains("denied"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_max_secret_size() {
        assert_eq!(MAX_SECRET_SIZE, 512_000);
    }
}
