//! Resolver configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning a [`ResolverConfig`] into a resolver
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The HTTP client for the secret server could not be created
    #[error("Failed to build HTTP client for the secret server: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for the remote tier of a [`SecretResolver`].
///
/// An empty `remote_url` disables the remote tier. The auth token is sent
/// verbatim in the `auth` header of every remote request and is never
/// printed by `Debug`.
///
/// Deserializes from camelCase keys:
///
/// ```json
/// { "remoteUrl": "https://secrets.internal", "authToken": "...", "timeoutSecs": 10 }
/// ```
///
/// [`SecretResolver`]: crate::SecretResolver
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    #[serde(default)]
    remote_url: String,

    #[serde(default = "empty_token", deserialize_with = "deserialize_token")]
    auth_token: SecretString,

    /// Request timeout for the default HTTP client
    #[serde(default, rename = "timeoutSecs", deserialize_with = "deserialize_secs")]
    timeout: Option<Duration>,
}

fn empty_token() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_token<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
}

impl ResolverConfig {
    /// Create a config with a remote tier at `remote_url`.
    #[must_use]
    pub fn new(remote_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            auth_token: SecretString::from(auth_token.into()),
            timeout: None,
        }
    }

    /// Create a config with the remote tier disabled.
    #[must_use]
    pub fn local_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Apply a request timeout to the default HTTP client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Base address of the secret server (may be empty).
    #[must_use]
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// Token sent in the `auth` header.
    #[must_use]
    pub fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }

    /// Request timeout, if one was configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a remote tier is configured.
    #[must_use]
    pub fn remote_enabled(&self) -> bool {
        !self.remote_url.trim().is_empty()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::local_only()
    }
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.auth_token.expose_secret().is_empty() {
            "<empty>"
        } else {
            "[REDACTED]"
        };
        f.debug_struct("ResolverConfig")
            .field("remote_url", &self.remote_url)
            .field("auth_token", &token)
            .field("timeout", &self.timeout)
            .finish()
    }
}
