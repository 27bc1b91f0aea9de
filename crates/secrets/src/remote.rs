//! HTTP client for the remote secret server

use crate::{ConfigError, ResolverConfig, SecretError, SecretPayload};
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode, Url, redirect};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Path prefix, relative to the server base address, under which secrets live
pub const SECRETS_API_PATH: &str = "api/v0/secrets";

/// Request header carrying the auth token
pub const AUTH_HEADER: &str = "auth";

/// Fetches secrets from the remote secret server.
///
/// Each call issues exactly one `GET {base}/api/v0/secrets/{id}` with the
/// token in the [`AUTH_HEADER`] header. A `200 OK` body is the payload; any
/// other status is reported as not found. Nothing is retried or cached, and
/// the default client does not follow redirects.
#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    auth_token: SecretString,
    client: Client,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Build a client for the remote tier described by `config`.
    ///
    /// Returns `Ok(None)` when the config has no remote address.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn from_config(config: &ResolverConfig) -> Result<Option<Self>, ConfigError> {
        if !config.remote_enabled() {
            return Ok(None);
        }

        // The auth header must only ever reach the secrets endpoint
        let mut builder = Client::builder()
            .user_agent(concat!("keyward/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect::Policy::none());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Some(Self::with_client(
            builder.build()?,
            config.remote_url(),
            config.auth_token().clone(),
        )))
    }

    /// Build a client around a caller-supplied `reqwest::Client`.
    ///
    /// Timeouts, proxies and TLS policy are whatever `client` was built with.
    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        auth_token: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token,
            client,
        }
    }

    /// Base address of the secret server.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Address of the secret named `id`.
    ///
    /// The identifier is placed into the path verbatim. It is rejected when
    /// the result is not a valid http(s) URL, when it would add a query
    /// string or fragment, or when URL normalization would move the request
    /// outside the secrets path (dot segments, backslashes, control
    /// characters).
    ///
    /// # Errors
    /// Returns [`SecretError::RequestConstruction`] if no valid address can be built.
    pub fn secret_url(&self, id: &str) -> Result<Url, SecretError> {
        let invalid = |message: String| SecretError::RequestConstruction {
            id: id.to_string(),
            message,
        };

        check_identifier(id).map_err(|reason| invalid(reason.to_string()))?;

        let base = self.base_url.trim().trim_end_matches('/');
        let prefix = format!("{base}/{SECRETS_API_PATH}/");
        let raw = format!("{prefix}{id}");

        let url =
            Url::parse(&raw).map_err(|e| invalid(format!("'{raw}' is not a valid URL: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported URL scheme '{}'", url.scheme())));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid(
                "identifier adds a query string or fragment to the address".to_string(),
            ));
        }

        let secrets_path = Url::parse(&prefix)
            .map_err(|e| invalid(format!("'{prefix}' is not a valid URL: {e}")))?;
        if !url.path().starts_with(secrets_path.path()) {
            return Err(invalid(format!("identifier leaves {}", secrets_path.path())));
        }

        Ok(url)
    }

    /// Fetch the secret named `id`.
    ///
    /// # Errors
    /// - [`SecretError::RequestConstruction`] if the request cannot be built
    /// - [`SecretError::Transport`] if the server cannot be reached or the body cannot be read
    /// - [`SecretError::NotFound`] for any status other than `200 OK`
    pub async fn fetch(&self, id: &str) -> Result<SecretPayload, SecretError> {
        let url = self.secret_url(id)?;

        let mut token = HeaderValue::from_bytes(self.auth_token.expose_secret().as_bytes())
            .map_err(|e| SecretError::RequestConstruction {
                id: id.to_string(),
                message: format!("auth token is not a valid header value: {e}"),
            })?;
        token.set_sensitive(true);

        debug!(secret = %id, path = %url.path(), "Fetching secret from secret server");

        let response = self
            .client
            .get(url)
            .header(AUTH_HEADER, token)
            .send()
            .await
            .map_err(|e| Self::classify_send_error(id, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(secret = %id, %status, "Secret server did not return the secret");
            return Err(SecretError::not_found(id));
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SecretError::Transport {
                id: id.to_string(),
                source,
            })?;

        Ok(SecretPayload::new(body.to_vec()))
    }

    fn classify_send_error(id: &str, err: reqwest::Error) -> SecretError {
        if err.is_builder() {
            SecretError::RequestConstruction {
                id: id.to_string(),
                message: err.to_string(),
            }
        } else {
            SecretError::Transport {
                id: id.to_string(),
                source: err,
            }
        }
    }
}

/// Reject identifiers that URL parsing would not keep verbatim in the path
fn check_identifier(id: &str) -> Result<(), &'static str> {
    if id.chars().any(char::is_control) {
        return Err("identifier contains control characters");
    }
    if id.contains('\\') {
        return Err("identifier contains a backslash");
    }
    if id.split('/').any(is_dot_segment) {
        return Err("identifier contains '.' or '..' path segments");
    }
    Ok(())
}

/// `.` or `..`, including the `%2e` spellings URL parsers treat the same
fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}
