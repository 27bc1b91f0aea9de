//! Secret payload types with automatic memory zeroing
//!
//! - [`SecretPayload`]: resolved secret bytes, zeroed on drop
//! - [`SecretBatch`]: a set of payloads resolved together

use secrecy::{ExposeSecret, SecretBox};
use std::collections::HashMap;

/// A resolved secret payload with automatic memory zeroing on drop.
///
/// This type wraps `secrecy::SecretBox<[u8]>` so that:
/// - Payload bytes are zeroed from memory when dropped
/// - Debug and Display output show `[REDACTED]` instead of the bytes
/// - An explicit `.expose()` call is required to read the bytes
///
/// # Example
///
/// ```ignore
/// let payload = SecretPayload::from("my-password");
/// consume(payload.expose());
/// // When `payload` goes out of scope, memory is zeroed
/// ```
pub struct SecretPayload {
    inner: SecretBox<[u8]>,
}

impl SecretPayload {
    /// Take ownership of `bytes` as a secret payload.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: SecretBox::new(bytes.into_boxed_slice()),
        }
    }

    /// Expose the payload bytes for use.
    ///
    /// The caller must ensure the exposed bytes are not logged and are used
    /// only for the immediate operation.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Length of the payload in bytes, without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<Vec<u8>> for SecretPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SecretPayload {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<String> for SecretPayload {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for SecretPayload {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Payloads resolved together by [`SecretResolver::resolve_batch`].
///
/// Every payload is zeroed when the batch is dropped.
///
/// [`SecretResolver::resolve_batch`]: crate::SecretResolver::resolve_batch
#[derive(Default)]
pub struct SecretBatch {
    /// Secret identifier -> payload
    secrets: HashMap<String, SecretPayload>,
}

impl SecretBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            secrets: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a payload, replacing any previous payload for `id`.
    pub fn insert(&mut self, id: String, payload: SecretPayload) {
        self.secrets.insert(id, payload);
    }

    /// Get a payload by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SecretPayload> {
        self.secrets.get(id)
    }

    /// Check if the batch contains an identifier.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.secrets.contains_key(id)
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Number of payloads in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Iterate over identifiers, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        let mut ids: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids.into_iter()
    }
}

impl std::fmt::Debug for SecretBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBatch")
            .field("count", &self.secrets.len())
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_payload_debug_is_redacted() {
        let payload = SecretPayload::from("my-super-secret-password");
        let debug_output = format!("{payload:?}");
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("password"));
    }

    #[test]
    fn secret_payload_display_is_redacted() {
        let payload = SecretPayload::from("my-super-secret-password");
        assert_eq!(format!("{payload}"), "[REDACTED]");
    }

    #[test]
    fn secret_payload_expose_returns_bytes() {
        let payload = SecretPayload::new(vec![0, 159, 146, 150]);
        assert_eq!(payload.expose(), &[0, 159, 146, 150]);
        assert_eq!(payload.len(), 4);
        assert!(!payload.is_empty());
    }

    #[test]
    fn secret_payload_empty() {
        let payload = SecretPayload::new(Vec::new());
        assert!(payload.is_empty());
        assert_eq!(payload.len(), 0);
    }

    #[test]
    fn secret_batch_insert_and_get() {
        let mut batch = SecretBatch::new();
        batch.insert("api-key".to_string(), SecretPayload::from("s3cr3t"));

        assert!(batch.contains("api-key"));
        assert!(!batch.contains("other"));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get("api-key").unwrap().expose(), b"s3cr3t");
    }

    #[test]
    fn secret_batch_ids_are_sorted() {
        let mut batch = SecretBatch::with_capacity(3);
        batch.insert("zeta".to_string(), SecretPayload::from("1"));
        batch.insert("alpha".to_string(), SecretPayload::from("2"));
        batch.insert("mid".to_string(), SecretPayload::from("3"));

        assert_eq!(batch.ids().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn secret_batch_debug_hides_values() {
        let mut batch = SecretBatch::new();
        batch.insert("db-pass".to_string(), SecretPayload::from("hunter2"));

        let debug_output = format!("{batch:?}");
        assert!(!debug_output.contains("hunter2"));
        assert!(debug_output.contains("db-pass"));
        assert!(debug_output.contains("count"));
    }
}
