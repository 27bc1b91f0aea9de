//! Batch secret resolution with concurrent lookups

use crate::{SecretBatch, SecretError, SecretResolver};
use futures::future::try_join_all;
use std::collections::BTreeSet;

impl SecretResolver {
    /// Resolve several identifiers concurrently.
    ///
    /// Each identifier goes through the full [`resolve`](Self::resolve)
    /// protocol on its own; duplicates are resolved once. Fails with the first
    /// error encountered, dropping (and thereby cancelling) the lookups still
    /// in flight.
    ///
    /// # Errors
    /// Returns the first [`SecretError`] produced by any identifier.
    pub async fn resolve_batch<I, S>(&self, ids: I) -> Result<SecretBatch, SecretError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        let lookups = unique.into_iter().map(|id| async move {
            let payload = self.resolve(&id).await?;
            Ok::<_, SecretError>((id, payload))
        });

        let resolved = try_join_all(lookups).await?;

        let mut batch = SecretBatch::with_capacity(resolved.len());
        for (id, payload) in resolved {
            batch.insert(id, payload);
        }
        tracing::debug!(count = batch.len(), "Resolved secret batch");
        Ok(batch)
    }
}
