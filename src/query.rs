//! Query pipeline: free text in, ranked tenant-scoped matches out.

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::stores::VectorStore;
use crate::types::{RecordMetadata, VaultError};

/// Result count used when the caller omits `k`.
pub const DEFAULT_K: usize = 5;
/// Inclusive bounds on caller-supplied `k`.
pub const MIN_K: usize = 1;
pub const MAX_K: usize = 50;

/// One ranked match: content, provenance metadata, and similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryMatch {
    pub content: String,
    pub metadata: RecordMetadata,
    pub score: f32,
}

/// Translates a free-text query into ranked records for one tenant.
pub struct QueryPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl QueryPipeline {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Run a similarity query.
    ///
    /// `k` defaults to [`DEFAULT_K`] when omitted; an explicit value outside
    /// `[MIN_K, MAX_K]` is a caller error, not silently clamped. Validation
    /// happens before any provider call, and an empty result set is a
    /// successful outcome, never an error.
    #[tracing::instrument(skip(self, text), err)]
    pub async fn query(
        &self,
        text: &str,
        tenant_id: &str,
        k: Option<usize>,
        collection: &str,
    ) -> Result<Vec<QueryMatch>, VaultError> {
        if text.trim().is_empty() {
            return Err(VaultError::EmptyQuery);
        }
        if tenant_id.trim().is_empty() {
            return Err(VaultError::InvalidTenant);
        }
        let k = k.unwrap_or(DEFAULT_K);
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(VaultError::InvalidK { got: k });
        }

        let query_vector = self.provider.embed(text).await?;
        let hits = self
            .store
            .search(collection, &query_vector, tenant_id, k)
            .await?;

        tracing::debug!(
            collection = %collection,
            matches = hits.len(),
            "similarity query complete"
        );
        Ok(hits
            .into_iter()
            .map(|hit| QueryMatch {
                content: hit.record.content,
                metadata: hit.record.metadata,
                score: hit.score,
            })
            .collect())
    }
}
