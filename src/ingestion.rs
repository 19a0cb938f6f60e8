//! Ingestion pipeline: text segments in, persisted records out.
//!
//! The pipeline buffers every embedding before touching the store, which
//! gives document-level all-or-nothing semantics: a provider failure or a
//! caller cancellation mid-embed leaves zero records behind, and the store
//! itself commits the batch atomically. No store lock is held while the
//! provider call is in flight.

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::stores::VectorStore;
use crate::types::{NewRecord, RecordMetadata, Segment, VaultError};

/// Turns a tenant's document segments into persisted vector records.
pub struct IngestionPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { provider, store }
    }

    /// Embed and persist `segments` for one tenant, atomically.
    ///
    /// Returns the assigned record ids in segment order. Fails with
    /// [`VaultError::EmptyInput`] for an empty segment list,
    /// [`VaultError::InvalidTenant`] for a blank tenant id,
    /// [`VaultError::Embedding`] when the provider fails (nothing is
    /// written), and propagates [`VaultError::DimensionMismatch`] verbatim
    /// from the store — that one signals the collection was built with a
    /// different embedding model.
    #[tracing::instrument(
        skip(self, segments),
        fields(segments = segments.len()),
        err
    )]
    pub async fn ingest(
        &self,
        segments: Vec<Segment>,
        tenant_id: &str,
        collection: &str,
    ) -> Result<Vec<String>, VaultError> {
        if segments.is_empty() {
            return Err(VaultError::EmptyInput);
        }
        if tenant_id.trim().is_empty() {
            return Err(VaultError::InvalidTenant);
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = self.provider.embed_batch(&texts).await?;
        debug_assert_eq!(vectors.len(), texts.len());

        let records: Vec<NewRecord> = segments
            .into_iter()
            .zip(vectors)
            .map(|(segment, vector)| {
                let doc_id = segment
                    .doc_id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                NewRecord {
                    // Record id mirrors doc_id so callers can correlate the
                    // returned ids with their own bookkeeping.
                    id: Some(doc_id.clone()),
                    tenant_id: tenant_id.to_string(),
                    vector,
                    content: segment.text,
                    metadata: RecordMetadata {
                        tenant_id: tenant_id.to_string(),
                        doc_id,
                        source: segment.source,
                        page: segment.page,
                        total_pages: segment.total_pages,
                        extra: segment.extra,
                    },
                }
            })
            .collect();

        let ids = self.store.insert(collection, records).await?;
        tracing::info!(
            collection = %collection,
            inserted = ids.len(),
            "ingested document segments"
        );
        Ok(ids)
    }
}
