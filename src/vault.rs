//! Top-level wiring: configuration in, ready-to-use pipelines out.

use std::sync::Arc;

use crate::config::{BackendLocation, VaultConfig};
use crate::embeddings::{EmbeddingProvider, RemoteEmbeddingProvider};
use crate::ingestion::IngestionPipeline;
use crate::query::{QueryMatch, QueryPipeline};
use crate::stores::{MemoryVectorStore, VectorStore};
use crate::types::{Segment, VaultError};

/// A connected vault: one store, one embedding provider, both pipelines.
///
/// Built once per process from a [`VaultConfig`] and shared across request
/// handlers; all members are internally synchronized.
pub struct Vault {
    config: VaultConfig,
    store: Arc<dyn VectorStore>,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
}

impl Vault {
    /// Connect the configured backend and wire the pipelines to a remote
    /// embedding provider described by the config.
    pub async fn connect(config: VaultConfig) -> Result<Self, VaultError> {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(RemoteEmbeddingProvider::new(
            config.embedding.endpoint.clone(),
            config.embedding.api_key.clone(),
            config.embedding.model.clone(),
            config.embedding.dimensions,
        ));
        Self::connect_with_provider(config, provider).await
    }

    /// Connect with a caller-supplied provider (different vendor, local
    /// model, or a mock in tests).
    pub async fn connect_with_provider(
        config: VaultConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, VaultError> {
        let store: Arc<dyn VectorStore> = match &config.backend {
            BackendLocation::Memory => Arc::new(MemoryVectorStore::new()),
            #[cfg(feature = "sqlite")]
            BackendLocation::Sqlite { path } => {
                Arc::new(crate::stores::SqliteVectorStore::open(path).await?)
            }
        };

        tracing::info!(backend = ?config.backend, "vault connected");
        Ok(Self {
            ingestion: IngestionPipeline::new(provider.clone(), store.clone()),
            query: QueryPipeline::new(provider, store.clone()),
            store,
            config,
        })
    }

    /// Ingest segments into the default collection.
    pub async fn ingest(
        &self,
        segments: Vec<Segment>,
        tenant_id: &str,
    ) -> Result<Vec<String>, VaultError> {
        self.ingestion
            .ingest(segments, tenant_id, &self.config.collections.collection)
            .await
    }

    /// Query the default collection.
    pub async fn query(
        &self,
        text: &str,
        tenant_id: &str,
        k: Option<usize>,
    ) -> Result<Vec<QueryMatch>, VaultError> {
        self.query
            .query(text, tenant_id, k, &self.config.collections.collection)
            .await
    }

    /// Remove every record the tenant owns in the default collection.
    pub async fn delete_tenant(&self, tenant_id: &str) -> Result<usize, VaultError> {
        self.store
            .delete_by_tenant(&self.config.collections.collection, tenant_id)
            .await
    }

    /// The underlying store, for collection-explicit operations.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    pub fn ingestion(&self) -> &IngestionPipeline {
        &self.ingestion
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }
}
