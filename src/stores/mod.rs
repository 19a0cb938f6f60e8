//! Storage backends for tenant-partitioned vector records.
//!
//! The [`VectorStore`] trait abstracts over concrete backends so the
//! ingestion and query pipelines stay storage-agnostic:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!       ┌─────────────┐          ┌──────────────┐
//!       │   Memory    │          │    SQLite    │
//!       │ (RwLock map)│          │ ("sqlite")   │
//!       └─────────────┘          └──────────────┘
//! ```
//!
//! Both backends implement the same contract: per-collection dimension
//! enforcement, all-or-nothing batch insertion, exact cosine-similarity
//! search filtered to one tenant, and deterministic ranking (score
//! descending, earlier insertion wins ties).

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;

use crate::types::{NewRecord, Record, VaultError};

pub use memory::MemoryVectorStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVectorStore;

/// A search result: the matched record and its similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub record: Record,
    /// Cosine similarity to the query vector, in roughly `[-1, 1]`.
    /// Defined as `0.0` when either vector has zero norm.
    pub score: f32,
}

/// Tenant-partitioned vector storage.
///
/// Read paths are permissive: searching or deleting against a collection
/// that was never written returns an empty result / zero count rather than
/// an error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a batch of records, all-or-nothing.
    ///
    /// Every record in the batch must share one vector dimension, and that
    /// dimension must match the collection's established dimension (or, for
    /// an empty collection, establishes it). Returns the assigned ids in
    /// input order. On any failure nothing from the batch is inserted.
    async fn insert(
        &self,
        collection: &str,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>, VaultError>;

    /// Exact nearest-neighbor search over one tenant's records.
    ///
    /// Results are sorted by cosine similarity descending; ties are broken
    /// by insertion order (earlier record first). At most `k` hits are
    /// returned.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        tenant_id: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, VaultError>;

    /// Remove every record owned by `tenant_id`, atomically with respect to
    /// concurrent searches. Returns the number of records removed.
    async fn delete_by_tenant(
        &self,
        collection: &str,
        tenant_id: &str,
    ) -> Result<usize, VaultError>;

    /// Total number of records in the collection, across all tenants.
    async fn count(&self, collection: &str) -> Result<usize, VaultError>;
}

/// Cosine similarity between two equal-length vectors.
///
/// Zero-norm inputs score `0.0` so records embedded from degenerate text
/// rank last instead of poisoning the sort with NaN.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Sort hits by score descending and keep the top `k`.
///
/// The sort is stable, so records that tie on score keep their insertion
/// order and ranking stays deterministic.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}

/// Validate that every record in a batch shares one vector dimension and a
/// non-empty tenant id. Returns the batch dimension.
pub(crate) fn validate_batch(
    collection: &str,
    records: &[NewRecord],
) -> Result<usize, VaultError> {
    let expected = records[0].vector.len();
    for record in records {
        if record.tenant_id.trim().is_empty() {
            return Err(VaultError::InvalidTenant);
        }
        if record.vector.len() != expected {
            return Err(VaultError::DimensionMismatch {
                collection: collection.to_string(),
                expected,
                actual: record.vector.len(),
            });
        }
    }
    Ok(expected)
}
