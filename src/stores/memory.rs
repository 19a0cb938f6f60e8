//! In-memory vector store backed by a `parking_lot` read-write lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::types::{NewRecord, Record, VaultError};

use super::{SearchHit, VectorStore, cosine_similarity, rank_hits, validate_batch};

#[derive(Default)]
struct CollectionState {
    /// Established by the first successful insert, invariant afterwards.
    /// Survives emptying the collection via tenant deletes.
    dimension: Option<usize>,
    /// Kept in insertion order; ranking ties resolve to the earlier entry.
    records: Vec<Record>,
    ids: HashSet<String>,
}

/// Process-local [`VectorStore`] implementation.
///
/// Mutations take the write lock, searches the read lock, so a concurrent
/// search observes either the entire pre-state or the entire post-state of
/// any insert or delete, never a partial batch. Embedding never happens
/// under this lock; callers buffer vectors before touching the store.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, CollectionState>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    #[tracing::instrument(skip(self, records), fields(batch = records.len()), err)]
    async fn insert(
        &self,
        collection: &str,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>, VaultError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let batch_dimension = validate_batch(collection, &records)?;

        let mut collections = self.collections.write();
        let state = collections.entry(collection.to_string()).or_default();

        if let Some(expected) = state.dimension {
            if expected != batch_dimension {
                return Err(VaultError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected,
                    actual: batch_dimension,
                });
            }
        }

        // Resolve all ids before mutating so a duplicate rejects the whole
        // batch with the collection untouched.
        let mut assigned = Vec::with_capacity(records.len());
        let mut batch_ids: HashSet<String> = HashSet::with_capacity(records.len());
        for record in &records {
            let id = match &record.id {
                Some(id) => {
                    if state.ids.contains(id) || !batch_ids.insert(id.clone()) {
                        return Err(VaultError::DuplicateId(id.clone()));
                    }
                    id.clone()
                }
                None => loop {
                    let candidate = Uuid::new_v4().to_string();
                    if !state.ids.contains(&candidate) && batch_ids.insert(candidate.clone()) {
                        break candidate;
                    }
                },
            };
            assigned.push(id);
        }

        state.dimension = Some(batch_dimension);
        for (record, id) in records.into_iter().zip(&assigned) {
            state.ids.insert(id.clone());
            state.records.push(Record {
                id: id.clone(),
                tenant_id: record.tenant_id,
                vector: record.vector,
                content: record.content,
                metadata: record.metadata,
            });
        }

        tracing::debug!(
            collection = %collection,
            inserted = assigned.len(),
            dimension = batch_dimension,
            "inserted record batch"
        );
        Ok(assigned)
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        tenant_id: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, VaultError> {
        let collections = self.collections.read();
        let Some(state) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let Some(dimension) = state.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(VaultError::DimensionMismatch {
                collection: collection.to_string(),
                expected: dimension,
                actual: query.len(),
            });
        }

        let hits: Vec<SearchHit> = state
            .records
            .iter()
            .filter(|record| record.tenant_id == tenant_id)
            .map(|record| SearchHit {
                record: record.clone(),
                score: cosine_similarity(query, &record.vector),
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_by_tenant(
        &self,
        collection: &str,
        tenant_id: &str,
    ) -> Result<usize, VaultError> {
        let mut collections = self.collections.write();
        let Some(state) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = state.records.len();
        state.records.retain(|record| {
            if record.tenant_id == tenant_id {
                state.ids.remove(&record.id);
                false
            } else {
                true
            }
        });
        let removed = before - state.records.len();
        tracing::debug!(collection = %collection, removed, "deleted tenant records");
        Ok(removed)
    }

    async fn count(&self, collection: &str) -> Result<usize, VaultError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map_or(0, |state| state.records.len()))
    }
}
