//! Core record types and the crate-wide error taxonomy.

use serde::{Deserialize, Serialize};

use crate::embeddings::EmbedError;

/// Metadata attached to every persisted record.
///
/// The well-known fields form a closed set that the pipelines rely on;
/// anything else a caller supplies rides along in `extra` and is preserved
/// verbatim through storage and retrieval.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Owning tenant, mirrored from the record for filter-friendly payloads.
    pub tenant_id: String,
    /// Stable per-record identifier, mirrors the record id.
    pub doc_id: String,
    /// Originating file name of the source document.
    pub source: String,
    /// One-based page number within the source document.
    pub page: u32,
    /// Total number of pages in the source document.
    pub total_pages: u32,
    /// Caller-supplied scalar fields outside the well-known set.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A persisted (vector, content, metadata) triple tied to one tenant.
///
/// Records are immutable once inserted; there is no update operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique within its collection for the collection's lifetime.
    pub id: String,
    /// Partitions every read and delete; never mutated after insertion.
    pub tenant_id: String,
    /// Dense embedding; length matches the collection dimension.
    pub vector: Vec<f32>,
    /// The raw text segment the vector was derived from.
    pub content: String,
    pub metadata: RecordMetadata,
}

/// Insertion request for a single record.
///
/// When `id` is `None` the store assigns a collision-resistant random id
/// (UUID v4) at insertion time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub id: Option<String>,
    pub tenant_id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: RecordMetadata,
}

impl NewRecord {
    pub fn new(
        tenant_id: impl Into<String>,
        vector: Vec<f32>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            tenant_id: tenant_id.into(),
            vector,
            content: content.into(),
            metadata: RecordMetadata::default(),
        }
    }

    /// Pin a caller-chosen id instead of letting the store generate one.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: RecordMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One text segment produced by a [`DocumentSegmenter`](crate::segmenter::DocumentSegmenter).
///
/// Carries page-level provenance; `doc_id` is optional and generated during
/// ingestion when absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub total_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Segment {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        page: u32,
        total_pages: u32,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
            total_pages,
            doc_id: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Errors surfaced by the storage and pipeline layers.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// A batch or query vector's length disagrees with the collection's
    /// established dimension. Signals a configuration fault (e.g. the
    /// embedding model changed), not a transient condition.
    #[error(
        "vector dimension mismatch in collection '{collection}': expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// A caller-supplied record id already exists in the collection.
    #[error("record id '{0}' already exists in the collection")]
    DuplicateId(String),

    /// Ingestion was handed zero segments (or a document with no
    /// extractable text).
    #[error("no text segments to ingest")]
    EmptyInput,

    /// The query text is empty after trimming whitespace.
    #[error("query text is empty")]
    EmptyQuery,

    /// The requested result count is outside the supported range.
    #[error("k must be between 1 and 50, got {got}")]
    InvalidK { got: usize },

    /// The tenant id is empty or whitespace-only.
    #[error("tenant id must be a non-empty string")]
    InvalidTenant,

    /// The embedding provider failed; see [`EmbedError::is_retryable`] to
    /// distinguish transient from fatal causes.
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    /// Document segmentation failed before any embedding was attempted.
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    /// Backing storage failure. Carries a human-readable cause only.
    #[error("storage failure: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_extra_fields_flatten_through_json() {
        let mut extra = serde_json::Map::new();
        extra.insert("language".into(), serde_json::Value::String("en".into()));
        let metadata = RecordMetadata {
            tenant_id: "tenant-a".into(),
            doc_id: "doc-1".into(),
            source: "report.pdf".into(),
            page: 3,
            total_pages: 10,
            extra,
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["language"], "en");
        assert_eq!(value["page"], 3);

        let back: RecordMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn new_record_builder_sets_id_and_metadata() {
        let record = NewRecord::new("tenant-a", vec![0.0, 1.0], "hello")
            .with_id("fixed-id")
            .with_metadata(RecordMetadata {
                source: "a.pdf".into(),
                ..Default::default()
            });
        assert_eq!(record.id.as_deref(), Some("fixed-id"));
        assert_eq!(record.metadata.source, "a.pdf");
    }
}
