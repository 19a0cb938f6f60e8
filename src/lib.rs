//! Tenant-scoped vector storage and retrieval for embedded documents.
//!
//! ```text
//! raw document ──► segmenter ──► IngestionPipeline ──► EmbeddingProvider
//!                                       │                     │
//!                                       └──── buffered vectors ┘
//!                                                  │
//!                                                  ▼
//!                                      stores::VectorStore
//!                                      (memory / sqlite)
//!                                                  ▲
//!                                                  │
//! query text ──► QueryPipeline ──► EmbeddingProvider ──► ranked matches
//! ```
//!
//! Every read and delete is scoped to exactly one tenant; a collection fixes
//! its vector dimension at first insertion; batches insert all-or-nothing;
//! ranking is exact cosine similarity with ties broken by insertion order so
//! results are deterministic.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docvault::{MockEmbeddingProvider, Segment, Vault, VaultConfig};
//!
//! # async fn example() -> Result<(), docvault::VaultError> {
//! let vault = Vault::connect_with_provider(
//!     VaultConfig::default(),
//!     Arc::new(MockEmbeddingProvider::new()),
//! )
//! .await?;
//!
//! let segments = vec![Segment::new("page text", "report.pdf", 1, 1)];
//! vault.ingest(segments, "tenant-a").await?;
//!
//! for hit in vault.query("what is this about?", "tenant-a", None).await? {
//!     println!("{:.3}  {}", hit.score, hit.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod query;
pub mod segmenter;
pub mod stores;
pub mod types;
pub mod vault;

pub use config::{BackendLocation, CollectionDefaults, EmbeddingConfig, VaultConfig};
pub use embeddings::{EmbedError, EmbeddingProvider, MockEmbeddingProvider, RemoteEmbeddingProvider};
pub use ingestion::IngestionPipeline;
pub use query::{DEFAULT_K, MAX_K, MIN_K, QueryMatch, QueryPipeline};
pub use segmenter::{DocumentSegmenter, PlainTextSegmenter};
pub use stores::{MemoryVectorStore, SearchHit, VectorStore};
#[cfg(feature = "sqlite")]
pub use stores::SqliteVectorStore;
pub use types::{NewRecord, Record, RecordMetadata, Segment, VaultError};
pub use vault::Vault;
