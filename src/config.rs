//! Process-level configuration.
//!
//! Replaces implicit environment-derived globals with an explicit structure:
//! built once at startup (programmatically or via [`VaultConfig::from_env`]),
//! then injected into the pipelines. Nothing in the crate reads the
//! environment after construction.

use serde::{Deserialize, Serialize};

/// Where record storage lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendLocation {
    /// Process-local storage, dropped on exit.
    Memory,
    /// Durable single-file SQLite storage.
    #[cfg(feature = "sqlite")]
    Sqlite { path: std::path::PathBuf },
}

/// Connection settings for the remote embedding endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mistral.ai/v1/embeddings".to_string(),
            api_key: String::new(),
            model: "mistral-embed".to_string(),
            dimensions: 1024,
        }
    }
}

/// Defaults applied when a caller does not name a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDefaults {
    pub collection: String,
}

impl Default for CollectionDefaults {
    fn default() -> Self {
        Self {
            collection: "documents".to_string(),
        }
    }
}

/// Top-level configuration, constructed once per process.
#[derive(Clone, Debug, PartialEq)]
pub struct VaultConfig {
    pub backend: BackendLocation,
    pub embedding: EmbeddingConfig,
    pub collections: CollectionDefaults,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            backend: BackendLocation::Memory,
            embedding: EmbeddingConfig::default(),
            collections: CollectionDefaults::default(),
        }
    }
}

impl VaultConfig {
    /// Build configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `DOCVAULT_DB_PATH` (selects the SQLite backend
    /// when set), `EMBEDDINGS_ENDPOINT`, `EMBEDDINGS_API_KEY`,
    /// `EMBEDDINGS_MODEL`, `EMBEDDINGS_DIMENSIONS`, `DOCVAULT_COLLECTION`.
    /// A `.env` file is honored when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let backend = Self::resolve_backend();
        let defaults = EmbeddingConfig::default();
        let embedding = EmbeddingConfig {
            endpoint: std::env::var("EMBEDDINGS_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: std::env::var("EMBEDDINGS_API_KEY").unwrap_or(defaults.api_key),
            model: std::env::var("EMBEDDINGS_MODEL").unwrap_or(defaults.model),
            dimensions: std::env::var("EMBEDDINGS_DIMENSIONS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.dimensions),
        };
        let collections = CollectionDefaults {
            collection: std::env::var("DOCVAULT_COLLECTION")
                .unwrap_or_else(|_| CollectionDefaults::default().collection),
        };

        Self {
            backend,
            embedding,
            collections,
        }
    }

    #[cfg(feature = "sqlite")]
    fn resolve_backend() -> BackendLocation {
        match std::env::var("DOCVAULT_DB_PATH") {
            Ok(path) => BackendLocation::Sqlite { path: path.into() },
            Err(_) => BackendLocation::Memory,
        }
    }

    #[cfg(not(feature = "sqlite"))]
    fn resolve_backend() -> BackendLocation {
        BackendLocation::Memory
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendLocation) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_default_collection(mut self, collection: impl Into<String>) -> Self {
        self.collections.collection = collection.into();
        self
    }
}
