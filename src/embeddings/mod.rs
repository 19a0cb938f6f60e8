//! Embedding provider boundary.
//!
//! The pipelines only require that a provider deterministically maps a text
//! string to a fixed-length vector. Two implementations ship with the crate:
//!
//! * [`RemoteEmbeddingProvider`] — HTTP client for OpenAI-style embedding
//!   endpoints.
//! * [`MockEmbeddingProvider`] — deterministic hash-derived vectors for
//!   tests and offline development.
//!
//! Retry and backoff policy deliberately lives with the caller; the core
//! surfaces provider failures once, tagged retryable or fatal.

pub mod remote;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

pub use remote::RemoteEmbeddingProvider;

/// Failure modes at the provider boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbedError {
    /// The provider could not be reached or answered with a server fault.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// The provider throttled the request.
    #[error("embedding provider rate limited: {0}")]
    RateLimited(String),

    /// The provider answered but the response was unusable.
    #[error("embedding provider returned a malformed response: {0}")]
    Malformed(String),
}

impl EmbedError {
    /// Whether a caller may reasonably retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::RateLimited(_))
    }
}

/// Maps text to fixed-length dense vectors.
///
/// Implementations must be deterministic for a given model version: the same
/// input text yields the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Output dimensionality of the active model.
    fn dimensions(&self) -> usize;
}

/// Deterministic provider for tests and offline development.
///
/// Vectors are derived from a hash of the input text, so identical texts map
/// to identical vectors across runs and processes. Call counting lets tests
/// assert that validation failures short-circuit before any provider call.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    texts_embedded: AtomicUsize,
    fail_after: Option<usize>,
}

impl MockEmbeddingProvider {
    pub const DEFAULT_DIMENSIONS: usize = 16;

    pub fn new() -> Self {
        Self::with_dimensions(Self::DEFAULT_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            texts_embedded: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Fail with [`EmbedError::Unavailable`] once `n` texts have been
    /// embedded. Used to exercise mid-batch provider failures.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Number of texts embedded so far (failed attempts excluded).
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, expanded with splitmix64 so every dimension differs.
        let mut seed: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.as_bytes() {
            seed ^= u64::from(*byte);
            seed = seed.wrapping_mul(0x0000_0100_0000_01b3);
        }
        (0..self.dimensions)
            .map(|_| {
                seed = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
                let mut z = seed;
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
                z ^= z >> 31;
                // Map into [-1, 1].
                (z as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }

    fn take_budget(&self, requested: usize) -> Result<(), EmbedError> {
        if let Some(limit) = self.fail_after {
            let done = self.texts_embedded.load(Ordering::SeqCst);
            if done + requested > limit {
                return Err(EmbedError::Unavailable(format!(
                    "mock provider failed after {limit} texts"
                )));
            }
        }
        self.texts_embedded.fetch_add(requested, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.take_budget(1)?;
        Ok(self.embed_one(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.take_budget(texts.len())?;
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
