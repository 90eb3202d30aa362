//! archindex-embeddings: Pluggable embedding providers for semantic symbol search.
//!
//! Supports multiple backends:
//! - **Ollama**: Local Ollama server with any embedding model
//! - **OpenAI**: OpenAI API or any compatible endpoint (Together, Azure, etc.)
//!
//! With no provider configured the store falls back to placeholder vectors.

pub mod ollama;
pub mod openai;

use archindex_core::{EmbeddingConfig, IndexerError};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

/// Default embedding dimensions (matches the symbol collection).
pub const DIMENSIONS: usize = 1024;

/// Default LRU cache capacity.
pub const CACHE_CAPACITY: usize = 10_000;

// ── Embedding Provider Trait ────────────────────────────────────────────────

/// Trait for pluggable embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embedding vector dimensions.
    fn dimensions(&self) -> usize;

    /// Embed a single text string.
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexerError>;

    /// Embed a batch of texts (default: sequential).
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexerError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Provider name for display.
    fn name(&self) -> &str;

    /// Cache statistics: (current_size, capacity). Returns (0, 0) if no cache.
    fn cache_stats(&self) -> (usize, usize) {
        (0, 0)
    }
}

// ── Cached Provider Wrapper ───────────────────────────────────────────────

/// Wraps any `EmbeddingProvider` with an LRU cache.
pub struct CachedProvider {
    inner: Box<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl CachedProvider {
    pub fn new(inner: Box<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    fn cache(&self) -> MutexGuard<'_, LruCache<String, Vec<f32>>> {
        // A poisoned cache is still a valid cache.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EmbeddingProvider for CachedProvider {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexerError> {
        if let Some(cached) = self.cache().get(text) {
            return Ok(cached.clone());
        }
        let embedding = self.inner.embed(text)?;
        self.cache().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexerError> {
        // Check cache, only forward uncached texts
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached = Vec::new();
        let mut uncached_idx = Vec::new();

        {
            let mut cache = self.cache();
            for (i, text) in texts.iter().enumerate() {
                if let Some(cached) = cache.get(*text) {
                    results[i] = Some(cached.clone());
                } else {
                    uncached_idx.push(i);
                    uncached.push(*text);
                }
            }
        }

        if !uncached.is_empty() {
            let new_embeddings = self.inner.embed_batch(&uncached)?;
            if new_embeddings.len() != uncached.len() {
                return Err(IndexerError::Embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    self.inner.name(),
                    new_embeddings.len(),
                    uncached.len()
                )));
            }
            let mut cache = self.cache();
            for (idx, embedding) in uncached_idx.into_iter().zip(new_embeddings) {
                cache.put(texts[idx].to_string(), embedding.clone());
                results[idx] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache();
        (cache.len(), cache.cap().into())
    }
}

// ── Factory ───────────────────────────────────────────────────────────────

/// Build the configured provider, wrapped in an LRU cache.
///
/// Returns `Ok(None)` for provider `none` (or empty): symbols are stored with
/// placeholder vectors and search is unavailable.
pub fn from_config(
    config: &EmbeddingConfig,
) -> Result<Option<Box<dyn EmbeddingProvider>>, IndexerError> {
    let provider = config.provider.trim().to_lowercase();
    let model = (!config.model.is_empty()).then_some(config.model.as_str());
    let url = (!config.url.is_empty()).then_some(config.url.as_str());
    let dimensions = if config.dimensions == 0 {
        DIMENSIONS
    } else {
        config.dimensions
    };

    let inner: Box<dyn EmbeddingProvider> = match provider.as_str() {
        "none" | "" => return Ok(None),
        "ollama" => Box::new(ollama::OllamaProvider::new(
            url.unwrap_or(ollama::DEFAULT_BASE_URL),
            model.unwrap_or(ollama::DEFAULT_MODEL),
            dimensions,
        )),
        "openai" => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                IndexerError::Config(
                    "ARCHINDEX_EMBED_API_KEY or OPENAI_API_KEY required for OpenAI embeddings"
                        .into(),
                )
            })?;
            Box::new(openai::OpenAIProvider::new(
                api_key,
                model.unwrap_or(openai::DEFAULT_MODEL),
                dimensions,
                url,
            ))
        }
        other => {
            return Err(IndexerError::Config(format!(
                "Unknown embedding provider: '{}'. Use 'none', 'ollama', or 'openai'.",
                other
            )))
        }
    };

    tracing::info!(
        "Embedding provider: {} ({} dimensions)",
        inner.name(),
        inner.dimensions()
    );
    let capacity = if config.cache_capacity == 0 {
        CACHE_CAPACITY
    } else {
        config.cache_capacity
    };
    Ok(Some(Box::new(CachedProvider::new(inner, capacity))))
}
