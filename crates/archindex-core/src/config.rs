//! Persistent configuration for archindex.
//!
//! Loads/saves a TOML config at `~/.archindex/config.toml`, then overlays
//! environment variables on top.

use crate::IndexerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default ceiling for files the scanner will hand to the parser (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default allow-list root when nothing is configured.
pub const DEFAULT_ALLOWED_ROOT: &str = "/opt/projects";

/// Top-level archindex configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Directories under which indexing is permitted.
    pub allowed_roots: Vec<PathBuf>,
    /// Base override for YAML output; `{output_dir}/{project_name}` when set.
    pub output_dir: Option<PathBuf>,
    /// Files larger than this are never parsed.
    pub max_file_size: u64,
    /// Exclude globs applied when a request does not supply its own.
    pub default_excludes: Vec<String>,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            allowed_roots: vec![PathBuf::from(DEFAULT_ALLOWED_ROOT)],
            output_dir: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_excludes: default_excludes(),
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Exclude globs that are always sensible for source trees.
pub fn default_excludes() -> Vec<String> {
    [
        ".git/**",
        "node_modules/**",
        "__pycache__/**",
        "*.pyc",
        ".venv/**",
        "venv/**",
        "dist/**",
        "build/**",
        ".agents/**",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl IndexerConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, IndexerError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| IndexerError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), IndexerError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IndexerError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default config path: `~/.archindex/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".archindex")
            .join("config.toml")
    }

    /// Overlay environment variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment variables using the given lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let value = lookup(key).filter(|v| !v.trim().is_empty());
            if value.is_some() {
                // Values may be credentials; only the key is logged.
                tracing::debug!("Config override from ${key}");
            }
            value
        };

        if let Some(roots) = get("ALLOWED_INDEX_ROOTS") {
            let parsed: Vec<PathBuf> = roots
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
            if !parsed.is_empty() {
                self.allowed_roots = parsed;
            }
        }
        if let Some(dir) = get("INDEXER_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = get("QDRANT_URL") {
            self.store.url = url;
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.store.api_key = Some(key);
        }
        if let Some(provider) = get("ARCHINDEX_EMBED_PROVIDER") {
            self.embedding.provider = provider.to_lowercase();
        }
        if let Some(model) = get("ARCHINDEX_EMBED_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = get("ARCHINDEX_EMBED_URL") {
            self.embedding.url = url;
        }
        if let Some(key) = get("ARCHINDEX_EMBED_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.embedding.api_key = Some(key);
        }
    }

    /// Where YAML snapshots for a project are written.
    pub fn output_dir_for(&self, project_root: &Path, project_name: &str) -> PathBuf {
        match &self.output_dir {
            Some(base) => base.join(project_name),
            None => project_root.join(".agents").join("architecture"),
        }
    }
}

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the Qdrant REST API.
    pub url: String,
    pub collection: String,
    pub vector_size: usize,
    pub timeout_secs: u64,
    /// Total attempts for a mutating call (first try included).
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "project_architecture".to_string(),
            vector_size: 1024,
            timeout_secs: 30,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            api_key: None,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "none" (default), "ollama", or "openai".
    pub provider: String,
    /// Model name (provider-specific).
    pub model: String,
    /// API URL for remote providers. Empty means the provider default.
    pub url: String,
    /// Embedding dimensions.
    pub dimensions: usize,
    /// LRU cache capacity.
    pub cache_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: String::new(),
            url: String::new(),
            dimensions: 1024,
            cache_capacity: 10_000,
            api_key: None,
        }
    }
}
