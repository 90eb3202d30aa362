//! archindex-core: Shared types, traits, errors and configuration for the
//! project architecture indexer.

pub mod config;
pub mod error;
pub mod paths;
pub mod traits;
pub mod types;

pub use config::{EmbeddingConfig, IndexerConfig, StoreConfig};
pub use error::IndexerError;
pub use paths::{language_for_extension, language_for_path, validate_path, SUPPORTED_EXTENSIONS};
pub use traits::*;
pub use types::*;
