//! archindex-store: vector-store persistence for indexed projects.
//!
//! - **symbol_store**: `SymbolStore`: project/file/symbol points, hash baselines, search
//! - **retry**: bounded exponential backoff for writes
//! - **qdrant**: `VectorClient` over the Qdrant REST API
//! - **memory**: in-process `VectorClient` with brute-force cosine search

pub mod memory;
pub mod qdrant;
pub mod retry;
pub mod symbol_store;

pub use memory::InMemoryVectorClient;
pub use qdrant::QdrantClient;
pub use retry::RetryPolicy;
pub use symbol_store::{SearchHit, StoredFile, SymbolStore, BATCH_SIZE, PAYLOAD_INDEXES};
