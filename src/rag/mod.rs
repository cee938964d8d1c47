//! Retrieval-augmented generation subsystem.
//!
//! Embedding providers, vector index clients (Pinecone and in-memory), the
//! ingestion splitter, and the [`KnowledgeBase`] that ties them together.

pub mod core;
pub mod embeddings;
pub mod knowledge_base;
pub mod memory;
pub mod pinecone;
pub mod splitter;
pub mod types;

pub use self::core::{BaseEmbedding, RagError, VectorStore};
pub use knowledge_base::{KnowledgeBase, Retrieval, DEFAULT_TOP_K};
pub use memory::InMemoryVectorStore;
pub use pinecone::PineconeClient;
pub use splitter::TextSplitter;
pub use types::{BaseRecord, SearchResult};
