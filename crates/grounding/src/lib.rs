//! Retrieval and grounding for building-code question answering.
//!
//! A chat request flows through:
//! - [`CategoryMap`]: category codes to document identifiers
//! - [`SourceFilterBuilder`]: identifiers to a source filter
//! - [`GroundedRetriever`]: filtered similarity search with a one-shot capture
//! - [`HistoryFormatter`]: prior turns to a transcript
//! - [`AnswerService`]: orchestration, producing a [`ChatResponse`]

pub mod answer;
pub mod categories;
pub mod chain;
pub mod embeddings;
pub mod filter;
pub mod history;
pub mod index;
pub mod lancedb_index;
pub mod memory_index;
pub mod pinecone_index;
pub mod retriever;
pub mod types;
pub mod vector_index;

pub use answer::AnswerService;
pub use categories::CategoryMap;
pub use chain::{AnswerGenerator, ConversationalChain};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use filter::{SourceFilter, SourceFilterBuilder};
pub use history::HistoryFormatter;
pub use index::open_index;
pub use lancedb_index::LanceDbIndex;
pub use memory_index::MemoryIndex;
pub use pinecone_index::PineconeIndex;
pub use retriever::{DocumentCapture, GroundedRetriever, Retriever};
pub use types::{ChatRequest, ChatResponse, ConversationTurn, RetrievedDocument};
pub use vector_index::VectorIndex;
