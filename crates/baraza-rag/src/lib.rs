//! Retrieval+generation boundary for the Baraza gateway.
//!
//! The gateway only knows the [`QueryProcessor`] trait. [`RagQueryProcessor`]
//! is the production implementation: it embeds the query with an Ollama
//! embedding model, pulls the nearest passages from a Chroma collection, and
//! asks an Ollama generation model to answer from those passages alone.

pub mod client;
pub mod config;
pub mod error;
pub mod processor;
pub mod prompt;

pub use client::{Passage, RagQueryProcessor, NO_DOCUMENTS_RESPONSE};
pub use config::RagConfig;
pub use error::QueryError;
pub use processor::QueryProcessor;
pub use prompt::build_prompt;
