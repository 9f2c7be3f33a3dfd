use serde::Deserialize;
use std::time::Duration;

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_chroma_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_collection() -> String {
    "langchain".to_string()
}

fn default_model() -> String {
    "mistral".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    120
}

/// Knowledge-base and model settings. Fixed for the life of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    /// Base URL of the Ollama server used for embeddings and generation.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Base URL of the Chroma server holding the document index.
    #[serde(default = "default_chroma_url")]
    pub chroma_url: String,

    /// Chroma collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Generation model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model identifier. Must match the one the index was built with.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Number of passages retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            chroma_url: default_chroma_url(),
            collection: default_collection(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RagConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
