//! HTTP adapter for an Ollama model server and a Chroma document index.

use crate::config::RagConfig;
use crate::error::QueryError;
use crate::processor::QueryProcessor;
use crate::prompt::build_prompt;
use baraza_types::BackendResult;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Mutex;

/// Answer returned when retrieval finds nothing to ground the model on.
pub const NO_DOCUMENTS_RESPONSE: &str = "No relevant documents found";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Serialize)]
struct CollectionQuery<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 2],
}

/// Chroma returns one inner list per query embedding; we only ever send one.
#[derive(Deserialize)]
struct CollectionQueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// A retrieved passage and the id it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub id: String,
    pub text: String,
}

/// Retrieval-augmented answering over HTTP.
///
/// Uses a blocking client: construct, call, and drop it off the async
/// executor (for example inside `spawn_blocking`).
#[derive(Debug)]
pub struct RagQueryProcessor {
    config: RagConfig,
    client: Client,
    /// Resolved Chroma collection id, filled on first successful lookup.
    collection_id: Mutex<Option<String>>,
}

impl RagQueryProcessor {
    pub fn new(config: RagConfig) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| QueryError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            collection_id: Mutex::new(None),
        })
    }

    fn ollama(&self, path: &str) -> String {
        format!("{}{}", self.config.ollama_url.trim_end_matches('/'), path)
    }

    fn chroma(&self, path: &str) -> String {
        format!("{}{}", self.config.chroma_url.trim_end_matches('/'), path)
    }

    /// Embeds `text` with the configured embedding model.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, QueryError> {
        let body: EmbeddingResponse = self
            .client
            .post(self.ollama("/api/embeddings"))
            .json(&EmbeddingRequest {
                model: &self.config.embedding_model,
                prompt: text,
            })
            .send()?
            .error_for_status()?
            .json()?;
        if body.embedding.is_empty() {
            return Err(QueryError::Decode("empty embedding".to_string()));
        }
        Ok(body.embedding)
    }

    fn collection_id(&self) -> Result<String, QueryError> {
        let mut cached = self
            .collection_id
            .lock()
            .map_err(|_| QueryError::Other("collection id lock poisoned".to_string()))?;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let response = self
            .client
            .get(self.chroma(&format!(
                "/api/v1/collections/{}",
                self.config.collection
            )))
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QueryError::Collection(self.config.collection.clone()));
        }
        let info: CollectionInfo = response.error_for_status()?.json()?;
        tracing::debug!(
            collection = %self.config.collection,
            id = %info.id,
            "resolved chroma collection"
        );
        *cached = Some(info.id.clone());
        Ok(info.id)
    }

    /// Returns up to `top_k` passages nearest to `embedding`, best first.
    pub fn nearest_passages(&self, embedding: &[f32]) -> Result<Vec<Passage>, QueryError> {
        let id = self.collection_id()?;
        let body: CollectionQueryResponse = self
            .client
            .post(self.chroma(&format!("/api/v1/collections/{}/query", id)))
            .json(&CollectionQuery {
                query_embeddings: [embedding],
                n_results: self.config.top_k,
                include: ["documents", "distances"],
            })
            .send()?
            .error_for_status()?
            .json()?;

        let ids = body.ids.into_iter().next().unwrap_or_default();
        let documents = body
            .documents
            .and_then(|docs| docs.into_iter().next())
            .unwrap_or_default();

        Ok(ids
            .into_iter()
            .zip(documents)
            .filter_map(|(id, text)| text.map(|text| Passage { id, text }))
            .collect())
    }

    /// Runs the generation model on `prompt`.
    pub fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let body: GenerateResponse = self
            .client
            .post(self.ollama("/api/generate"))
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: false,
            })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(body.response)
    }
}

impl QueryProcessor for RagQueryProcessor {
    fn process(&self, query: &str) -> Result<BackendResult, QueryError> {
        let embedding = self.embed(query)?;
        let passages = self.nearest_passages(&embedding)?;
        if passages.is_empty() {
            tracing::info!(query_len = query.len(), "no relevant documents found");
            return Ok(BackendResult::Structured(json!({
                "response": NO_DOCUMENTS_RESPONSE,
                "sources": [],
            })));
        }

        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        let prompt = build_prompt(&texts, query);
        let answer = self.generate(&prompt)?;
        tracing::info!(
            passages = passages.len(),
            answer_len = answer.len(),
            "generated answer"
        );

        let sources: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        Ok(BackendResult::Structured(json!({
            "response": answer,
            "sources": sources,
        })))
    }
}
