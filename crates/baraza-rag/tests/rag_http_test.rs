//! Integration tests for the HTTP retrieval+generation adapter.
//!
//! A fake server speaks just enough of the Ollama and Chroma APIs to drive
//! `RagQueryProcessor` end to end. The blocking client is created, used, and
//! dropped inside `spawn_blocking`, as it would be in the gateway.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use baraza_rag::{QueryError, QueryProcessor, RagConfig, RagQueryProcessor, NO_DOCUMENTS_RESPONSE};
use baraza_types::BackendResult;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeBackend {
    /// (id, text) pairs returned by every collection query.
    passages: Vec<(String, String)>,
    /// Request bodies seen by each endpoint, in arrival order.
    embed_requests: Mutex<Vec<Value>>,
    query_requests: Mutex<Vec<Value>>,
    generate_requests: Mutex<Vec<Value>>,
    collection_lookups: Mutex<u32>,
    fail_generation: bool,
}

async fn embeddings(State(fake): State<Arc<FakeBackend>>, Json(body): Json<Value>) -> Json<Value> {
    fake.embed_requests.lock().unwrap().push(body);
    Json(json!({ "embedding": [0.25, -0.5, 1.0] }))
}

async fn collection(
    State(fake): State<Arc<FakeBackend>>,
    Path(collection): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    *fake.collection_lookups.lock().unwrap() += 1;
    if collection == "governance" {
        Ok(Json(json!({ "id": "col-123", "name": collection })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn query(
    State(fake): State<Arc<FakeBackend>>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if collection != "col-123" {
        return Err(StatusCode::NOT_FOUND);
    }
    fake.query_requests.lock().unwrap().push(body);
    let ids: Vec<&str> = fake.passages.iter().map(|(id, _)| id.as_str()).collect();
    let docs: Vec<&str> = fake.passages.iter().map(|(_, text)| text.as_str()).collect();
    let distances = vec![0.1_f64; ids.len()];
    Ok(Json(json!({
        "ids": [ids],
        "documents": [docs],
        "distances": [distances],
    })))
}

async fn generate(
    State(fake): State<Arc<FakeBackend>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    fake.generate_requests.lock().unwrap().push(body);
    if fake.fail_generation {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(json!({ "response": "Policy text...", "done": true })))
}

async fn spawn_fake(fake: Arc<FakeBackend>) -> SocketAddr {
    let app = Router::new()
        .route("/api/embeddings", post(embeddings))
        .route("/api/generate", post(generate))
        .route("/api/v1/collections/{collection}", get(collection))
        .route("/api/v1/collections/{collection}/query", post(query))
        .with_state(fake);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr, collection: &str) -> RagConfig {
    RagConfig {
        ollama_url: format!("http://{}", addr),
        chroma_url: format!("http://{}/", addr),
        collection: collection.to_string(),
        top_k: 3,
        timeout_secs: 5,
        ..RagConfig::default()
    }
}

/// Runs `queries` through one processor on the blocking pool.
async fn run_queries(
    config: RagConfig,
    queries: Vec<&'static str>,
) -> Vec<Result<BackendResult, QueryError>> {
    tokio::task::spawn_blocking(move || {
        let processor = RagQueryProcessor::new(config).expect("client should build");
        queries.into_iter().map(|q| processor.process(q)).collect()
    })
    .await
    .expect("blocking task panicked")
}

#[tokio::test]
async fn answers_from_retrieved_passages() {
    let fake = Arc::new(FakeBackend {
        passages: vec![
            ("doc-1".to_string(), "Procurement must be tendered.".to_string()),
            ("doc-2".to_string(), "Audits happen yearly.".to_string()),
        ],
        ..FakeBackend::default()
    });
    let addr = spawn_fake(fake.clone()).await;

    let mut results = run_queries(
        config_for(addr, "governance"),
        vec!["What is the governance policy on X?"],
    )
    .await;
    let result = results.remove(0).expect("query should succeed");

    assert_eq!(
        result,
        BackendResult::Structured(json!({
            "response": "Policy text...",
            "sources": ["doc-1", "doc-2"],
        }))
    );

    let embeds = fake.embed_requests.lock().unwrap();
    assert_eq!(embeds[0]["model"], "nomic-embed-text");
    assert_eq!(embeds[0]["prompt"], "What is the governance policy on X?");

    let queries = fake.query_requests.lock().unwrap();
    assert_eq!(queries[0]["n_results"], 3);
    assert_eq!(queries[0]["query_embeddings"], json!([[0.25, -0.5, 1.0]]));

    let generations = fake.generate_requests.lock().unwrap();
    assert_eq!(generations[0]["model"], "mistral");
    assert_eq!(generations[0]["stream"], false);
    let prompt = generations[0]["prompt"].as_str().unwrap();
    assert!(prompt.contains("Procurement must be tendered.\n\n---\n\nAudits happen yearly."));
    assert!(prompt.contains("context: What is the governance policy on X?"));
}

#[tokio::test]
async fn empty_retrieval_skips_generation() {
    let fake = Arc::new(FakeBackend::default());
    let addr = spawn_fake(fake.clone()).await;

    let mut results = run_queries(config_for(addr, "governance"), vec!["anything?"]).await;
    let result = results.remove(0).expect("query should succeed");

    assert_eq!(
        result,
        BackendResult::Structured(json!({
            "response": NO_DOCUMENTS_RESPONSE,
            "sources": [],
        }))
    );
    assert!(fake.generate_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn collection_id_is_resolved_once() {
    let fake = Arc::new(FakeBackend {
        passages: vec![("doc-1".to_string(), "text".to_string())],
        ..FakeBackend::default()
    });
    let addr = spawn_fake(fake.clone()).await;

    let results = run_queries(config_for(addr, "governance"), vec!["one", "two", "three"]).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(*fake.collection_lookups.lock().unwrap(), 1);
}

#[tokio::test]
async fn unknown_collection_is_reported() {
    let fake = Arc::new(FakeBackend::default());
    let addr = spawn_fake(fake).await;

    let mut results = run_queries(config_for(addr, "missing"), vec!["q"]).await;
    match results.remove(0) {
        Err(QueryError::Collection(name)) => assert_eq!(name, "missing"),
        other => panic!("expected Collection error, got {:?}", other),
    }
}

#[tokio::test]
async fn generation_failure_is_an_error() {
    let fake = Arc::new(FakeBackend {
        passages: vec![("doc-1".to_string(), "text".to_string())],
        fail_generation: true,
        ..FakeBackend::default()
    });
    let addr = spawn_fake(fake).await;

    let mut results = run_queries(config_for(addr, "governance"), vec!["q"]).await;
    assert!(matches!(results.remove(0), Err(QueryError::Http(_))));
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    // Bind then drop a listener so the port is very likely closed.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut results = run_queries(config_for(addr, "governance"), vec!["q"]).await;
    assert!(results.remove(0).is_err());
}
