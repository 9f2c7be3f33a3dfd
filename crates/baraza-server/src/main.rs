//! Baraza server binary: the main entry point for the query gateway.
//!
//! Loads configuration, builds the process-wide backend and speech handles,
//! and serves the WebSocket endpoint with graceful shutdown on SIGTERM/SIGINT.

use baraza_rag::{QueryProcessor, RagQueryProcessor};
use baraza_server::config::{self, Config};
use baraza_server::{app, AppState};
use baraza_voice::SpeechDispatcher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for queued speech to finish.
const SPEECH_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("BARAZA_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // The blocking HTTP client must be built off the async executor.
    let rag_config = config.rag.clone();
    let processor = tokio::task::spawn_blocking(move || RagQueryProcessor::new(rag_config))
        .await
        .expect("backend client construction panicked")
        .expect("failed to build backend client; check rag settings in config");
    tracing::info!(
        ollama_url = %config.rag.ollama_url,
        chroma_url = %config.rag.chroma_url,
        collection = %config.rag.collection,
        model = %config.rag.model,
        embedding_model = %config.rag.embedding_model,
        "knowledge base configured"
    );
    let processor: Arc<dyn QueryProcessor> = Arc::new(processor);

    let engine = config
        .speech
        .build_engine()
        .expect("invalid speech settings; check the [speech] section of config");
    let (speech, speech_worker) = SpeechDispatcher::spawn(engine, config.speech.queue_capacity);
    tracing::info!(
        enabled = config.speech.enabled,
        binary = %config.speech.binary.display(),
        voice = %config.speech.voice,
        "speech output configured"
    );

    // Build application
    let state = AppState::new(processor.clone(), speech, &config);
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(
        %addr,
        ws_path = %config.server.ws_path,
        reply_mode = %config.gateway.reply_mode,
        busy_scope = %config.gateway.busy_scope,
        "starting baraza server"
    );

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    // Every dispatcher handle lived in the router, so the speech queue is now
    // closed; let the worker finish what is already queued.
    match tokio::time::timeout(SPEECH_DRAIN_TIMEOUT, speech_worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("speech worker failed: {}", e),
        Err(_) => tracing::warn!("speech queue did not drain before shutdown"),
    }

    // Drop the last backend handle where blocking is allowed.
    if let Err(e) = tokio::task::spawn_blocking(move || drop(processor)).await {
        tracing::warn!("backend client teardown failed: {}", e);
    }

    tracing::info!("baraza server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
