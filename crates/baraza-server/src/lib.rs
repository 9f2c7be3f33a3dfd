//! Baraza gateway server library logic.
//!
//! Clients connect over a WebSocket, send one query per text frame, and get
//! back the normalized answer (or a busy/failure notice). Answers are also
//! spoken on the host through the speech dispatcher.

pub mod config;
pub mod gate;
pub mod normalize;
pub mod session;

use axum::{routing::get, Extension, Json, Router};
use baraza_rag::QueryProcessor;
use baraza_types::{BusyScope, ReplyMode};
use baraza_voice::SpeechDispatcher;
use config::Config;
use gate::BusyGate;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Immutable per-process gateway behavior, taken from [`Config`] at startup.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Path of the query WebSocket endpoint.
    pub ws_path: String,
    /// Largest accepted incoming message, in bytes.
    pub max_frame_bytes: usize,
    /// Whether answers are echoed to the client.
    pub reply_mode: ReplyMode,
    /// Who owns the dispatch slot.
    pub busy_scope: BusyScope,
}

impl From<&Config> for GatewaySettings {
    fn from(config: &Config) -> Self {
        Self {
            ws_path: config.server.ws_path.clone(),
            max_frame_bytes: config.server.max_frame_bytes,
            reply_mode: config.gateway.reply_mode,
            busy_scope: config.gateway.busy_scope,
        }
    }
}

/// Application state shared across all connections.
#[derive(Clone)]
pub struct AppState {
    /// Retrieval+generation backend. Only ever called from the blocking pool.
    pub processor: Arc<dyn QueryProcessor>,
    /// Speech output queue.
    pub speech: SpeechDispatcher,
    /// Gateway behavior.
    pub settings: GatewaySettings,
    /// Admission gate shared by all sessions in `process` busy scope.
    pub process_gate: BusyGate,
}

impl AppState {
    pub fn new(
        processor: Arc<dyn QueryProcessor>,
        speech: SpeechDispatcher,
        config: &Config,
    ) -> Self {
        Self {
            processor,
            speech,
            settings: GatewaySettings::from(config),
            process_gate: BusyGate::new(config.gateway.max_in_flight),
        }
    }

    /// The gate a new session should admit its queries through.
    pub fn session_gate(&self) -> BusyGate {
        match self.settings.busy_scope {
            BusyScope::Session => BusyGate::single(),
            BusyScope::Process => self.process_gate.clone(),
        }
    }
}

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "reply_mode": state.settings.reply_mode,
        "busy_scope": state.settings.busy_scope,
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let ws_path = state.settings.ws_path.clone();
    Router::new()
        .route("/health", get(health))
        .route(&ws_path, get(session::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
