//! Server configuration loading from file and environment variables.

use baraza_rag::RagConfig;
use baraza_types::{BusyScope, ReplyMode};
use baraza_voice::SpeechConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Reply and busy-gating behavior.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge base and model settings.
    #[serde(default)]
    pub rag: RagConfig,

    /// Speech output settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP/WebSocket listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the query WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Largest accepted incoming WebSocket message, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

/// How the gateway answers and admits queries.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// `echo` sends every answer back to the client; `speak_only` only speaks it.
    #[serde(default)]
    pub reply_mode: ReplyMode,

    /// `session` gives every connection its own dispatch slot; `process`
    /// shares one admission gate across all connections.
    #[serde(default)]
    pub busy_scope: BusyScope,

    /// Concurrent backend calls admitted by the process-wide gate.
    /// Ignored in `session` scope.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "baraza_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8001
}

fn default_ws_path() -> String {
    "/ws/llm_response".to_string()
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}

fn default_max_in_flight() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            reply_mode: ReplyMode::default(),
            busy_scope: BusyScope::default(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Rejects values the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.ws_path must start with '/': {:?}",
                self.server.ws_path
            )));
        }
        if self.server.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_frame_bytes must be greater than zero".to_string(),
            ));
        }
        if self.gateway.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "gateway.max_in_flight must be greater than zero".to_string(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid(
                "rag.top_k must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BARAZA_HOST` overrides `server.host`
/// - `BARAZA_PORT` overrides `server.port`
/// - `BARAZA_WS_PATH` overrides `server.ws_path`
/// - `BARAZA_REPLY_MODE` overrides `gateway.reply_mode` (`echo` | `speak_only`)
/// - `BARAZA_BUSY_SCOPE` overrides `gateway.busy_scope` (`session` | `process`)
/// - `OLLAMA_HOST` overrides `rag.ollama_url`
/// - `BARAZA_MODEL` overrides `rag.model`
/// - `BARAZA_EMBEDDING_MODEL` overrides `rag.embedding_model`
/// - `BARAZA_CHROMA_URL` overrides `rag.chroma_url`
/// - `BARAZA_COLLECTION` overrides `rag.collection`
/// - `BARAZA_SPEECH_ENABLED` overrides `speech.enabled`
/// - `BARAZA_VOICE` overrides `speech.voice`
/// - `BARAZA_LOG_LEVEL` overrides `logging.level`
/// - `BARAZA_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting configuration is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Applies overrides from `lookup`, which maps a variable name to its value.
///
/// Values that do not parse are ignored and the file/default value is kept.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(parsed) = lookup("BARAZA_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = lookup("BARAZA_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(path) = lookup("BARAZA_WS_PATH") {
        config.server.ws_path = path;
    }
    if let Some(mode) = lookup("BARAZA_REPLY_MODE") {
        match mode.parse() {
            Ok(parsed) => config.gateway.reply_mode = parsed,
            Err(e) => tracing::warn!("ignoring BARAZA_REPLY_MODE: {}", e),
        }
    }
    if let Some(scope) = lookup("BARAZA_BUSY_SCOPE") {
        match scope.parse() {
            Ok(parsed) => config.gateway.busy_scope = parsed,
            Err(e) => tracing::warn!("ignoring BARAZA_BUSY_SCOPE: {}", e),
        }
    }
    if let Some(url) = lookup("OLLAMA_HOST") {
        config.rag.ollama_url = url;
    }
    if let Some(model) = lookup("BARAZA_MODEL") {
        config.rag.model = model;
    }
    if let Some(model) = lookup("BARAZA_EMBEDDING_MODEL") {
        config.rag.embedding_model = model;
    }
    if let Some(url) = lookup("BARAZA_CHROMA_URL") {
        config.rag.chroma_url = url;
    }
    if let Some(collection) = lookup("BARAZA_COLLECTION") {
        config.rag.collection = collection;
    }
    if let Some(enabled) = lookup("BARAZA_SPEECH_ENABLED") {
        config.speech.enabled = enabled == "true" || enabled == "1";
    }
    if let Some(voice) = lookup("BARAZA_VOICE") {
        config.speech.voice = voice;
    }
    if let Some(level) = lookup("BARAZA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("BARAZA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
