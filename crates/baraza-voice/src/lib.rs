//! Speech output for the Baraza gateway.
//!
//! Responses are spoken on the host through a [`SpeechEngine`]. The gateway
//! never waits on speech: it hands text to a [`SpeechDispatcher`], whose single
//! worker serializes synthesis and reports outcomes through `tracing` only.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;

pub use config::SpeechConfig;
pub use dispatcher::SpeechDispatcher;
pub use engine::{CommandSpeechEngine, SilentSpeechEngine, SpeechEngine, MAX_SPEECH_INPUT_BYTES};
pub use error::VoiceError;
