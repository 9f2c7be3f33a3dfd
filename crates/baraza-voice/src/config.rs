use crate::engine::{CommandSpeechEngine, SilentSpeechEngine, SpeechEngine};
use crate::error::VoiceError;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn default_enabled() -> bool {
    true
}

fn default_binary() -> PathBuf {
    PathBuf::from("espeak-ng")
}

fn default_voice() -> String {
    "en-us".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

/// Speech output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// When `false`, responses are logged instead of spoken.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Synthesis command. Invoked as `<binary> -v <voice> [extra_args..] -- <text>`.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Voice identifier passed with `-v`. Empty means the engine default.
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Extra arguments inserted before the text.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Upper bound on one synthesis, in seconds. Exceeding it cancels the request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pending speech requests beyond this are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            binary: default_binary(),
            voice: default_voice(),
            extra_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the engine this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::Config`] if speech is enabled without a binary.
    pub fn build_engine(&self) -> Result<Arc<dyn SpeechEngine>, VoiceError> {
        if !self.enabled {
            return Ok(Arc::new(SilentSpeechEngine));
        }
        if self.binary.as_os_str().is_empty() {
            return Err(VoiceError::Config(
                "speech.binary must be set when speech is enabled".to_string(),
            ));
        }
        Ok(Arc::new(CommandSpeechEngine::new(self)))
    }
}
