use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("speech synthesis canceled: {reason}")]
    Canceled { reason: String },

    #[error("speech synthesis failed: {reason}")]
    Synthesis {
        reason: String,
        /// Provider-specific diagnostic output (e.g. the engine's stderr).
        details: Option<String>,
    },

    #[error("text exceeds maximum size: {len} bytes (limit: {limit} bytes)")]
    InputTooLarge { len: usize, limit: usize },
}

impl VoiceError {
    /// Diagnostic detail reported by the engine, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Synthesis { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}
