use crate::config::SpeechConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Maximum text input size for synthesis (64 KiB). Prevents resource exhaustion
/// from oversized responses.
pub const MAX_SPEECH_INPUT_BYTES: usize = 64 * 1024;

/// A speech-synthesis backend.
///
/// `synthesize` resolves once the audio has been rendered (or the attempt has
/// been abandoned). Implementations are shared across the process and must not
/// assume they are called from any particular task.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<(), VoiceError>;
}

fn check_input_size(text: &str) -> Result<(), VoiceError> {
    if text.len() > MAX_SPEECH_INPUT_BYTES {
        return Err(VoiceError::InputTooLarge {
            len: text.len(),
            limit: MAX_SPEECH_INPUT_BYTES,
        });
    }
    Ok(())
}

/// Speaks text through an external command that plays audio on the host's
/// default output device (`espeak-ng`, `espeak`, macOS `say`, ...).
///
/// Invoked as `<binary> [-v <voice>] [extra_args..] -- <text>`.
#[derive(Debug, Clone)]
pub struct CommandSpeechEngine {
    binary: PathBuf,
    voice: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl CommandSpeechEngine {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            voice: config.voice.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
        }
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(&self.binary);
        if !self.voice.is_empty() {
            command.arg("-v").arg(&self.voice);
        }
        command
            .args(&self.extra_args)
            // Text that starts with '-' must not be read as an option.
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // A timed-out child is killed when the wait future is dropped.
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    async fn synthesize(&self, text: &str) -> Result<(), VoiceError> {
        check_input_size(text)?;

        let child = self.command(text).spawn().map_err(|e| VoiceError::Synthesis {
            reason: format!("failed to spawn {:?}", self.binary),
            details: Some(e.to_string()),
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| VoiceError::Canceled {
                reason: format!(
                    "speech process timed out after {} seconds",
                    self.timeout.as_secs_f32()
                ),
            })?
            .map_err(|e| VoiceError::Synthesis {
                reason: format!("failed to wait for {:?}", self.binary),
                details: Some(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VoiceError::Synthesis {
                reason: format!("{:?} exited with {}", self.binary, output.status),
                details: (!stderr.is_empty()).then_some(stderr),
            });
        }

        Ok(())
    }
}

/// Engine used when speech output is disabled. Logs instead of speaking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeechEngine;

#[async_trait]
impl SpeechEngine for SilentSpeechEngine {
    async fn synthesize(&self, text: &str) -> Result<(), VoiceError> {
        check_input_size(text)?;
        tracing::debug!(text = %text, "speech disabled; skipping synthesis");
        Ok(())
    }
}
