//! Fire-and-forget speech scheduling.
//!
//! A single worker task owns the engine and drains a bounded queue, so
//! synthesis runs strictly in submission order and two responses are never
//! spoken over each other. Callers only ever enqueue.

use crate::engine::SpeechEngine;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle for submitting text to the speech worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SpeechDispatcher {
    tx: mpsc::Sender<String>,
}

impl SpeechDispatcher {
    /// Starts the worker on the current runtime.
    ///
    /// The worker exits once every `SpeechDispatcher` clone has been dropped
    /// and the queue is drained; await the returned handle to wait for that.
    pub fn spawn(engine: Arc<dyn SpeechEngine>, queue_capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<String>(queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(engine, rx));
        (Self { tx }, worker)
    }

    /// Queues `text` for synthesis and returns immediately.
    ///
    /// Returns `false` if the request was dropped (queue full or worker gone).
    /// The outcome of synthesis itself is only ever logged.
    pub fn speak(&self, text: impl Into<String>) -> bool {
        match self.tx.try_send(text.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(text)) => {
                tracing::warn!(
                    text_len = text.len(),
                    "speech queue full; dropping speech request"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("speech worker stopped; dropping speech request");
                false
            }
        }
    }
}

async fn run_worker(engine: Arc<dyn SpeechEngine>, mut rx: mpsc::Receiver<String>) {
    while let Some(text) = rx.recv().await {
        let outcome = AssertUnwindSafe(engine.synthesize(&text))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                tracing::info!(text_len = text.len(), "speech synthesized");
                tracing::debug!(text = %text, "synthesized text");
            }
            Ok(Err(e)) if e.is_cancellation() => {
                tracing::error!(text_len = text.len(), "speech synthesis canceled: {}", e);
            }
            Ok(Err(e)) => {
                tracing::error!(text_len = text.len(), "{}", e);
                if let Some(details) = e.details() {
                    tracing::error!(details = %details, "speech engine error details");
                }
            }
            Err(_) => {
                tracing::error!(text_len = text.len(), "speech engine panicked");
            }
        }
    }
    tracing::debug!("speech queue closed; worker exiting");
}
