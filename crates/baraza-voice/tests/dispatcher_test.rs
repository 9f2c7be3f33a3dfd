//! Behavior tests for the single-worker speech dispatcher.
//!
//! These use in-process fake engines so ordering, latency, and failure
//! isolation can be observed without touching an audio device.

use async_trait::async_trait;
use baraza_voice::{SpeechDispatcher, SpeechEngine, VoiceError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, Semaphore};

/// Records every text it is asked to speak, after an artificial delay, and
/// tracks how many syntheses overlap.
#[derive(Default)]
struct RecordingEngine {
    delay: Duration,
    spoken: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingEngine {
    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for RecordingEngine {
    async fn synthesize(&self, text: &str) -> Result<(), VoiceError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.spoken.lock().unwrap().push(text.to_string());
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails or panics on chosen inputs, records the rest.
#[derive(Default)]
struct FlakyEngine {
    spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechEngine for FlakyEngine {
    async fn synthesize(&self, text: &str) -> Result<(), VoiceError> {
        match text {
            "cancel" => Err(VoiceError::Canceled {
                reason: "device unavailable".to_string(),
            }),
            "error" => Err(VoiceError::Synthesis {
                reason: "engine exited with 1".to_string(),
                details: Some("no such voice".to_string()),
            }),
            "panic" => panic!("engine blew up"),
            _ => {
                self.spoken.lock().unwrap().push(text.to_string());
                Ok(())
            }
        }
    }
}

/// Blocks inside `synthesize` until released, announcing when it starts.
struct GatedEngine {
    started: Notify,
    release: Semaphore,
}

#[async_trait]
impl SpeechEngine for GatedEngine {
    async fn synthesize(&self, _text: &str) -> Result<(), VoiceError> {
        self.started.notify_one();
        let permit = self.release.acquire().await.expect("semaphore closed");
        permit.forget();
        Ok(())
    }
}

#[tokio::test]
async fn speak_returns_before_synthesis_completes() {
    let engine = RecordingEngine::with_delay(Duration::from_millis(500));
    let (dispatcher, worker) = SpeechDispatcher::spawn(engine.clone(), 8);

    let started = Instant::now();
    assert!(dispatcher.speak("a slow sentence"));
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(100),
        "speak blocked for {:?}",
        elapsed
    );
    assert!(engine.spoken().is_empty(), "synthesis finished too early");

    drop(dispatcher);
    worker.await.expect("worker should not panic");
    assert_eq!(engine.spoken(), vec!["a slow sentence"]);
}

#[tokio::test]
async fn requests_are_spoken_in_submission_order_without_overlap() {
    let engine = RecordingEngine::with_delay(Duration::from_millis(20));
    let (dispatcher, worker) = SpeechDispatcher::spawn(engine.clone(), 8);

    for text in ["A", "B", "C", "D"] {
        assert!(dispatcher.speak(text));
    }

    drop(dispatcher);
    worker.await.expect("worker should not panic");

    assert_eq!(engine.spoken(), vec!["A", "B", "C", "D"]);
    assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clones_share_one_worker() {
    let engine = RecordingEngine::with_delay(Duration::from_millis(10));
    let (first, worker) = SpeechDispatcher::spawn(engine.clone(), 8);
    let second = first.clone();

    let a = tokio::spawn(async move { first.speak("from first") });
    let b = tokio::spawn(async move { second.speak("from second") });
    assert!(a.await.unwrap());
    assert!(b.await.unwrap());

    worker.await.expect("worker should not panic");
    let mut spoken = engine.spoken();
    spoken.sort();
    assert_eq!(spoken, vec!["from first", "from second"]);
    assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failures_and_panics_do_not_stop_the_worker() {
    let engine = Arc::new(FlakyEngine::default());
    let (dispatcher, worker) = SpeechDispatcher::spawn(engine.clone(), 8);

    for text in ["first", "cancel", "error", "panic", "last"] {
        assert!(dispatcher.speak(text));
    }

    drop(dispatcher);
    worker.await.expect("worker should survive engine failures");
    assert_eq!(*engine.spoken.lock().unwrap(), vec!["first", "last"]);
}

#[tokio::test]
async fn full_queue_drops_requests_without_blocking() {
    let engine = Arc::new(GatedEngine {
        started: Notify::new(),
        release: Semaphore::new(0),
    });
    let (dispatcher, worker) = SpeechDispatcher::spawn(engine.clone(), 1);

    assert!(dispatcher.speak("occupies the worker"));
    engine.started.notified().await;

    assert!(dispatcher.speak("waits in the queue"));
    assert!(!dispatcher.speak("no room left"));

    engine.release.add_permits(2);
    drop(dispatcher);
    worker.await.expect("worker should not panic");
}
