// Integration tests for the transcription listener: utterance segmentation
// over scripted audio, the error taxonomy (unintelligible vs. service
// failure), and the best-effort cancellation contract.

mod common;

use common::{drain, recv_timeout, silence, tone, ScriptedSource, SAMPLE_RATE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stutter_live::{
    event_channel, ListenerConfig, RecognizeError, SessionEvent, TranscriptionEngine,
    TranscriptionService,
};

fn block_silence() -> Vec<f32> {
    silence(0.02, SAMPLE_RATE)
}

fn block_loud() -> Vec<f32> {
    tone(440.0, 0.02, SAMPLE_RATE, 0.5)
}

fn listener_config() -> ListenerConfig {
    ListenerConfig {
        calibration: Duration::from_millis(20),
        block: Duration::from_millis(20),
        threshold_floor: 0.01,
        threshold_factor: 2.0,
        trailing_silence: Duration::from_millis(40),
        max_utterance: Duration::from_secs(1),
    }
}

/// Calibration window plus one gated utterance (two voiced blocks closed by
/// two silent ones).
fn one_utterance_script() -> Vec<Vec<f32>> {
    vec![
        block_silence(), // calibration
        block_silence(),
        block_loud(),
        block_loud(),
        block_silence(),
        block_silence(),
    ]
}

/// Replays canned decode results, then reports everything else as
/// unintelligible.
struct ScriptedEngine {
    responses: Mutex<VecDeque<Result<String, RecognizeError>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    fn new(responses: Vec<Result<String, RecognizeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl TranscriptionEngine for ScriptedEngine {
    fn recognize(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, RecognizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(Err(RecognizeError::Unintelligible))
    }
}

/// Always decodes to the same text, after an optional delay.
struct ConstantEngine {
    text: String,
    delay: Duration,
}

impl TranscriptionEngine for ConstantEngine {
    fn recognize(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, RecognizeError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.text.clone())
    }
}

#[test]
fn test_utterance_is_decoded_and_emitted() {
    let source = Arc::new(ScriptedSource::new(one_utterance_script()));
    let engine = Arc::new(ScriptedEngine::new(vec![Ok("hello world".to_string())]));
    let (events, mut rx) = event_channel();
    let utterances = Arc::new(AtomicUsize::new(0));

    let handle = TranscriptionService::start(
        source,
        engine.clone(),
        listener_config(),
        events,
        Arc::clone(&utterances),
    );

    assert_eq!(
        recv_timeout(&mut rx, Duration::from_secs(1)).expect("transcription event"),
        SessionEvent::Transcription {
            text: "hello world".to_string()
        }
    );
    assert!(recv_timeout(&mut rx, Duration::from_millis(200)).is_none());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(utterances.load(Ordering::SeqCst), 1);

    handle.cancel();
}

#[test]
fn test_unintelligible_utterance_is_dropped_silently() {
    let mut script = one_utterance_script();
    // A second gated utterance follows the first.
    script.extend([
        block_loud(),
        block_silence(),
        block_silence(),
    ]);

    let source = Arc::new(ScriptedSource::new(script));
    let engine = Arc::new(ScriptedEngine::new(vec![
        Err(RecognizeError::Unintelligible),
        Ok("second utterance".to_string()),
    ]));
    let (events, mut rx) = event_channel();
    let utterances = Arc::new(AtomicUsize::new(0));

    let handle = TranscriptionService::start(
        source,
        engine.clone(),
        listener_config(),
        events,
        Arc::clone(&utterances),
    );

    // Only the second utterance surfaces; the first produced no event at all.
    assert_eq!(
        recv_timeout(&mut rx, Duration::from_secs(1)).expect("transcription event"),
        SessionEvent::Transcription {
            text: "second utterance".to_string()
        }
    );
    assert!(recv_timeout(&mut rx, Duration::from_millis(200)).is_none());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    assert_eq!(utterances.load(Ordering::SeqCst), 1);

    handle.cancel();
}

#[test]
fn test_service_failure_is_nonfatal() {
    let mut script = one_utterance_script();
    script.extend([
        block_loud(),
        block_silence(),
        block_silence(),
    ]);

    let source = Arc::new(ScriptedSource::new(script));
    let engine = Arc::new(ScriptedEngine::new(vec![
        Err(RecognizeError::Service(anyhow::anyhow!("backend unreachable"))),
        Ok("after failure".to_string()),
    ]));
    let (events, mut rx) = event_channel();

    let handle = TranscriptionService::start(
        source,
        engine,
        listener_config(),
        events,
        Arc::new(AtomicUsize::new(0)),
    );

    assert_eq!(
        recv_timeout(&mut rx, Duration::from_secs(1)).expect("transcription event"),
        SessionEvent::Transcription {
            text: "after failure".to_string()
        }
    );

    handle.cancel();
}

#[test]
fn test_cancel_is_nonblocking_and_listening_stops() {
    // Endless utterances, one per scripted cycle.
    let source = Arc::new(
        ScriptedSource::new(vec![
            block_silence(),
            block_loud(),
            block_loud(),
            block_silence(),
            block_silence(),
        ])
        .looped()
        .realtime(),
    );
    let engine = Arc::new(ConstantEngine {
        text: "tick".to_string(),
        delay: Duration::ZERO,
    });
    let (events, mut rx) = event_channel();

    let handle = TranscriptionService::start(
        source,
        engine,
        listener_config(),
        events,
        Arc::new(AtomicUsize::new(0)),
    );
    assert!(recv_timeout(&mut rx, Duration::from_secs(2)).is_some());

    let begun = Instant::now();
    handle.cancel();
    assert!(
        begun.elapsed() < Duration::from_millis(100),
        "cancel must not wait for the listener"
    );
    assert!(handle.is_cancelled());

    // The listener quiesces shortly after: two consecutive quiet windows.
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut quiet_windows = 0;
    while quiet_windows < 2 {
        assert!(Instant::now() < deadline, "listener kept emitting after cancel");
        std::thread::sleep(Duration::from_millis(200));
        if drain(&mut rx).is_empty() {
            quiet_windows += 1;
        } else {
            quiet_windows = 0;
        }
    }
}

#[test]
fn test_inflight_decode_may_emit_one_trailing_event() {
    let source = Arc::new(ScriptedSource::new(one_utterance_script()));
    let engine = Arc::new(ConstantEngine {
        text: "trailing".to_string(),
        delay: Duration::from_millis(150),
    });
    let (events, mut rx) = event_channel();

    let handle = TranscriptionService::start(
        source,
        engine,
        listener_config(),
        events,
        Arc::new(AtomicUsize::new(0)),
    );

    // Cancel while the decode is still in flight.
    std::thread::sleep(Duration::from_millis(50));
    handle.cancel();

    // The documented race: the already-running decode still delivers.
    assert_eq!(
        recv_timeout(&mut rx, Duration::from_secs(1)).expect("trailing event"),
        SessionEvent::Transcription {
            text: "trailing".to_string()
        }
    );
    assert!(recv_timeout(&mut rx, Duration::from_millis(200)).is_none());
}

#[test]
fn test_listener_exits_quietly_when_audio_fails() {
    // Nothing but the calibration window; the first listening read fails.
    let source = Arc::new(ScriptedSource::new(vec![block_silence()]));
    let engine = Arc::new(ScriptedEngine::new(vec![]));
    let (events, mut rx) = event_channel();

    let handle = TranscriptionService::start(
        source,
        engine,
        listener_config(),
        events,
        Arc::new(AtomicUsize::new(0)),
    );

    assert!(recv_timeout(&mut rx, Duration::from_millis(200)).is_none());
    handle.cancel();
}
