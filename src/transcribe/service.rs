//! Continuously listening transcription service
//!
//! Independent of the capture loop's window boundaries. A background thread
//! opens its own audio input, calibrates an energy threshold against ambient
//! noise once, then segments speech by energy gating: an utterance starts on
//! a loud block and ends after a run of trailing silence (or at a maximum
//! length). Each utterance is decoded through the engine; unintelligible
//! audio is dropped silently and service failures are logged and ignored.
//!
//! Cancellation is best-effort: [`ListenerHandle::cancel`] sets a flag and
//! returns immediately. The thread notices between blocks, so an utterance
//! already being decoded may still deliver one trailing event.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::engine::{RecognizeError, TranscriptionEngine};
use crate::audio::{AudioInput, AudioSource, AudioWindow};
use crate::events::{emit, EventSender, SessionEvent};

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// How much ambient audio to sample for calibration.
    pub calibration: Duration,
    /// Size of each listening read.
    pub block: Duration,
    /// Lower bound for the energy threshold, for very quiet rooms.
    pub threshold_floor: f32,
    /// Threshold = ambient RMS * factor, clamped to the floor.
    pub threshold_factor: f32,
    /// Silence run that ends an utterance.
    pub trailing_silence: Duration,
    /// Hard cap on utterance length.
    pub max_utterance: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            block: Duration::from_millis(100),
            threshold_floor: 0.01,
            threshold_factor: 2.0,
            trailing_silence: Duration::from_millis(800),
            max_utterance: Duration::from_secs(10),
        }
    }
}

/// Cancellation handle for a background listener.
///
/// `cancel` only requests cancellation; it never blocks or waits for the
/// listener to quiesce.
pub struct ListenerHandle {
    cancelled: Arc<AtomicBool>,
}

impl ListenerHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct TranscriptionService;

impl TranscriptionService {
    /// Spawn the listener thread and return its cancellation handle. Each
    /// decoded utterance bumps `utterances` alongside its event.
    ///
    /// Listener-side failures (no device, stream errors) are logged and end
    /// the listener without affecting the capture pipeline.
    pub fn start(
        source: Arc<dyn AudioSource>,
        engine: Arc<dyn TranscriptionEngine>,
        config: ListenerConfig,
        events: EventSender,
        utterances: Arc<AtomicUsize>,
    ) -> ListenerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let spawned = thread::Builder::new()
            .name("transcription-listener".to_string())
            .spawn(move || listen(source, engine, config, events, utterances, flag));
        if let Err(e) = spawned {
            error!("Failed to spawn transcription listener: {}", e);
        }

        ListenerHandle { cancelled }
    }
}

fn listen(
    source: Arc<dyn AudioSource>,
    engine: Arc<dyn TranscriptionEngine>,
    config: ListenerConfig,
    events: EventSender,
    utterances: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
) {
    let mut input = match source.open() {
        Ok(input) => input,
        Err(e) => {
            error!("Transcription listener could not open audio input: {:#}", e);
            return;
        }
    };

    // Ambient-noise calibration, once, before entering listening mode.
    let threshold = match calibrate(input.as_mut(), &config) {
        Ok(threshold) => threshold,
        Err(e) => {
            error!("Transcription listener calibration failed: {:#}", e);
            return;
        }
    };
    info!("Transcription listener started (energy threshold {:.4})", threshold);

    while !cancelled.load(Ordering::SeqCst) {
        match next_utterance(input.as_mut(), &config, threshold, &cancelled) {
            Ok(Some(utterance)) => {
                match engine.recognize(&utterance.samples, utterance.sample_rate) {
                    Ok(text) => {
                        utterances.fetch_add(1, Ordering::SeqCst);
                        emit(&events, SessionEvent::Transcription { text });
                    }
                    Err(RecognizeError::Unintelligible) => {
                        debug!("Unintelligible utterance, dropped");
                    }
                    Err(RecognizeError::Service(e)) => {
                        warn!("Speech service failure, continuing: {:#}", e);
                    }
                }
            }
            // Cancellation noticed while waiting for speech.
            Ok(None) => {}
            Err(e) => {
                error!("Transcription listener stopped: {:#}", e);
                return;
            }
        }
    }

    info!("Transcription listener cancelled");
}

fn calibrate(input: &mut dyn AudioInput, config: &ListenerConfig) -> anyhow::Result<f32> {
    let ambient = input.capture(config.calibration)?;
    let level = rms(&ambient.samples);
    Ok((level * config.threshold_factor).max(config.threshold_floor))
}

/// Block until one utterance has been segmented, or cancellation is noticed
/// while waiting for speech to start.
fn next_utterance(
    input: &mut dyn AudioInput,
    config: &ListenerConfig,
    threshold: f32,
    cancelled: &AtomicBool,
) -> anyhow::Result<Option<AudioWindow>> {
    let first = loop {
        if cancelled.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let block = input.capture(config.block)?;
        if rms(&block.samples) >= threshold {
            break block;
        }
    };

    let sample_rate = first.sample_rate;
    let mut samples = first.samples;
    let mut silent_run = Duration::ZERO;

    while silent_run < config.trailing_silence {
        let elapsed =
            Duration::from_secs_f64(samples.len() as f64 / sample_rate.max(1) as f64);
        if elapsed >= config.max_utterance {
            break;
        }

        let block = input.capture(config.block)?;
        if rms(&block.samples) >= threshold {
            silent_run = Duration::ZERO;
        } else {
            silent_run += config.block;
        }
        samples.extend(block.samples);
    }

    Ok(Some(AudioWindow {
        samples,
        sample_rate,
    }))
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
