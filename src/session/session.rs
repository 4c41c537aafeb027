use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{AudioInput, AudioSource};
use crate::events::{emit, EventSender, SessionEvent};
use crate::features::extract_mfccs;
use crate::model::{ModelConfiguration, ModelManager};
use crate::transcribe::{
    ListenerConfig, ListenerHandle, TranscriptionEngine, TranscriptionService,
};

/// The recording pipeline orchestrator.
///
/// Holds the Idle/Recording state and starts and stops the two independent
/// halves of the pipeline together: the capture loop (a dedicated thread,
/// one prediction per fixed audio window) and the transcription listener.
/// A capture thread exists exactly while the session is recording; teardown
/// forces a stop, so no capture thread ever outlives the session.
pub struct RecordingSession {
    config: SessionConfig,
    listener_config: ListenerConfig,
    source: Arc<dyn AudioSource>,
    engine: Arc<dyn TranscriptionEngine>,
    models: Arc<ModelManager>,
    events: EventSender,
    started_at: chrono::DateTime<Utc>,

    /// Best-effort stop signal, read once per window by the capture loop.
    recording: Arc<AtomicBool>,
    windows_processed: Arc<AtomicUsize>,
    utterances_transcribed: Arc<AtomicUsize>,
    capture_thread: Mutex<Option<thread::JoinHandle<()>>>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        listener_config: ListenerConfig,
        source: Arc<dyn AudioSource>,
        engine: Arc<dyn TranscriptionEngine>,
        models: Arc<ModelManager>,
        events: EventSender,
    ) -> Self {
        info!("Creating recording session: {}", config.session_id);

        Self {
            config,
            listener_config,
            source,
            engine,
            models,
            events,
            started_at: Utc::now(),
            recording: Arc::new(AtomicBool::new(false)),
            windows_processed: Arc::new(AtomicUsize::new(0)),
            utterances_transcribed: Arc::new(AtomicUsize::new(0)),
            capture_thread: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    /// Start recording. A no-op if already recording.
    pub fn start(&self) -> Result<()> {
        if self.recording.load(Ordering::SeqCst) {
            warn!("Recording already started");
            return Ok(());
        }

        info!("Starting recording session: {}", self.config.session_id);

        let input = self.source.open().context("Failed to open audio input")?;

        self.recording.store(true, Ordering::SeqCst);

        // Reset the consumer's transcript display.
        emit(&self.events, SessionEvent::Transcription { text: String::new() });

        let recording = Arc::clone(&self.recording);
        let windows_processed = Arc::clone(&self.windows_processed);
        let models = Arc::clone(&self.models);
        let events = self.events.clone();
        let window = self.config.window;

        let spawned = thread::Builder::new()
            .name("capture-loop".to_string())
            .spawn(move || capture_loop(input, window, models, events, recording, windows_processed));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.recording.store(false, Ordering::SeqCst);
                return Err(e).context("Failed to spawn capture loop");
            }
        };
        *lock(&self.capture_thread) = Some(handle);

        let listener = TranscriptionService::start(
            Arc::clone(&self.source),
            Arc::clone(&self.engine),
            self.listener_config.clone(),
            self.events.clone(),
            Arc::clone(&self.utterances_transcribed),
        );
        *lock(&self.listener) = Some(listener);

        info!("Recording session started");
        Ok(())
    }

    /// Stop recording. A no-op if already idle.
    ///
    /// Blocks until the capture thread has fully exited (bounded by one
    /// in-flight window plus inference), then requests transcription
    /// cancellation without waiting for it: consumers must tolerate one
    /// trailing transcription event after this returns.
    pub fn stop(&self) -> Result<()> {
        if !self.recording.load(Ordering::SeqCst) {
            warn!("Recording not active");
            return Ok(());
        }

        info!("Stopping recording session: {}", self.config.session_id);
        self.recording.store(false, Ordering::SeqCst);

        if let Some(handle) = lock(&self.capture_thread).take() {
            if handle.join().is_err() {
                error!("Capture loop panicked");
            }
        }

        if let Some(listener) = lock(&self.listener).take() {
            listener.cancel();
        }

        info!("Recording session stopped");
        Ok(())
    }

    /// Swap in a newly trained model. Blocks the caller through training;
    /// the capture loop keeps predicting with the previous model until the
    /// new one is activated, and picks up its feature length on the next
    /// window.
    pub fn set_configuration(&self, config: ModelConfiguration) -> Result<()> {
        self.models.set_configuration(config)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn models(&self) -> &Arc<ModelManager> {
        &self.models
    }

    /// Get current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            is_recording: self.recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            windows_processed: self.windows_processed.load(Ordering::SeqCst),
            utterances_transcribed: self.utterances_transcribed.load(Ordering::SeqCst),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.recording.load(Ordering::SeqCst) {
            if let Err(e) = self.stop() {
                error!("Failed to stop recording session on teardown: {:#}", e);
            }
        }
    }
}

/// One iteration per fixed-duration window: capture, extract features at the
/// currently active model's length, predict, emit, and only then check the
/// stop signal. Any failure inside an iteration is fatal to the loop and is
/// logged, never swallowed.
fn capture_loop(
    mut input: Box<dyn AudioInput>,
    window: Duration,
    models: Arc<ModelManager>,
    events: EventSender,
    recording: Arc<AtomicBool>,
    windows_processed: Arc<AtomicUsize>,
) {
    info!("Capture loop started");

    loop {
        let result = (|| -> Result<()> {
            let audio = input.capture(window)?;
            // Re-read the active model every window so a hot-swap takes
            // effect on the next prediction.
            let adapter = models.current();
            let features =
                extract_mfccs(&audio.samples, audio.sample_rate, adapter.feature_length());
            let label = adapter.predict_window(&features)?;
            emit(&events, SessionEvent::Prediction { label });
            windows_processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })();

        if let Err(e) = result {
            error!("Capture loop terminated: {:#}", e);
            break;
        }
        if !recording.load(Ordering::SeqCst) {
            break;
        }
    }

    info!("Capture loop stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
