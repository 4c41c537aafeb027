// Shared helpers for integration tests: scripted audio sources, synthetic
// datasets, and event-channel polling.
#![allow(dead_code)]

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use stutter_live::{
    AudioInput, AudioSource, AudioWindow, DatasetFile, DatasetProvider, DatasetRow, EventReceiver,
    MemoryDatasetProvider, SessionEvent, TabularDataset,
};

pub const SAMPLE_RATE: u32 = 8000;

/// An input that replays pre-baked windows. Each capture sleeps for the
/// requested duration when `realtime` is set, so the script behaves like a
/// blocking device; a non-looped script errors once exhausted, the way a
/// failed device read would.
pub struct ScriptedInput {
    windows: VecDeque<Vec<f32>>,
    script: Vec<Vec<f32>>,
    looped: bool,
    realtime: bool,
    sample_rate: u32,
}

impl AudioInput for ScriptedInput {
    fn capture(&mut self, duration: Duration) -> Result<AudioWindow> {
        if self.realtime {
            std::thread::sleep(duration);
        }
        if self.windows.is_empty() && self.looped {
            self.windows = self.script.clone().into();
        }
        match self.windows.pop_front() {
            Some(samples) => Ok(AudioWindow {
                samples,
                sample_rate: self.sample_rate,
            }),
            None => bail!("Script exhausted"),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub struct ScriptedSource {
    pub windows: Vec<Vec<f32>>,
    pub looped: bool,
    pub realtime: bool,
    pub sample_rate: u32,
    pub opened: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(windows: Vec<Vec<f32>>) -> Self {
        Self {
            windows,
            looped: false,
            realtime: false,
            sample_rate: SAMPLE_RATE,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }

    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl AudioSource for ScriptedSource {
    fn open(&self) -> Result<Box<dyn AudioInput>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedInput {
            windows: self.windows.clone().into(),
            script: self.windows.clone(),
            looped: self.looped,
            realtime: self.realtime,
            sample_rate: self.sample_rate,
        }))
    }
}

pub fn silence(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    vec![0.0; (duration_secs * sample_rate as f32).round() as usize]
}

pub fn tone(freq: f32, duration_secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let n = (duration_secs * sample_rate as f32).round() as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// A dataset where each row has exactly one active label and the feature
/// vectors of each class form a tight, well-separated cluster.
pub fn one_hot_dataset(
    label_names: &[&str],
    rows_per_label: usize,
    feature_length: usize,
) -> DatasetFile {
    let mut rows = Vec::new();
    for (class, _) in label_names.iter().enumerate() {
        for i in 0..rows_per_label {
            let mut labels = vec![0.0; label_names.len()];
            labels[class] = 1.0 + (i % 2) as f32;

            let jitter = i as f32 * 0.001;
            let features = (0..feature_length)
                .map(|c| class as f32 * 10.0 + c as f32 * 0.01 + jitter)
                .collect();
            rows.push(DatasetRow { labels, features });
        }
    }

    DatasetFile {
        label_names: label_names.iter().map(|n| n.to_string()).collect(),
        rows,
    }
}

/// A dataset of two classes whose feature vectors are the actual MFCCs of
/// the given signals, so a model trained on it classifies those exact
/// signals predictably at capture time.
pub fn signal_dataset(
    classes: &[(&str, &[f32])],
    rows_per_class: usize,
    feature_length: usize,
    sample_rate: u32,
) -> DatasetFile {
    let mut rows = Vec::new();
    for (class, (_, samples)) in classes.iter().enumerate() {
        let base = stutter_live::extract_mfccs(samples, sample_rate, feature_length);
        for i in 0..rows_per_class {
            let mut labels = vec![0.0; classes.len()];
            labels[class] = 1.0;

            let jitter = i as f32 * 0.001;
            let features = base.iter().map(|&f| f + jitter).collect();
            rows.push(DatasetRow { labels, features });
        }
    }

    DatasetFile {
        label_names: classes.iter().map(|(name, _)| name.to_string()).collect(),
        rows,
    }
}

/// Provider whose backing table can be replaced between configurations.
pub struct SwitchableProvider {
    file: Mutex<DatasetFile>,
}

impl SwitchableProvider {
    pub fn new(file: DatasetFile) -> Self {
        Self {
            file: Mutex::new(file),
        }
    }

    pub fn replace(&self, file: DatasetFile) {
        *self.file.lock().expect("lock") = file;
    }
}

impl DatasetProvider for SwitchableProvider {
    fn dataset(&self, feature_length: usize) -> Result<TabularDataset> {
        let file = self.file.lock().expect("lock").clone();
        MemoryDatasetProvider::new(file).dataset(feature_length)
    }
}

/// Poll the event channel until an event arrives or the timeout elapses.
pub fn recv_timeout(rx: &mut EventReceiver, timeout: Duration) -> Option<SessionEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        match rx.try_recv() {
            Ok(event) => return Some(event),
            Err(_) => {
                if Instant::now() >= deadline {
                    return None;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }
}

/// Drain everything currently queued.
pub fn drain(rx: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Collect `n` events, waiting up to `timeout` for each.
pub fn collect_events(rx: &mut EventReceiver, n: usize, timeout: Duration) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    for _ in 0..n {
        match recv_timeout(rx, timeout) {
            Some(event) => events.push(event),
            None => break,
        }
    }
    events
}
