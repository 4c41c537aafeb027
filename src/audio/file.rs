use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::input::{AudioInput, AudioSource, AudioWindow};

/// A WAV file served as successive capture windows, for batch runs and tests.
#[derive(Debug, Clone)]
pub struct WavFile {
    pub path: PathBuf,
}

impl WavFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AudioSource for WavFile {
    fn open(&self) -> Result<Box<dyn AudioInput>> {
        Ok(Box::new(FileInput::open(&self.path)?))
    }
}

pub struct FileInput {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
}

impl FileInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Int => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        // Flatten interleaved channels to mono.
        let channels = spec.channels as usize;
        let samples: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        info!(
            "Audio file loaded: {} ({:.1}s, {}Hz, {} channels)",
            path.display(),
            samples.len() as f64 / spec.sample_rate as f64,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            cursor: 0,
        })
    }
}

impl AudioInput for FileInput {
    /// Returns the next window of the file; a short final window is padded
    /// with silence. Capturing past the end is an error, which ends a capture
    /// loop the same way a failed device read would.
    fn capture(&mut self, duration: Duration) -> Result<AudioWindow> {
        if self.cursor >= self.samples.len() {
            bail!("Audio file exhausted");
        }

        let needed = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let end = (self.cursor + needed).min(self.samples.len());
        let mut samples = self.samples[self.cursor..end].to_vec();
        samples.resize(needed, 0.0);
        self.cursor = end;

        Ok(AudioWindow {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
