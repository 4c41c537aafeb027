use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Why an utterance produced no text. The two conditions are handled
/// differently by the listener: unintelligible audio is silently dropped,
/// service failures are logged.
#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("utterance was unintelligible")]
    Unintelligible,
    #[error("speech service failure: {0}")]
    Service(#[source] anyhow::Error),
}

/// The speech-decoding collaborator: one utterance of mono audio in,
/// transcript text out.
pub trait TranscriptionEngine: Send + Sync {
    fn recognize(&self, samples: &[f32], sample_rate: u32) -> Result<String, RecognizeError>;
}

/// Decodes by shelling out to an external speech-to-text command.
///
/// The utterance is written to a temporary WAV whose path is appended to the
/// configured command line; the command is expected to print the transcript
/// on stdout. An empty transcript counts as unintelligible.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .context("Transcription command is empty")?
            .to_string();

        Ok(Self {
            program,
            args: parts.map(String::from).collect(),
        })
    }
}

impl TranscriptionEngine for CommandEngine {
    fn recognize(&self, samples: &[f32], sample_rate: u32) -> Result<String, RecognizeError> {
        let path = std::env::temp_dir().join(format!("utterance-{}.wav", uuid::Uuid::new_v4()));
        write_wav(&path, samples, sample_rate).map_err(RecognizeError::Service)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .output();
        let _ = std::fs::remove_file(&path);

        let output = output.map_err(|e| {
            RecognizeError::Service(
                anyhow!(e).context(format!("Failed to run {}", self.program)),
            )
        })?;
        if !output.status.success() {
            return Err(RecognizeError::Service(anyhow!(
                "{} exited with {}",
                self.program,
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            Err(RecognizeError::Unintelligible)
        } else {
            debug!("Decoded utterance: {}", text);
            Ok(text)
        }
    }
}

/// Stand-in engine when no speech-to-text command is configured; every
/// utterance is dropped as unintelligible.
pub struct DisabledEngine;

impl TranscriptionEngine for DisabledEngine {
    fn recognize(&self, _samples: &[f32], _sample_rate: u32) -> Result<String, RecognizeError> {
        Err(RecognizeError::Unintelligible)
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .context("Failed to write sample to WAV")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(())
}
