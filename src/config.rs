use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub model: ModelFileConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture window length in seconds.
    pub window_secs: f32,
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_secs: 0.5,
            sample_rate: 44100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelFileConfig {
    /// Path to the precomputed MFCC feature table (JSON rows) written by the
    /// offline dataset pipeline.
    pub dataset_path: String,
    pub feature_length: usize,
    pub test_fraction: f32,
    pub seed: u64,
}

impl Default for ModelFileConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/sep28k-mfcc.json".to_string(),
            feature_length: 13,
            test_fraction: 0.4,
            seed: 42,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// External speech-to-text command. Invoked with a WAV path appended;
    /// expected to print the transcript on stdout. Transcription is disabled
    /// when unset.
    pub command: Option<String>,
    pub calibration_secs: f32,
    pub trailing_silence_secs: f32,
    pub max_utterance_secs: f32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            command: None,
            calibration_secs: 1.0,
            trailing_silence_secs: 0.8,
            max_utterance_secs: 10.0,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
