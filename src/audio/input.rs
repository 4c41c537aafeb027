use anyhow::Result;
use std::time::Duration;

/// One fixed-duration slice of mono audio, consumed immediately by feature
/// extraction and then discarded.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    /// Amplitude samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// A blocking, synchronous audio input.
///
/// `capture` blocks until exactly one window of the requested duration has
/// been read from the underlying source. Interleaved multi-channel data is
/// flattened to mono by the implementation.
pub trait AudioInput: Send {
    fn capture(&mut self, duration: Duration) -> Result<AudioWindow>;

    /// Sample rate of the windows this input produces.
    fn sample_rate(&self) -> u32;
}

/// Where audio inputs come from.
///
/// The capture loop and the transcription listener each open their own input;
/// a source must hand out a fresh one per `open` call.
pub trait AudioSource: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioInput>>;
}
