//! Microphone capture via cpal
//!
//! The cpal stream is not movable across threads, so a dedicated audio thread
//! owns it and forwards raw sample blocks over a channel. `MicrophoneInput`
//! assembles those blocks into fixed-duration mono windows: interleaved
//! channels are averaged down to mono and higher device rates are decimated
//! by integer ratio.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use super::input::{AudioInput, AudioSource, AudioWindow};

/// The default input device, as an [`AudioSource`].
#[derive(Debug, Clone)]
pub struct Microphone {
    /// Sample rate of the produced windows.
    pub sample_rate: u32,
}

impl Microphone {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioSource for Microphone {
    fn open(&self) -> Result<Box<dyn AudioInput>> {
        Ok(Box::new(MicrophoneInput::open(self.sample_rate)?))
    }
}

/// A live microphone input backed by a cpal stream on its own thread.
pub struct MicrophoneInput {
    rx: mpsc::Receiver<Vec<f32>>,
    /// Mono samples at the device rate, not yet handed out.
    buffer: Vec<f32>,
    device_rate: u32,
    device_channels: u16,
    target_rate: u32,
    stop: Arc<AtomicBool>,
}

impl MicrophoneInput {
    pub fn open(target_rate: u32) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("microphone-input".to_string())
            .spawn(move || audio_thread(tx, ready_tx, thread_stop))
            .context("Failed to spawn microphone thread")?;

        let (device_rate, device_channels) = ready_rx
            .recv()
            .context("Microphone thread exited before reporting its stream")??;

        if device_rate < target_rate || device_rate % target_rate != 0 {
            stop.store(true, Ordering::SeqCst);
            bail!(
                "Device rate {}Hz is not an integer multiple of the requested {}Hz",
                device_rate,
                target_rate
            );
        }

        info!(
            "Microphone input opened: device {}Hz x{} -> {}Hz mono",
            device_rate, device_channels, target_rate
        );

        Ok(Self {
            rx,
            buffer: Vec::new(),
            device_rate,
            device_channels,
            target_rate,
            stop,
        })
    }
}

impl AudioInput for MicrophoneInput {
    fn capture(&mut self, duration: Duration) -> Result<AudioWindow> {
        let ratio = (self.device_rate / self.target_rate) as usize;
        let frames_out = (duration.as_secs_f64() * self.target_rate as f64).round() as usize;
        let frames_in = frames_out * ratio;

        while self.buffer.len() < frames_in {
            let block = self
                .rx
                .recv()
                .context("Microphone stream ended unexpectedly")?;
            let channels = self.device_channels as usize;
            for frame in block.chunks_exact(channels) {
                let sum: f32 = frame.iter().sum();
                self.buffer.push(sum / channels as f32);
            }
        }

        let samples: Vec<f32> = self
            .buffer
            .drain(..frames_in)
            .step_by(ratio)
            .collect();

        Ok(AudioWindow {
            samples,
            sample_rate: self.target_rate,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.target_rate
    }
}

impl Drop for MicrophoneInput {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

type ReadySender = mpsc::Sender<Result<(u32, u16)>>;

/// Owns the cpal stream for the lifetime of one input.
fn audio_thread(tx: mpsc::Sender<Vec<f32>>, ready: ReadySender, stop: Arc<AtomicBool>) {
    let built = build_stream(tx);

    let stream = match built {
        Ok((stream, rate, channels)) => {
            let _ = ready.send(Ok((rate, channels)));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        error!("Failed to start microphone stream: {}", e);
        return;
    }

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    // Stream stops when dropped here.
}

fn build_stream(tx: mpsc::Sender<Vec<f32>>) -> Result<(cpal::Stream, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device found")?;
    let supported = device
        .default_input_config()
        .context("No default input config")?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.config();

    let err_fn = |e| error!("Microphone stream error: {}", e);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(data.to_vec());
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let block = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let _ = tx.send(block);
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let block = data
                    .iter()
                    .map(|&s| (s as f32 - 32768.0) / 32768.0)
                    .collect();
                let _ = tx.send(block);
            },
            err_fn,
            None,
        )?,
        format => bail!("Unsupported input sample format: {:?}", format),
    };

    Ok((stream, sample_rate, channels))
}
