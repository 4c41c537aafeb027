// Integration tests for the WAV file audio source
//
// These verify windowing, mono flattening, final-window padding, and the
// end-of-file error that terminates a capture loop.

use std::path::Path;
use std::time::Duration;
use stutter_live::{AudioSource, FileInput, WavFile};
use tempfile::TempDir;

const RATE: u32 = 16000;

fn write_mono_wav(path: &Path, samples: &[i16], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &sample in samples {
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

fn write_stereo_wav(path: &Path, frames: &[(i16, i16)], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for &(left, right) in frames {
        writer.write_sample(left).expect("write left");
        writer.write_sample(right).expect("write right");
    }
    writer.finalize().expect("finalize wav");
}

#[test]
fn test_file_input_serves_fixed_windows() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("one-second.wav");
    write_mono_wav(&path, &vec![1000i16; RATE as usize], RATE);

    let mut input = FileInput::open(&path).expect("open");
    assert_eq!(input.sample_rate(), RATE);

    let window = Duration::from_millis(250);
    for _ in 0..4 {
        let captured = input.capture(window).expect("capture");
        assert_eq!(captured.samples.len(), 4000);
        assert_eq!(captured.sample_rate, RATE);
    }

    assert!(input.capture(window).is_err(), "file is exhausted");
}

#[test]
fn test_short_final_window_is_padded_with_silence() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("short.wav");
    // 0.3s of audio against 0.25s windows: one full window plus a remainder.
    write_mono_wav(&path, &vec![2000i16; (RATE as usize) * 3 / 10], RATE);

    let mut input = FileInput::open(&path).expect("open");
    let window = Duration::from_millis(250);

    let first = input.capture(window).expect("first window");
    assert_eq!(first.samples.len(), 4000);
    assert!(first.samples.iter().all(|&s| s > 0.0));

    let second = input.capture(window).expect("padded final window");
    assert_eq!(second.samples.len(), 4000);
    assert!(second.samples[..800].iter().all(|&s| s > 0.0));
    assert!(second.samples[800..].iter().all(|&s| s == 0.0));

    assert!(input.capture(window).is_err());
}

#[test]
fn test_stereo_is_flattened_to_mono() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("stereo.wav");

    // Opposite channels cancel; equal channels pass through.
    let mut frames = vec![(8000i16, -8000i16); 800];
    frames.extend(vec![(8000i16, 8000i16); 800]);
    write_stereo_wav(&path, &frames, RATE);

    let mut input = FileInput::open(&path).expect("open");
    let captured = input
        .capture(Duration::from_millis(100))
        .expect("capture");

    assert_eq!(captured.samples.len(), 1600);
    assert!(captured.samples[..800].iter().all(|&s| s.abs() < 1e-4));
    assert!(captured.samples[800..]
        .iter()
        .all(|&s| (s - 8000.0 / 32768.0).abs() < 1e-4));
}

#[test]
fn test_wav_source_opens_fresh_inputs() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("fresh.wav");
    write_mono_wav(&path, &vec![3000i16; RATE as usize], RATE);

    let source = WavFile::new(&path);
    let window = Duration::from_millis(100);

    let mut first = source.open().expect("first open");
    let mut second = source.open().expect("second open");

    // Each input starts from the beginning of the file.
    let a = first.capture(window).expect("capture");
    let b = second.capture(window).expect("capture");
    assert_eq!(a.samples, b.samples);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(FileInput::open("does/not/exist.wav").is_err());
}
