//! MFCC feature extraction
//!
//! Turns one captured audio window into the fixed-length feature vector the
//! classifier consumes: short-time power spectra (Hann window + real FFT),
//! a triangular mel filter bank, log energies, a DCT-II, and a mean over
//! frames. Pure and deterministic; the same samples always produce the same
//! vector.

use realfft::num_complex::Complex;
use realfft::RealFftPlanner;

/// FFT window size in samples.
const N_FFT: usize = 2048;

/// Hop length (stride) between analysis frames, in samples.
const HOP_LENGTH: usize = 512;

/// Number of mel bins feeding the DCT. Raised to the coefficient count when a
/// caller asks for more coefficients than bins.
const N_MELS: usize = 40;

/// Extract `n_coeffs` mel-frequency cepstral coefficients from a mono window.
///
/// The result always has exactly `n_coeffs` entries; an empty window maps to
/// the zero vector.
pub fn extract_mfccs(samples: &[f32], sample_rate: u32, n_coeffs: usize) -> Vec<f32> {
    if n_coeffs == 0 {
        return Vec::new();
    }
    if samples.is_empty() || sample_rate == 0 {
        return vec![0.0; n_coeffs];
    }

    let n_mels = N_MELS.max(n_coeffs);
    let n_bins = N_FFT / 2 + 1;

    let mut planner = RealFftPlanner::<f32>::new();
    let r2c = planner.plan_fft_forward(N_FFT);

    let window = hann_window(N_FFT);
    let filters = mel_filter_bank(n_mels, n_bins, sample_rate);

    let mut frame = vec![0.0f32; N_FFT];
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); n_bins];
    let mut power = vec![0.0f32; n_bins];
    let mut mfcc_sum = vec![0.0f32; n_coeffs];
    let mut frames = 0usize;

    let mut start = 0;
    while start < samples.len() {
        let end = (start + N_FFT).min(samples.len());
        for (i, slot) in frame.iter_mut().enumerate() {
            let sample = if start + i < end { samples[start + i] } else { 0.0 };
            *slot = sample * window[i];
        }

        // Lengths match the plan, so the transform cannot fail.
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            break;
        }

        for (p, c) in power.iter_mut().zip(spectrum.iter()) {
            *p = c.norm_sqr();
        }

        let log_mels: Vec<f32> = filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .zip(power.iter())
                    .map(|(w, p)| w * p)
                    .sum();
                (energy + 1e-10).ln()
            })
            .collect();

        for (i, acc) in mfcc_sum.iter_mut().enumerate() {
            *acc += dct_coefficient(i, &log_mels);
        }
        frames += 1;

        start += HOP_LENGTH;
    }

    if frames == 0 {
        return vec![0.0; n_coeffs];
    }

    mfcc_sum.iter().map(|c| c / frames as f32).collect()
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

/// One DCT-II coefficient (orthonormal scaling) over a frame's log mel
/// energies.
fn dct_coefficient(index: usize, log_mels: &[f32]) -> f32 {
    let n_mels = log_mels.len();
    let value: f32 = log_mels
        .iter()
        .enumerate()
        .map(|(m, &log_energy)| {
            let angle =
                std::f32::consts::PI * index as f32 * (m as f32 + 0.5) / n_mels as f32;
            log_energy * angle.cos()
        })
        .sum();

    let scale = if index == 0 {
        (1.0 / n_mels as f32).sqrt()
    } else {
        (2.0 / n_mels as f32).sqrt()
    };
    value * scale
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filters mapping `n_bins` FFT bins onto `n_mels` bands.
fn mel_filter_bank(n_mels: usize, n_bins: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let f_max = sample_rate as f32 / 2.0;
    let mel_max = hz_to_mel(f_max);

    // n_mels + 2 evenly spaced mel points, mapped back to FFT bin positions.
    let bin_of = |mel: f32| -> f32 {
        let hz = mel_to_hz(mel);
        hz * (N_FFT as f32) / sample_rate as f32
    };
    let points: Vec<f32> = (0..n_mels + 2)
        .map(|i| bin_of(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (points[m], points[m + 1], points[m + 2]);
            (0..n_bins)
                .map(|k| {
                    let k = k as f32;
                    if k <= left || k >= right {
                        0.0
                    } else if k <= center {
                        (k - left) / (center - left).max(f32::EPSILON)
                    } else {
                        (right - k) / (right - center).max(f32::EPSILON)
                    }
                })
                .collect()
        })
        .collect()
}
