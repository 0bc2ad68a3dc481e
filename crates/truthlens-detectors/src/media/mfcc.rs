//! MFCC feature extraction
//!
//! Matches the default librosa pipeline: centered STFT with a periodic
//! Hann window, Slaney mel filterbank with area normalization, power to
//! decibels with an 80 dB floor, and an orthonormal DCT-II over mel bands.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const N_FFT: usize = 2048;
pub const HOP_LENGTH: usize = 512;
pub const N_MELS: usize = 128;

const TOP_DB: f32 = 80.0;
const AMIN: f32 = 1e-10;

// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

pub fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// Precomputed window, filterbank, and DCT basis for one sample rate
pub struct MfccExtractor {
    n_mfcc: usize,
    window: Vec<f32>,
    mel_filters: Vec<Vec<f32>>,
    dct_basis: Vec<Vec<f32>>,
    fft: Arc<dyn Fft<f32>>,
}

impl MfccExtractor {
    pub fn new(sample_rate: u32, n_mfcc: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(N_FFT);
        Self {
            n_mfcc,
            window: hann_window(N_FFT),
            mel_filters: mel_filterbank(sample_rate, N_FFT, N_MELS),
            dct_basis: dct_basis(n_mfcc, N_MELS),
            fft,
        }
    }

    /// Coefficients as `n_mfcc` rows of per-frame values
    pub fn compute(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let power = self.power_spectrogram(samples);

        // Mel energies in dB, laid out [frame][band]
        let mut mel_db: Vec<Vec<f32>> = power
            .iter()
            .map(|spectrum| {
                self.mel_filters
                    .iter()
                    .map(|filter| {
                        let energy: f32 = filter.iter().zip(spectrum).map(|(w, p)| w * p).sum();
                        10.0 * energy.max(AMIN).log10()
                    })
                    .collect()
            })
            .collect();

        let peak = mel_db
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - TOP_DB;
        for value in mel_db.iter_mut().flatten() {
            *value = value.max(floor);
        }

        self.dct_basis
            .iter()
            .map(|basis| {
                mel_db
                    .iter()
                    .map(|bands| basis.iter().zip(bands).map(|(b, x)| b * x).sum::<f32>())
                    .collect()
            })
            .collect()
    }

    pub fn n_mfcc(&self) -> usize {
        self.n_mfcc
    }

    /// Power spectra laid out [frame][bin], `N_FFT / 2 + 1` bins each
    fn power_spectrogram(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let pad = N_FFT / 2;
        let mut padded = vec![0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = 1 + (padded.len() - N_FFT) / HOP_LENGTH;
        let n_bins = N_FFT / 2 + 1;
        let mut buffer = vec![Complex::new(0f32, 0f32); N_FFT];

        (0..n_frames)
            .map(|frame| {
                let start = frame * HOP_LENGTH;
                for (slot, (x, w)) in buffer
                    .iter_mut()
                    .zip(padded[start..start + N_FFT].iter().zip(&self.window))
                {
                    *slot = Complex::new(x * w, 0.0);
                }
                self.fft.process(&mut buffer);
                buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect()
            })
            .collect()
    }
}

/// Pad with zeros or truncate every row to `frames`, flattened row-major
pub fn fixed_frames(mfcc: &[Vec<f32>], frames: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(mfcc.len() * frames);
    for row in mfcc {
        let keep = row.len().min(frames);
        out.extend_from_slice(&row[..keep]);
        out.extend(std::iter::repeat(0f32).take(frames - keep));
    }
    out
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

/// Slaney-normalized triangular mel filters over `0..=sr/2`
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;

    let fft_freqs: Vec<f32> = (0..n_bins)
        .map(|k| k as f32 * nyquist / (n_bins - 1) as f32)
        .collect();

    let mel_max = hz_to_mel(nyquist);
    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (left, center, right) = (hz_points[i], hz_points[i + 1], hz_points[i + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Orthonormal DCT-II basis, `n_out` rows over `n_in` inputs
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f32;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| scale * (PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
