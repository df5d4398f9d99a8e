use crate::dsp::{centred_frame, frame_count, hann_window};
use rayon::prelude::*;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

/// Fraction of spectral magnitude below the rolloff frequency.
pub const ROLLOFF_PERCENT: f64 = 0.85;

/// Magnitude spectrogram from a centred, Hann-windowed STFT.
///
/// Frame `t` is centred on sample `t * hop_length`; each frame holds
/// `frame_length / 2 + 1` magnitude bins.
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
    pub frame_length: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn compute(samples: &[f32], sample_rate: u32, frame_length: usize, hop_length: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(frame_length);
        let window = hann_window(frame_length);
        let n_frames = frame_count(samples.len(), hop_length);
        let n_bins = frame_length / 2 + 1;

        let frames = (0..n_frames)
            .into_par_iter()
            .map_init(
                || {
                    (
                        vec![0.0f32; frame_length],
                        vec![Complex::default(); frame_length],
                        vec![Complex::default(); fft.get_inplace_scratch_len()],
                    )
                },
                |(frame, buf, scratch), t| {
                    centred_frame(samples, t, frame_length, hop_length, frame);
                    for ((c, &s), &w) in buf.iter_mut().zip(frame.iter()).zip(&window) {
                        *c = Complex::new(s * w, 0.0);
                    }
                    fft.process_with_scratch(buf, scratch);
                    buf[..n_bins].iter().map(|c| c.norm()).collect::<Vec<f32>>()
                },
            )
            .collect();

        Self {
            frames,
            frame_length,
            hop_length,
            sample_rate,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn bin_count(&self) -> usize {
        self.frame_length / 2 + 1
    }

    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.frame_length as f64
    }

    /// Analysis frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_length as f64
    }

    /// Magnitude-weighted mean frequency per frame (0 for a silent frame).
    pub fn centroid(&self) -> Vec<f64> {
        self.frames
            .iter()
            .map(|mags| {
                let (weighted, total) = mags.iter().enumerate().fold((0.0, 0.0), |(w, t), (k, &m)| {
                    (w + self.bin_frequency(k) * m as f64, t + m as f64)
                });
                if total > 0.0 { weighted / total } else { 0.0 }
            })
            .collect()
    }

    /// Lowest frequency below which `percent` of the frame's magnitude lies.
    pub fn rolloff(&self, percent: f64) -> Vec<f64> {
        self.frames
            .iter()
            .map(|mags| {
                let total: f64 = mags.iter().map(|&m| m as f64).sum();
                let threshold = percent * total;
                let mut cumulative = 0.0;
                for (k, &m) in mags.iter().enumerate() {
                    cumulative += m as f64;
                    if cumulative >= threshold {
                        return self.bin_frequency(k);
                    }
                }
                self.bin_frequency(mags.len().saturating_sub(1))
            })
            .collect()
    }
}

/// Fraction of sign changes per centred frame. The signal is edge-extended
/// and zero counts as positive.
pub fn zero_crossing_rate(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let at = |pos: isize| samples[pos.clamp(0, n as isize - 1) as usize] >= 0.0;
    (0..frame_count(n, hop_length))
        .map(|t| {
            let start = (t * hop_length) as isize - (frame_length / 2) as isize;
            let crossings = (1..frame_length as isize)
                .filter(|&j| at(start + j) != at(start + j - 1))
                .count();
            crossings as f64 / frame_length as f64
        })
        .collect()
}

/// RMS energy of each centred, zero-padded frame.
pub fn frame_rms(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f64> {
    let n = samples.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for &s in samples {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + (s as f64) * (s as f64));
    }
    (0..frame_count(n, hop_length))
        .map(|t| {
            let start = (t * hop_length) as isize - (frame_length / 2) as isize;
            let lo = start.clamp(0, n as isize) as usize;
            let hi = (start + frame_length as isize).clamp(0, n as isize) as usize;
            let energy = (prefix[hi] - prefix[lo]).max(0.0);
            (energy / frame_length as f64).sqrt()
        })
        .collect()
}
