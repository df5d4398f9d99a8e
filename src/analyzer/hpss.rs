//! Harmonic/percussive separation by median filtering (Fitzgerald 2010).
//!
//! Harmonic content is smooth along time, percussive content is smooth along
//! frequency. Median-filtering the magnitude spectrogram in each direction
//! gives two estimates that are turned into soft (Wiener) masks.

use super::spectral::Spectrogram;
use rayon::prelude::*;

/// Median filter length, in frames (harmonic) and bins (percussive).
pub const KERNEL_SIZE: usize = 31;

/// Below this, both estimates count as zero and the mask splits evenly.
const MASK_FLOOR: f64 = 1e-20;

/// Energy of the harmonic component over total spectral energy, in [0, 1].
/// Returns 0.0 for a silent spectrogram.
pub fn harmonic_ratio(spec: &Spectrogram) -> f64 {
    let n_frames = spec.frame_count();
    if n_frames == 0 {
        return 0.0;
    }
    let n_bins = spec.bin_count();

    // bin-major: harmonic[k][t]
    let harmonic: Vec<Vec<f32>> = (0..n_bins)
        .into_par_iter()
        .map(|k| {
            let column: Vec<f32> = spec.frames.iter().map(|f| f[k]).collect();
            median_filter(&column)
        })
        .collect();

    // frame-major: percussive[t][k]
    let percussive: Vec<Vec<f32>> = spec.frames.par_iter().map(|f| median_filter(f)).collect();

    // Per-frame sums are collected in order and added serially so the result
    // does not depend on how rayon splits the work.
    let per_frame: Vec<(f64, f64)> = (0..n_frames)
        .into_par_iter()
        .map(|t| {
            let mut harmonic_energy = 0.0f64;
            let mut total_energy = 0.0f64;
            for (k, &s) in spec.frames[t].iter().enumerate() {
                let h = harmonic[k][t] as f64;
                let p = percussive[t][k] as f64;
                let (h2, p2) = (h * h, p * p);
                let mask = if h2 + p2 > MASK_FLOOR { h2 / (h2 + p2) } else { 0.5 };
                let s = s as f64;
                harmonic_energy += (mask * s) * (mask * s);
                total_energy += s * s;
            }
            (harmonic_energy, total_energy)
        })
        .collect();

    let (harmonic_energy, total_energy) = per_frame
        .iter()
        .fold((0.0, 0.0), |(h, t), &(fh, ft)| (h + fh, t + ft));
    if total_energy <= MASK_FLOOR {
        return 0.0;
    }
    (harmonic_energy / total_energy).clamp(0.0, 1.0)
}

/// Sliding median of length [`KERNEL_SIZE`] with reflected edges.
fn median_filter(x: &[f32]) -> Vec<f32> {
    let n = x.len();
    let half = (KERNEL_SIZE / 2) as isize;
    let mut window = [0.0f32; KERNEL_SIZE];
    (0..n as isize)
        .map(|i| {
            for (slot, j) in window.iter_mut().zip(-half..=half) {
                *slot = x[reflect(i + j, n)];
            }
            *window.select_nth_unstable_by(KERNEL_SIZE / 2, f32::total_cmp).1
        })
        .collect()
}

/// Index into `[0, n)` mirroring at the edges: `d c b a | a b c d | d c b a`.
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn reflect_mirrors_edges() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        // shorter than the kernel
        assert_eq!(reflect(-3, 1), 0);
        assert_eq!(reflect(7, 2), 0);
    }

    #[test]
    fn median_filter_removes_spikes_and_keeps_plateaus() {
        let mut x = vec![1.0f32; 100];
        x[50] = 100.0;
        let y = median_filter(&x);
        assert!(y.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn sustained_tone_is_harmonic() {
        let sr = 22050;
        let tone: Vec<f32> = (0..sr as usize * 2)
            .map(|i| (0.5 * (2.0 * PI * 440.0 * i as f64 / sr as f64).sin()) as f32)
            .collect();
        let spec = Spectrogram::compute(&tone, sr, 2048, 512);
        let ratio = harmonic_ratio(&spec);
        assert!(ratio > 0.8, "ratio={ratio}");
    }

    #[test]
    fn sparse_clicks_are_percussive() {
        let sr = 22050;
        let mut clicks = vec![0.0f32; sr as usize * 2];
        for start in (0..clicks.len()).step_by(sr as usize / 2) {
            clicks[start] = 1.0;
        }
        let spec = Spectrogram::compute(&clicks, sr, 2048, 512);
        let ratio = harmonic_ratio(&spec);
        assert!(ratio < 0.3, "ratio={ratio}");
    }

    #[test]
    fn silence_is_zero() {
        let spec = Spectrogram::compute(&vec![0.0; 8192], 22050, 2048, 512);
        assert_eq!(harmonic_ratio(&spec), 0.0);
    }
}
