//! Numeric helpers shared by the mastering and analysis pipelines.

/// Guard added to denominators and log arguments so silence stays finite.
pub const EPSILON: f64 = 1e-10;

/// Offset between RMS dBFS and the loudness approximation used everywhere in
/// the engine: `lufs ≈ 20·log10(rms) − 23`.
pub const LUFS_OFFSET_DB: f64 = 23.0;

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * (linear + EPSILON).log10()
}

/// RMS-based loudness approximation (no K-weighting, no gating).
pub fn rms_to_lufs(rms: f64) -> f64 {
    linear_to_db(rms) - LUFS_OFFSET_DB
}

/// Inverse of [`rms_to_lufs`] without the epsilon.
pub fn lufs_to_rms(lufs: f64) -> f64 {
    db_to_linear(lufs + LUFS_OFFSET_DB)
}

/// Root-mean-square of a sample stream; 0.0 for an empty stream.
pub fn rms<I: IntoIterator<Item = f32>>(samples: I) -> f64 {
    let (sum_sq, n) = samples
        .into_iter()
        .fold((0.0f64, 0usize), |(acc, n), s| (acc + (s as f64) * (s as f64), n + 1));
    if n == 0 { 0.0 } else { (sum_sq / n as f64).sqrt() }
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Periodic Hann window (the STFT convention).
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / len as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Number of centred analysis frames for `len` samples.
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length
}

/// Copy the centred frame `index` out of `samples`: frame `i` covers
/// `[i·hop − frame_len/2, i·hop + frame_len/2)`, zero outside the signal.
pub fn centred_frame(samples: &[f32], index: usize, frame_length: usize, hop_length: usize, out: &mut [f32]) {
    let start = (index * hop_length) as isize - (frame_length / 2) as isize;
    for (j, slot) in out.iter_mut().enumerate().take(frame_length) {
        let pos = start + j as isize;
        *slot = if pos >= 0 && (pos as usize) < samples.len() {
            samples[pos as usize]
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_conversions() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(-6.0) - 0.501187).abs() < 1e-6);
        assert!((linear_to_db(1.0)).abs() < 1e-6);
        assert!(linear_to_db(0.0).is_finite());
    }

    #[test]
    fn lufs_round_trip() {
        let rms = lufs_to_rms(-14.0);
        assert!((rms - 10f64.powf(9.0 / 20.0)).abs() < 1e-12);
        assert!((rms_to_lufs(rms) + 14.0).abs() < 1e-6);
    }

    #[test]
    fn rms_of_constant_and_empty() {
        assert!((rms([0.5f32; 8]) - 0.5).abs() < 1e-9);
        assert_eq!(rms(std::iter::empty::<f32>()), 0.0);
    }

    #[test]
    fn mean_std_population() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((m - 5.0).abs() < 1e-12);
        assert!((s - 2.0).abs() < 1e-12);
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn hann_is_periodic() {
        let w = hann_window(4);
        assert_eq!(w[0], 0.0);
        assert!((w[2] - 1.0).abs() < 1e-7);
        assert!((w[1] - 0.5).abs() < 1e-7);
    }

    #[test]
    fn centred_frame_zero_pads_edges() {
        let samples = [1.0f32, 2.0, 3.0, 4.0];
        let mut out = [9.0f32; 4];
        centred_frame(&samples, 0, 4, 2, &mut out);
        assert_eq!(out, [0.0, 0.0, 1.0, 2.0]);
        centred_frame(&samples, 2, 4, 2, &mut out);
        assert_eq!(out, [3.0, 4.0, 0.0, 0.0]);
        assert_eq!(frame_count(4, 2), 3);
    }
}
