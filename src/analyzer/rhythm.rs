//! Onset-driven tempo estimation and beat tracking.
//!
//! Tempo comes from the autocorrelation of a spectral-flux onset envelope,
//! weighted by a log-normal prior around 120 BPM. Beats are then placed by
//! dynamic programming (Ellis 2007): each beat maximises onset strength plus
//! the best predecessor score, penalising spacings that stray from the period.

use super::spectral::Spectrogram;
use crate::dsp::{EPSILON, mean_std};

pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 300.0;
const PRIOR_BPM: f64 = 120.0;
const PRIOR_STD_OCTAVES: f64 = 1.0;
/// Penalty weight on deviation from the ideal beat spacing.
const TIGHTNESS: f64 = 100.0;
/// Log-power floor relative to the loudest bin, in dB.
const TOP_DB: f64 = 80.0;
/// Share of the longer lag's autocorrelation the half lag needs to take over.
const OCTAVE_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrack {
    /// 0.0 when no periodicity was found.
    pub tempo_bpm: f64,
    /// Beat positions as analysis frame indices, ascending.
    pub beat_frames: Vec<usize>,
}

impl BeatTrack {
    fn none() -> Self {
        Self {
            tempo_bpm: 0.0,
            beat_frames: Vec::new(),
        }
    }
}

/// Mean half-wave-rectified increase in log power between consecutive frames.
pub fn onset_envelope(spec: &Spectrogram) -> Vec<f64> {
    let max_mag = spec
        .frames
        .iter()
        .flat_map(|f| f.iter())
        .fold(0.0f32, |acc, &m| acc.max(m)) as f64;
    if max_mag <= EPSILON {
        return vec![0.0; spec.frame_count()];
    }
    let floor_db = 20.0 * max_mag.log10() - TOP_DB;
    let to_db = |m: f32| (10.0 * ((m as f64) * (m as f64)).max(EPSILON).log10()).max(floor_db);

    let mut env = Vec::with_capacity(spec.frame_count());
    let mut prev: Option<Vec<f64>> = None;
    for frame in &spec.frames {
        let db: Vec<f64> = frame.iter().map(|&m| to_db(m)).collect();
        let flux = match &prev {
            Some(p) => {
                db.iter().zip(p).map(|(c, p)| (c - p).max(0.0)).sum::<f64>() / db.len() as f64
            }
            None => 0.0,
        };
        env.push(flux);
        prev = Some(db);
    }
    env
}

fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_STD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Dominant tempo of an onset envelope, or `None` if it has no periodicity
/// in the [`MIN_BPM`, `MAX_BPM`] range.
pub fn estimate_tempo(onset: &[f64], frame_rate: f64) -> Option<f64> {
    let n = onset.len();
    if n < 4 {
        return None;
    }
    let min_lag = ((60.0 * frame_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).floor() as usize).min(n - 2);
    if max_lag <= min_lag {
        return None;
    }

    let (mean, std) = mean_std(onset);
    if std <= EPSILON {
        return None;
    }
    let centred: Vec<f64> = onset.iter().map(|v| v - mean).collect();

    // Autocorrelation for lags min_lag-1 ..= max_lag+1, so the peak always
    // has neighbours for interpolation. Index i holds lag min_lag-1+i.
    let first_lag = min_lag - 1;
    let ac: Vec<f64> = (first_lag..=max_lag + 1)
        .map(|lag| {
            if lag == 0 {
                return 0.0;
            }
            centred[lag..]
                .iter()
                .zip(&centred[..n - lag])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                .max(0.0)
        })
        .collect();
    let weighted: Vec<f64> = ac
        .iter()
        .enumerate()
        .map(|(i, &v)| v * tempo_prior(60.0 * frame_rate / (first_lag + i) as f64))
        .collect();

    let (best_idx, best) = weighted[1..weighted.len() - 1]
        .iter()
        .enumerate()
        .fold((0usize, 0.0f64), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
    if best <= 0.0 {
        return None;
    }
    let mut lag = min_lag + best_idx;

    // The prior barely separates P from 2P above ~150 BPM; move to the
    // shorter lag while its correlation mass is close to the longer one's.
    while let Some(half) = half_lag(&ac, first_lag, min_lag, lag) {
        if lag_mass(&ac, first_lag, half) < OCTAVE_RATIO * lag_mass(&ac, first_lag, lag) {
            break;
        }
        log::trace!("Tempo octave check: lag {lag} -> {half}");
        lag = half;
    }

    let idx = lag - first_lag;
    let (y0, y1, y2) = (weighted[idx - 1], weighted[idx], weighted[idx + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    let delta = if denom.abs() > EPSILON {
        (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    Some(60.0 * frame_rate / (lag as f64 + delta))
}

/// Autocorrelation summed over `lag - 1 ..= lag + 1`. Onset pulses are only
/// frame-quantised, so a fractional period spreads across neighbouring lags.
fn lag_mass(ac: &[f64], first_lag: usize, lag: usize) -> f64 {
    (lag.saturating_sub(1)..=lag + 1)
        .filter_map(|l| l.checked_sub(first_lag).and_then(|i| ac.get(i)))
        .sum()
}

/// Best-correlated lag within one frame of `lag / 2`, if any is in range.
fn half_lag(ac: &[f64], first_lag: usize, min_lag: usize, lag: usize) -> Option<usize> {
    let centre = (lag as f64 / 2.0).round() as usize;
    (centre.saturating_sub(1)..=centre + 1)
        .filter(|&l| l >= min_lag && l < lag)
        .max_by(|&a, &b| ac[a - first_lag].total_cmp(&ac[b - first_lag]))
}

/// Estimate tempo, then place beats on the onset envelope.
pub fn track_beats(onset: &[f64], frame_rate: f64) -> BeatTrack {
    let Some(tempo_bpm) = estimate_tempo(onset, frame_rate) else {
        return BeatTrack::none();
    };
    let period = 60.0 * frame_rate / tempo_bpm;
    let beat_frames = place_beats(onset, period);
    log::debug!(
        "Tempo {tempo_bpm:.1} BPM (period {period:.2} frames), {} beats",
        beat_frames.len()
    );
    BeatTrack {
        tempo_bpm,
        beat_frames,
    }
}

fn place_beats(onset: &[f64], period: f64) -> Vec<usize> {
    let n = onset.len();
    let (_, std) = mean_std(onset);
    if std <= EPSILON || n == 0 {
        return Vec::new();
    }

    let local = local_score(onset, std, period);

    let min_step = ((period / 2.0).round() as usize).max(1);
    let max_step = ((2.0 * period).round() as usize).max(min_step);
    let mut cumulative = vec![0.0f64; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];

    for t in 0..n {
        let mut best: Option<(usize, f64)> = None;
        if t >= min_step {
            for prev in t.saturating_sub(max_step)..=(t - min_step) {
                let spacing = ((t - prev) as f64 / period).ln();
                let score = cumulative[prev] - TIGHTNESS * spacing * spacing;
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((prev, score));
                }
            }
        }
        cumulative[t] = local[t] + best.map_or(0.0, |(_, s)| s);
        backlink[t] = best.map(|(p, _)| p);
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };
    let mut beats = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        beats.push(prev);
        cursor = prev;
    }
    beats.reverse();
    trim_weak_edges(beats, &local)
}

/// Onset envelope normalised by its deviation and smoothed with a Gaussian
/// about one period wide.
fn local_score(onset: &[f64], std: f64, period: f64) -> Vec<f64> {
    let half = period.round().max(1.0) as isize;
    let kernel: Vec<f64> = (-half..=half)
        .map(|j| {
            let x = j as f64 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();
    let n = onset.len() as isize;
    (0..n)
        .map(|t| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let idx = t + k as isize - half;
                    (0..n).contains(&idx).then(|| w * onset[idx as usize] / std)
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score that is at least half the
/// median local maximum.
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (0..n)
        .filter(|&t| {
            let left = t == 0 || cumulative[t] > cumulative[t - 1];
            let right = t + 1 == n || cumulative[t] >= cumulative[t + 1];
            left && right
        })
        .collect();
    if maxima.is_empty() {
        return None;
    }
    let mut values: Vec<f64> = maxima.iter().map(|&t| cumulative[t]).collect();
    values.sort_by(f64::total_cmp);
    let median = values[values.len() / 2];
    maxima.into_iter().rev().find(|&t| cumulative[t] >= 0.5 * median)
}

/// Drop leading and trailing beats whose onset support is under half the RMS
/// of the support at all beats.
fn trim_weak_edges(beats: Vec<usize>, local: &[f64]) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }
    let rms = (beats.iter().map(|&b| local[b] * local[b]).sum::<f64>() / beats.len() as f64).sqrt();
    let threshold = 0.5 * rms;
    let start = beats.iter().position(|&b| local[b] >= threshold);
    let end = beats.iter().rposition(|&b| local[b] >= threshold);
    match (start, end) {
        (Some(s), Some(e)) => beats[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::spectral::Spectrogram;
    use std::f64::consts::PI;

    /// Decaying 1 kHz blips at the given tempo.
    fn click_track(bpm: f64, seconds: f64, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f64) as usize;
        let interval = (60.0 / bpm * sample_rate as f64) as usize;
        let blip = (0.03 * sample_rate as f64) as usize;
        let mut out = vec![0.0f32; len];
        let mut start = interval / 2;
        while start < len {
            for i in 0..blip.min(len - start) {
                let t = i as f64 / sample_rate as f64;
                let env = (-t * 150.0).exp();
                out[start + i] = (0.8 * env * (2.0 * PI * 1000.0 * t).sin()) as f32;
            }
            start += interval;
        }
        out
    }

    fn track(bpm: f64) -> BeatTrack {
        let sr = 22050;
        let spec = Spectrogram::compute(&click_track(bpm, 12.0, sr), sr, 2048, 512);
        track_beats(&onset_envelope(&spec), spec.frame_rate())
    }

    #[test]
    fn tempo_of_click_tracks() {
        for bpm in [90.0, 120.0, 140.0] {
            let bt = track(bpm);
            let err = (bt.tempo_bpm - bpm).abs() / bpm;
            assert!(err < 0.08, "expected ~{bpm}, got {}", bt.tempo_bpm);
        }
    }

    #[test]
    fn faster_material_reads_faster() {
        let slow = track(95.0);
        let fast = track(135.0);
        assert!(fast.tempo_bpm > slow.tempo_bpm, "slow={} fast={}", slow.tempo_bpm, fast.tempo_bpm);
        assert!(fast.beat_frames.len() > slow.beat_frames.len());
    }

    #[test]
    fn fast_tempos_are_not_halved() {
        let sr = 44100;
        let mut previous = 0.0;
        for bpm in [60.0, 75.0, 90.0, 110.0, 128.0, 150.0, 170.0, 190.0, 200.0] {
            let spec = Spectrogram::compute(&click_track(bpm, 20.0, sr), sr, 2048, 512);
            let tempo = estimate_tempo(&onset_envelope(&spec), spec.frame_rate()).unwrap_or(0.0);
            let err = (tempo - bpm).abs() / bpm;
            assert!(err < 0.08, "expected ~{bpm}, got {tempo}");
            assert!(tempo > previous, "{bpm} BPM read as {tempo}, not above {previous}");
            previous = tempo;
        }
    }

    #[test]
    fn half_lag_stays_in_range() {
        // ac index i is lag 9 + i
        let ac = vec![0.0, 0.2, 0.9, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(half_lag(&ac, 9, 10, 20), Some(11));
        assert_eq!(half_lag(&ac, 9, 12, 20), None);
        assert_eq!(half_lag(&ac, 9, 10, 10), None);
        assert!((lag_mass(&ac, 9, 11) - 1.4).abs() < 1e-12);
        // clipped at both ends of the table
        assert!((lag_mass(&ac, 9, 9) - 0.2).abs() < 1e-12);
        assert!((lag_mass(&ac, 9, 20) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn beat_count_matches_click_count() {
        // 12 s at 120 BPM = 24 clicks
        let bt = track(120.0);
        let count = bt.beat_frames.len() as i64;
        assert!((count - 24).abs() <= 2, "beats={count}");
        assert!(bt.beat_frames.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn silence_has_no_tempo() {
        let spec = Spectrogram::compute(&vec![0.0; 44100], 22050, 2048, 512);
        let onset = onset_envelope(&spec);
        assert!(onset.iter().all(|&v| v == 0.0));
        let bt = track_beats(&onset, spec.frame_rate());
        assert_eq!(bt, BeatTrack::none());
    }

    #[test]
    fn too_short_for_tempo() {
        assert_eq!(estimate_tempo(&[0.0, 1.0, 0.0], 43.0), None);
    }

    #[test]
    fn prior_peaks_at_120() {
        assert!((tempo_prior(120.0) - 1.0).abs() < 1e-12);
        assert!(tempo_prior(60.0) < tempo_prior(100.0));
        assert!((tempo_prior(60.0) - tempo_prior(240.0)).abs() < 1e-12);
    }

    #[test]
    fn trim_drops_weak_edges() {
        let local = vec![0.01, 1.0, 1.0, 1.0, 0.02];
        assert_eq!(trim_weak_edges(vec![0, 1, 2, 3, 4], &local), vec![1, 2, 3]);
    }
}
