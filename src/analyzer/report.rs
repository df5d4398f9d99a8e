//! Post-mastering QA summary: loudness, peak, crest factor, brightness.

use super::spectral::Spectrogram;
use super::ExtractorConfig;
use crate::audio::{AudioBuffer, Result};
use crate::dsp::{self, EPSILON};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// `20·log10(rms + ε) − 23`, same approximation as the normalizer.
    pub loudness_lufs: f64,
    /// dBFS of the largest absolute sample.
    pub peak_level_db: f64,
    /// Crest factor in dB: `20·log10(peak / (rms + ε))`.
    pub dynamic_range_db: f64,
    pub rms_level_db: f64,
    /// Hz, time-averaged.
    pub spectral_centroid: f64,
    /// Side RMS over mid RMS; 0.0 for mono.
    pub stereo_width: f64,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration: f64,
}

/// Measure a (typically mastered) buffer. Levels are taken on the mono
/// downmix; stereo width on the original channels.
pub fn analyze(audio: &AudioBuffer) -> Result<AnalysisReport> {
    audio.require_samples()?;
    log::info!(
        "Analyzing {:.2}s of audio ({} ch @ {} Hz)",
        audio.duration_secs(),
        audio.channel_count(),
        audio.sample_rate()
    );

    let mono = audio.to_mono();
    let rms = dsp::rms(mono.iter().copied());
    let peak = mono.iter().fold(0.0f32, |acc, s| acc.max(s.abs())) as f64;

    let cfg = ExtractorConfig::default();
    let spec = Spectrogram::compute(&mono, audio.sample_rate(), cfg.frame_length, cfg.hop_length);
    let (spectral_centroid, _) = dsp::mean_std(&spec.centroid());

    let report = AnalysisReport {
        loudness_lufs: dsp::rms_to_lufs(rms),
        peak_level_db: dsp::linear_to_db(peak),
        dynamic_range_db: 20.0 * (peak / (rms + EPSILON) + EPSILON).log10(),
        rms_level_db: dsp::linear_to_db(rms),
        spectral_centroid,
        stereo_width: stereo_width(audio),
        sample_rate: audio.sample_rate(),
        channels: audio.channel_count(),
        duration: audio.duration_secs(),
    };

    log::info!(
        "Analysis complete: LUFS={:.2}, DR={:.2}",
        report.loudness_lufs,
        report.dynamic_range_db
    );
    Ok(report)
}

fn stereo_width(audio: &AudioBuffer) -> f64 {
    let [left, right] = audio.channels() else {
        return 0.0;
    };
    let mid = dsp::rms(left.iter().zip(right).map(|(l, r)| (l + r) / 2.0));
    let side = dsp::rms(left.iter().zip(right).map(|(l, r)| (l - r) / 2.0));
    side / (mid + EPSILON)
}
