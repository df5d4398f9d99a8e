pub mod hpss;
pub mod report;
pub mod rhythm;
pub mod spectral;

use crate::audio::{AudioBuffer, EngineError, Result};
use crate::dsp::{self, EPSILON};
use serde::{Deserialize, Serialize};
use spectral::Spectrogram;

/// Spectral centroid that maps to a harmonic ratio of 1.0 in
/// [`HarmonicMode::CentroidEstimate`].
pub const HARMONIC_CENTROID_THRESHOLD_HZ: f64 = 5000.0;

/// How `harmonic_ratio` is computed. The two modes are not interchangeable;
/// every [`AudioFeatures`] records which one produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HarmonicMode {
    /// Median-filter harmonic/percussive separation.
    #[default]
    Separation,
    /// Approximate: `min(1, centroid / 5000 Hz)`. Much cheaper.
    CentroidEstimate,
}

impl HarmonicMode {
    pub fn is_approximate(&self) -> bool {
        matches!(self, Self::CentroidEstimate)
    }
}

/// Feature-extraction settings. A smaller hop gives more precise features for
/// more compute; it never changes which way a score moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub frame_length: usize,
    pub hop_length: usize,
    pub harmonic_mode: HarmonicMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            harmonic_mode: HarmonicMode::Separation,
        }
    }
}

impl ExtractorConfig {
    /// Coarser hop and the centroid-based harmonic estimate, for constrained hosts.
    pub fn lightweight() -> Self {
        Self {
            hop_length: 1024,
            harmonic_mode: HarmonicMode::CentroidEstimate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_length < 16 {
            return Err(EngineError::InvalidConfig(format!(
                "frame_length {} too small (min 16)",
                self.frame_length
            )));
        }
        if self.hop_length == 0 || self.hop_length > self.frame_length {
            return Err(EngineError::InvalidConfig(format!(
                "hop_length {} must be in 1..={}",
                self.hop_length, self.frame_length
            )));
        }
        Ok(())
    }
}

/// Scalar features of one buffer, the input to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AudioFeatures {
    /// Seconds.
    pub duration: f64,
    /// BPM; 0.0 when no beat was found.
    pub tempo: f64,
    /// Hz, time-averaged.
    pub spectral_centroid: f64,
    /// Hz, time-averaged.
    pub spectral_rolloff: f64,
    pub zero_crossing_rate: f64,
    pub rms_mean: f64,
    pub rms_std: f64,
    /// dB between the loudest and quietest frame RMS.
    pub dynamic_range: f64,
    /// 0..1.
    pub harmonic_ratio: f64,
    pub harmonic_mode: HarmonicMode,
    /// Approximate LUFS: `20·log10(rms_mean + ε) − 23`.
    pub loudness: f64,
    pub beat_count: usize,
}

pub fn extract_features(audio: &AudioBuffer) -> Result<AudioFeatures> {
    extract_features_with(audio, &ExtractorConfig::default())
}

/// Extract features from the mono downmix of `audio`.
pub fn extract_features_with(audio: &AudioBuffer, config: &ExtractorConfig) -> Result<AudioFeatures> {
    config.validate()?;
    audio.require_samples()?;

    let sample_rate = audio.sample_rate();
    let mono = audio.to_mono();
    let ExtractorConfig {
        frame_length,
        hop_length,
        harmonic_mode,
    } = *config;

    let spec = Spectrogram::compute(&mono, sample_rate, frame_length, hop_length);

    let onset = rhythm::onset_envelope(&spec);
    let beats = rhythm::track_beats(&onset, spec.frame_rate());

    let (spectral_centroid, _) = dsp::mean_std(&spec.centroid());
    let (spectral_rolloff, _) = dsp::mean_std(&spec.rolloff(spectral::ROLLOFF_PERCENT));
    let (zero_crossing_rate, _) =
        dsp::mean_std(&spectral::zero_crossing_rate(&mono, frame_length, hop_length));

    let rms = spectral::frame_rms(&mono, frame_length, hop_length);
    let (rms_mean, rms_std) = dsp::mean_std(&rms);
    let dynamic_range = dynamic_range_db(&rms);

    let harmonic_ratio = match harmonic_mode {
        HarmonicMode::Separation => hpss::harmonic_ratio(&spec),
        HarmonicMode::CentroidEstimate => {
            log::info!("Using estimated harmonic ratio (centroid-based)");
            (spectral_centroid / HARMONIC_CENTROID_THRESHOLD_HZ).min(1.0)
        }
    };

    let features = AudioFeatures {
        duration: audio.duration_secs(),
        tempo: beats.tempo_bpm,
        spectral_centroid,
        spectral_rolloff,
        zero_crossing_rate,
        rms_mean,
        rms_std,
        dynamic_range,
        harmonic_ratio,
        harmonic_mode,
        loudness: dsp::rms_to_lufs(rms_mean),
        beat_count: beats.beat_frames.len(),
    };
    log::debug!("Extracted features: {features:?}");
    Ok(features)
}

/// `20·log10(max / (min + ε))` over frame RMS; 0.0 when every frame is silent.
fn dynamic_range_db(frame_rms: &[f64]) -> f64 {
    let max = frame_rms.iter().copied().fold(0.0f64, f64::max);
    let min = frame_rms.iter().copied().fold(f64::INFINITY, f64::min);
    if max <= EPSILON {
        return 0.0;
    }
    20.0 * (max / (min + EPSILON)).log10()
}
