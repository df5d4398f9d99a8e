mod dynamics;
mod eq;
mod loudness;
mod stereo;

use crate::audio::{AudioBuffer, EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use dynamics::DEFAULT_LIMITER_THRESHOLD_DB;

pub(crate) use dynamics::{apply_compression, apply_limiter};
pub(crate) use eq::apply_eq;
pub(crate) use loudness::normalize_loudness;
pub(crate) use stereo::adjust_stereo_width;

/// Allowed range for the loudness target, in (approximate) LUFS.
pub const TARGET_LOUDNESS_RANGE: (f64, f64) = (-20.0, -8.0);

/// Allowed range for the stereo width multiplier.
pub const STEREO_WIDTH_RANGE: (f64, f64) = (0.0, 2.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EqPreset {
    #[default]
    Balanced,
    Bright,
    Warm,
    BassBoost,
}

impl EqPreset {
    pub const ALL: [EqPreset; 4] = [Self::Balanced, Self::Bright, Self::Warm, Self::BassBoost];

    /// (center frequency Hz, gain dB) bands, applied in order.
    pub fn bands(&self) -> &'static [(f64, f64)] {
        match self {
            Self::Balanced => &[],
            Self::Bright => &[(8000.0, 3.0), (12000.0, 2.0)],
            Self::Warm => &[(200.0, 2.0), (500.0, 1.5)],
            Self::BassBoost => &[(60.0, 4.0), (120.0, 3.0)],
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Bright => "bright",
            Self::Warm => "warm",
            Self::BassBoost => "bass-boost",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Balanced => "Balanced",
            Self::Bright => "Bright",
            Self::Warm => "Warm",
            Self::BassBoost => "Bass Boost",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Balanced => "Neutral, balanced frequency response",
            Self::Bright => "Enhanced high frequencies",
            Self::Warm => "Enhanced low-mid frequencies",
            Self::BassBoost => "Enhanced low frequencies",
        }
    }
}

/// Parameters of one compression level. Attack and release describe the
/// intended envelope; the compressor itself is static per-sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressorParams {
    pub threshold: f32,
    pub ratio: f32,
    pub attack_secs: f64,
    pub release_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionLevel {
    Light,
    #[default]
    Medium,
    Heavy,
    Limiting,
}

impl CompressionLevel {
    pub const ALL: [CompressionLevel; 4] = [Self::Light, Self::Medium, Self::Heavy, Self::Limiting];

    pub fn params(&self) -> CompressorParams {
        let (threshold, ratio, attack_secs, release_secs) = match self {
            Self::Light => (0.6, 2.0, 0.005, 0.1),
            Self::Medium => (0.4, 4.0, 0.003, 0.08),
            Self::Heavy => (0.3, 8.0, 0.001, 0.05),
            Self::Limiting => (0.2, 20.0, 0.0001, 0.03),
        };
        CompressorParams {
            threshold,
            ratio,
            attack_secs,
            release_secs,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
            Self::Limiting => "limiting",
        }
    }
}

/// Streaming/distribution loudness targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoudnessTarget {
    Spotify,
    AppleMusic,
    Youtube,
    Soundcloud,
    Cd,
}

impl LoudnessTarget {
    pub const ALL: [LoudnessTarget; 5] = [
        Self::Spotify,
        Self::AppleMusic,
        Self::Youtube,
        Self::Soundcloud,
        Self::Cd,
    ];

    pub fn lufs(&self) -> f64 {
        match self {
            Self::Spotify => -14.0,
            Self::AppleMusic => -16.0,
            Self::Youtube => -13.0,
            Self::Soundcloud => -8.0,
            Self::Cd => -9.0,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify",
            Self::AppleMusic => "apple-music",
            Self::Youtube => "youtube",
            Self::Soundcloud => "soundcloud",
            Self::Cd => "cd",
        }
    }
}

macro_rules! impl_id_parse {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim().to_lowercase().replace('_', "-");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.id() == wanted)
                    .ok_or_else(|| EngineError::InvalidConfig(format!("unknown {} '{}'", $what, s)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }
    };
}

impl_id_parse!(EqPreset, "EQ preset");
impl_id_parse!(CompressionLevel, "compression level");
impl_id_parse!(LoudnessTarget, "loudness target");

/// Immutable parameters for one mastering run. Construct with
/// [`MasteringConfig::new`], which rejects out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MasteringConfig {
    target_loudness: f64,
    compression: CompressionLevel,
    eq_preset: EqPreset,
    stereo_width: f64,
}

impl MasteringConfig {
    pub fn new(
        target_loudness: f64,
        compression: CompressionLevel,
        eq_preset: EqPreset,
        stereo_width: f64,
    ) -> Result<Self> {
        let (lo, hi) = TARGET_LOUDNESS_RANGE;
        if !target_loudness.is_finite() || !(lo..=hi).contains(&target_loudness) {
            return Err(EngineError::InvalidConfig(format!(
                "target_loudness {target_loudness} outside [{lo}, {hi}] LUFS"
            )));
        }
        let (lo, hi) = STEREO_WIDTH_RANGE;
        if !stereo_width.is_finite() || !(lo..=hi).contains(&stereo_width) {
            return Err(EngineError::InvalidConfig(format!(
                "stereo_width {stereo_width} outside [{lo}, {hi}]"
            )));
        }
        Ok(Self {
            target_loudness,
            compression,
            eq_preset,
            stereo_width,
        })
    }

    pub fn for_platform(
        target: LoudnessTarget,
        compression: CompressionLevel,
        eq_preset: EqPreset,
        stereo_width: f64,
    ) -> Result<Self> {
        Self::new(target.lufs(), compression, eq_preset, stereo_width)
    }

    pub fn target_loudness(&self) -> f64 {
        self.target_loudness
    }

    pub fn compression(&self) -> CompressionLevel {
        self.compression
    }

    pub fn eq_preset(&self) -> EqPreset {
        self.eq_preset
    }

    pub fn stereo_width(&self) -> f64 {
        self.stereo_width
    }
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self {
            target_loudness: LoudnessTarget::Spotify.lufs(),
            compression: CompressionLevel::Medium,
            eq_preset: EqPreset::Balanced,
            stereo_width: 1.0,
        }
    }
}

/// Master a raw buffer: EQ → compression → stereo width → loudness → limiter.
///
/// The caller's buffer is never touched; the chain runs on a private copy.
/// Fails with [`EngineError::EmptyAudio`] on a zero-length buffer. Silence is
/// fine and comes back as silence of the same length.
pub fn master(raw: &AudioBuffer, config: &MasteringConfig) -> Result<AudioBuffer> {
    raw.require_samples()?;

    log::info!(
        "Mastering {:.2}s ({} ch @ {} Hz): target {} LUFS, {} compression, {} EQ, width {}",
        raw.duration_secs(),
        raw.channel_count(),
        raw.sample_rate(),
        config.target_loudness,
        config.compression,
        config.eq_preset,
        config.stereo_width
    );

    let audio = raw.clone();
    let audio = apply_eq(audio, config.eq_preset);
    let audio = apply_compression(audio, config.compression);
    let audio = adjust_stereo_width(audio, config.stereo_width);
    let audio = normalize_loudness(audio, config.target_loudness);
    let audio = apply_limiter(audio, DEFAULT_LIMITER_THRESHOLD_DB);

    log::info!("Mastering complete: peak {:.4}", audio.peak());
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::db_to_linear;
    use std::f32::consts::PI;

    fn test_tone(sample_rate: u32, len: usize) -> AudioBuffer {
        let left: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.6 * (2.0 * PI * 220.0 * t).sin() + 0.3 * (2.0 * PI * 3300.0 * t).sin()
            })
            .collect();
        let right: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * PI * 330.0 * t).sin() + 0.2 * (2.0 * PI * 9000.0 * t).sin()
            })
            .collect();
        AudioBuffer::stereo(left, right, sample_rate).unwrap()
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        use CompressionLevel::Medium;
        use EqPreset::Balanced;
        assert!(MasteringConfig::new(-21.0, Medium, Balanced, 1.0).is_err());
        assert!(MasteringConfig::new(-7.9, Medium, Balanced, 1.0).is_err());
        assert!(MasteringConfig::new(f64::NAN, Medium, Balanced, 1.0).is_err());
        assert!(MasteringConfig::new(-14.0, Medium, Balanced, -0.1).is_err());
        assert!(MasteringConfig::new(-14.0, Medium, Balanced, 2.1).is_err());
        assert!(MasteringConfig::new(-14.0, Medium, Balanced, f64::NAN).is_err());
        assert!(MasteringConfig::new(-14.0, Medium, Balanced, f64::INFINITY).is_err());
        assert!(MasteringConfig::new(-20.0, Medium, Balanced, 0.0).is_ok());
        assert!(MasteringConfig::new(-8.0, Medium, Balanced, 2.0).is_ok());
    }

    #[test]
    fn every_platform_target_is_a_valid_config() {
        for target in LoudnessTarget::ALL {
            let cfg = MasteringConfig::for_platform(
                target,
                CompressionLevel::Medium,
                EqPreset::Balanced,
                1.0,
            );
            assert!(cfg.is_ok(), "{target} should be in range");
        }
    }

    #[test]
    fn ids_parse_back() {
        for p in EqPreset::ALL {
            assert_eq!(p.id().parse::<EqPreset>().unwrap(), p);
        }
        for c in CompressionLevel::ALL {
            assert_eq!(c.to_string().parse::<CompressionLevel>().unwrap(), c);
        }
        assert_eq!("Bass_Boost".parse::<EqPreset>().unwrap(), EqPreset::BassBoost);
        assert_eq!("apple_music".parse::<LoudnessTarget>().unwrap(), LoudnessTarget::AppleMusic);
        assert!("loud".parse::<CompressionLevel>().is_err());
    }

    #[test]
    fn presets_deserialize_kebab_case() {
        let p: EqPreset = serde_json::from_str("\"bass-boost\"").unwrap();
        assert_eq!(p, EqPreset::BassBoost);
        let c: CompressionLevel = serde_json::from_str("\"limiting\"").unwrap();
        assert_eq!(c, CompressionLevel::Limiting);
    }

    #[test]
    fn master_rejects_empty_audio() {
        let empty = AudioBuffer::stereo(Vec::new(), Vec::new(), 44100).unwrap();
        let err = master(&empty, &MasteringConfig::default()).unwrap_err();
        assert_eq!(err, EngineError::EmptyAudio);
    }

    #[test]
    fn master_silence_stays_finite_and_same_length() {
        let silent = AudioBuffer::mono(vec![0.0; 180], 44100).unwrap();
        let cfg = MasteringConfig::new(-14.0, CompressionLevel::Medium, EqPreset::Bright, 1.0).unwrap();
        let out = master(&silent, &cfg).unwrap();
        assert_eq!(out.sample_count(), 180);
        assert_eq!(out.channel_count(), 1);
        assert!(out.samples().all(|s| s.is_finite() && s == 0.0));
    }

    #[test]
    fn master_is_deterministic() {
        let raw = test_tone(44100, 8192);
        let cfg = MasteringConfig::new(-16.0, CompressionLevel::Heavy, EqPreset::Warm, 1.4).unwrap();
        let a = master(&raw, &cfg).unwrap();
        let b = master(&raw, &cfg).unwrap();
        let bits_a: Vec<u32> = a.samples().map(f32::to_bits).collect();
        let bits_b: Vec<u32> = b.samples().map(f32::to_bits).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn master_leaves_input_untouched_and_respects_ceiling() {
        let raw = test_tone(48000, 4096);
        let before = raw.clone();
        let cfg = MasteringConfig::new(-9.0, CompressionLevel::Light, EqPreset::BassBoost, 2.0).unwrap();
        let out = master(&raw, &cfg).unwrap();
        assert_eq!(raw, before);
        assert_eq!(out.sample_count(), raw.sample_count());
        let ceiling = db_to_linear(DEFAULT_LIMITER_THRESHOLD_DB) as f32;
        assert!(out.peak() <= ceiling, "peak {} > ceiling {}", out.peak(), ceiling);
        assert!(out.samples().all(f32::is_finite));
    }

    #[test]
    fn normalized_square_wave_is_clipped_to_ceiling() {
        // -20 LUFS → target RMS 10^(3/20) ≈ 1.41 before the limiter.
        let square: Vec<f32> = (0..4096).map(|i| if (i / 64) % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let raw = AudioBuffer::mono(square, 44100).unwrap();
        let cfg = MasteringConfig::new(-20.0, CompressionLevel::Light, EqPreset::Balanced, 1.0).unwrap();
        let out = master(&raw, &cfg).unwrap();
        // Square wave RMS == peak, so the limiter clips it to the ceiling exactly.
        let ceiling = db_to_linear(DEFAULT_LIMITER_THRESHOLD_DB) as f32;
        assert!(out.samples().all(|s| (s.abs() - ceiling).abs() < 1e-6));
    }
}
