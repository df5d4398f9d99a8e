use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::analyzer::{ExtractorConfig, HarmonicMode};
use crate::audio::Result;
use crate::mastering::{CompressionLevel, EqPreset, MasteringConfig};

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults; the config file is optional.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Number of parallel workers for batch scoring. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// Defaults for `master` when not given on the command line.
    pub mastering: MasteringDefaults,
    /// Feature extraction settings used by `score`.
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MasteringDefaults {
    /// LUFS, -20..=-8.
    pub target_loudness: f64,
    pub compression: CompressionLevel,
    pub eq_preset: EqPreset,
    /// 0..=2, 1.0 leaves the image untouched.
    pub stereo_width: f64,
}

impl Default for MasteringDefaults {
    fn default() -> Self {
        let config = MasteringConfig::default();
        Self {
            target_loudness: config.target_loudness(),
            compression: config.compression(),
            eq_preset: config.eq_preset(),
            stereo_width: config.stereo_width(),
        }
    }
}

impl MasteringDefaults {
    /// Validated engine config. Out-of-range values from the file are an error,
    /// not clamped.
    pub fn to_config(&self) -> Result<MasteringConfig> {
        MasteringConfig::new(self.target_loudness, self.compression, self.eq_preset, self.stereo_width)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub frame_length: usize,
    pub hop_length: usize,
    pub harmonic_mode: HarmonicMode,
    /// Use the lightweight preset (coarser hop, centroid harmonic estimate),
    /// ignoring the three fields above.
    pub lightweight: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let config = ExtractorConfig::default();
        Self {
            frame_length: config.frame_length,
            hop_length: config.hop_length,
            harmonic_mode: config.harmonic_mode,
            lightweight: false,
        }
    }
}

impl AnalysisSettings {
    pub fn extractor_config(&self) -> ExtractorConfig {
        if self.lightweight {
            return ExtractorConfig::lightweight();
        }
        ExtractorConfig {
            frame_length: self.frame_length,
            hop_length: self.hop_length,
            harmonic_mode: self.harmonic_mode,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/hitmeter/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
