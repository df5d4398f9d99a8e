pub mod analyzer;
pub mod audio;
pub mod config;
pub mod dsp;
pub mod mastering;
pub mod scoring;

pub use analyzer::report::{AnalysisReport, analyze};
pub use analyzer::{AudioFeatures, ExtractorConfig, HarmonicMode, extract_features};
pub use audio::{AudioBuffer, EngineError};
pub use mastering::{MasteringConfig, master};
pub use scoring::{ScoreReport, TrackMetadata, calculate_score, score};

/// Audio file extensions the CLI reads
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

/// Application name for XDG paths
pub const APP_NAME: &str = "hitmeter";
