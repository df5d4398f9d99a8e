pub mod categories;
pub mod insights;

use crate::analyzer::{self, AudioFeatures, ExtractorConfig};
use crate::audio::{AudioBuffer, Result};
use serde::{Deserialize, Serialize};

/// Caller-supplied track information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub genre: Option<String>,
    /// Declared duration in seconds. Informational; scoring uses the
    /// measured duration of the audio.
    pub duration: Option<f64>,
}

impl TrackMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ProductionQuality,
    CommercialAppeal,
    Innovation,
    EmotionalImpact,
    RadioReadiness,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::ProductionQuality,
        Self::CommercialAppeal,
        Self::Innovation,
        Self::EmotionalImpact,
        Self::RadioReadiness,
    ];

    /// Share of the overall score. The five weights sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            Self::ProductionQuality => 0.25,
            Self::CommercialAppeal => 0.30,
            Self::Innovation => 0.15,
            Self::EmotionalImpact => 0.20,
            Self::RadioReadiness => 0.10,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::ProductionQuality => "production_quality",
            Self::CommercialAppeal => "commercial_appeal",
            Self::Innovation => "innovation",
            Self::EmotionalImpact => "emotional_impact",
            Self::RadioReadiness => "radio_readiness",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductionQuality => "Production Quality",
            Self::CommercialAppeal => "Commercial Appeal",
            Self::Innovation => "Innovation",
            Self::EmotionalImpact => "Emotional Impact",
            Self::RadioReadiness => "Radio Readiness",
        }
    }
}

/// All five category scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub production_quality: f64,
    pub commercial_appeal: f64,
    pub innovation: f64,
    pub emotional_impact: f64,
    pub radio_readiness: f64,
}

impl CategoryScores {
    pub fn from_features(f: &AudioFeatures) -> Self {
        Self {
            production_quality: categories::production_quality(f),
            commercial_appeal: categories::commercial_appeal(f),
            innovation: categories::innovation(f),
            emotional_impact: categories::emotional_impact(f),
            radio_readiness: categories::radio_readiness(f),
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::ProductionQuality => self.production_quality,
            Category::CommercialAppeal => self.commercial_appeal,
            Category::Innovation => self.innovation,
            Category::EmotionalImpact => self.emotional_impact,
            Category::RadioReadiness => self.radio_readiness,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Highest-scoring category; ties go to the earliest in [`Category::ALL`].
    pub fn best(&self) -> Category {
        self.iter()
            .fold(None::<(Category, f64)>, |best, (c, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((c, v)),
            })
            .map_or(Category::ProductionQuality, |(c, _)| c)
    }

    /// Weighted sum over the fixed weight table.
    pub fn overall(&self) -> f64 {
        self.iter().map(|(c, v)| v * c.weight()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub title: String,
    /// Weighted sum of the category scores, unrounded.
    pub overall_score: f64,
    pub category_scores: CategoryScores,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub features: AudioFeatures,
}

/// Score already-extracted features. Pure and deterministic.
pub fn calculate_score(features: &AudioFeatures, metadata: &TrackMetadata) -> ScoreReport {
    let category_scores = CategoryScores::from_features(features);
    let overall_score = category_scores.overall();

    if let Some(declared) = metadata
        .duration
        .filter(|d| (d - features.duration).abs() > 1.0)
    {
        log::debug!(
            "Declared duration {declared:.1}s differs from measured {:.1}s; using measured",
            features.duration
        );
    }

    ScoreReport {
        title: metadata.title.clone(),
        overall_score,
        category_scores,
        insights: insights::generate_insights(&category_scores, overall_score, features),
        recommendations: insights::generate_recommendations(&category_scores, features),
        features: *features,
    }
}

pub fn score(audio: &AudioBuffer, metadata: &TrackMetadata) -> Result<ScoreReport> {
    score_with(audio, metadata, &ExtractorConfig::default())
}

/// Extract features with `config`, then score them.
pub fn score_with(
    audio: &AudioBuffer,
    metadata: &TrackMetadata,
    config: &ExtractorConfig,
) -> Result<ScoreReport> {
    log::info!("Calculating hit score for: {}", metadata.title);
    let features = analyzer::extract_features_with(audio, config)?;
    let report = calculate_score(&features, metadata);
    log::info!("Hit score: {:.2}", report.overall_score);
    Ok(report)
}
