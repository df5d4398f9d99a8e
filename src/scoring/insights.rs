//! Human-readable insight and recommendation lines for a score report.

use super::{Category, CategoryScores};
use crate::analyzer::AudioFeatures;

/// Categories under this score get a recommendation.
pub const WEAK_THRESHOLD: f64 = 70.0;

pub fn generate_insights(scores: &CategoryScores, overall: f64, f: &AudioFeatures) -> Vec<String> {
    let mut insights = Vec::new();

    let banner = if overall >= 85.0 {
        "🏆 Grammy-worthy production quality!"
    } else if overall >= 70.0 {
        "⭐ Strong hit potential detected"
    } else if overall >= 60.0 {
        "📻 Radio-ready with some polish"
    } else {
        "🎵 Good foundation, needs refinement"
    };
    insights.push(banner.to_string());

    insights.push(format!("✨ Strongest in: {}", scores.best().label()));

    if f.loudness < -16.0 {
        insights.push("🔊 Track is quieter than commercial standards".to_string());
    } else if f.loudness > -10.0 {
        insights.push("⚠️ Track may be over-compressed".to_string());
    }

    if f.tempo > 140.0 {
        insights.push("⚡ High-energy tempo great for clubs/festivals".to_string());
    } else if f.tempo < 90.0 {
        insights.push("🌙 Slower tempo perfect for emotional moments".to_string());
    }

    insights
}

/// One or more lines per category scoring under [`WEAK_THRESHOLD`], in
/// category order. A single positive line when nothing is weak.
pub fn generate_recommendations(scores: &CategoryScores, f: &AudioFeatures) -> Vec<String> {
    let mut recs = Vec::new();

    for (category, score) in scores.iter() {
        if score >= WEAK_THRESHOLD {
            continue;
        }
        let before = recs.len();
        match category {
            Category::ProductionQuality => {
                if (f.loudness + 14.0).abs() > 3.0 {
                    recs.push("🎛️ Adjust mastering to target -14 LUFS");
                }
                if f.dynamic_range < 6.0 {
                    recs.push("🎚️ Reduce compression to preserve dynamics");
                }
                if recs.len() == before {
                    recs.push("🎛️ Rebalance EQ toward a 2-4 kHz spectral centroid");
                }
            }
            Category::CommercialAppeal => {
                if f.duration < 150.0 {
                    recs.push("⏱️ Consider extending to 2:30-3:30 for radio");
                } else if f.duration > 270.0 {
                    recs.push("✂️ Trim to under 4 minutes for radio play");
                } else {
                    recs.push("🥁 Aim for 100-130 BPM for mainstream appeal");
                }
            }
            Category::Innovation => {
                recs.push("💡 Add unexpected dynamics or an unusual tempo to stand out");
            }
            Category::EmotionalImpact => {
                recs.push("❤️ Build more energy and dynamic contrast");
            }
            Category::RadioReadiness => {
                recs.push("📻 Optimize for streaming loudness standards");
            }
        }
    }

    if recs.is_empty() {
        recs.push("🎉 Track is well-balanced and ready for release!");
    }
    recs.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: [f64; 5]) -> CategoryScores {
        CategoryScores {
            production_quality: values[0],
            commercial_appeal: values[1],
            innovation: values[2],
            emotional_impact: values[3],
            radio_readiness: values[4],
        }
    }

    fn features() -> AudioFeatures {
        AudioFeatures {
            loudness: -14.0,
            tempo: 120.0,
            duration: 200.0,
            dynamic_range: 10.0,
            ..AudioFeatures::default()
        }
    }

    #[test]
    fn banner_tiers() {
        let s = scores([80.0; 5]);
        let f = features();
        for (overall, banner) in [
            (85.0, "🏆 Grammy-worthy production quality!"),
            (84.99, "⭐ Strong hit potential detected"),
            (70.0, "⭐ Strong hit potential detected"),
            (69.99, "📻 Radio-ready with some polish"),
            (60.0, "📻 Radio-ready with some polish"),
            (59.99, "🎵 Good foundation, needs refinement"),
        ] {
            assert_eq!(generate_insights(&s, overall, &f)[0], banner, "overall={overall}");
        }
    }

    #[test]
    fn strongest_category_is_named_in_title_case() {
        let s = scores([50.0, 60.0, 70.0, 95.0, 80.0]);
        let insights = generate_insights(&s, 70.0, &features());
        assert_eq!(insights[1], "✨ Strongest in: Emotional Impact");
        assert_eq!(insights.len(), 2);
    }

    #[test]
    fn ties_go_to_the_earlier_category() {
        let s = scores([90.0, 90.0, 60.0, 90.0, 90.0]);
        let insights = generate_insights(&s, 80.0, &features());
        assert_eq!(insights[1], "✨ Strongest in: Production Quality");
    }

    #[test]
    fn loudness_and_tempo_lines() {
        let s = scores([80.0; 5]);
        let mut f = features();
        f.loudness = -16.5;
        f.tempo = 141.0;
        let insights = generate_insights(&s, 80.0, &f);
        assert!(insights.contains(&"🔊 Track is quieter than commercial standards".to_string()));
        assert!(insights.contains(&"⚡ High-energy tempo great for clubs/festivals".to_string()));

        f.loudness = -9.5;
        f.tempo = 89.0;
        let insights = generate_insights(&s, 80.0, &f);
        assert!(insights.contains(&"⚠️ Track may be over-compressed".to_string()));
        assert!(insights.contains(&"🌙 Slower tempo perfect for emotional moments".to_string()));

        // boundaries are exclusive
        f.loudness = -16.0;
        f.tempo = 140.0;
        assert_eq!(generate_insights(&s, 80.0, &f).len(), 2);
        f.loudness = -10.0;
        f.tempo = 90.0;
        assert_eq!(generate_insights(&s, 80.0, &f).len(), 2);
    }

    #[test]
    fn all_strong_gives_single_positive_line() {
        let recs = generate_recommendations(&scores([70.0; 5]), &features());
        assert_eq!(recs, vec!["🎉 Track is well-balanced and ready for release!"]);
    }

    #[test]
    fn weak_production_lines() {
        let mut f = features();
        f.loudness = -18.0;
        f.dynamic_range = 4.0;
        let recs = generate_recommendations(&scores([60.0, 80.0, 80.0, 80.0, 80.0]), &f);
        assert_eq!(
            recs,
            vec![
                "🎛️ Adjust mastering to target -14 LUFS",
                "🎚️ Reduce compression to preserve dynamics",
            ]
        );

        // |loudness + 14| == 3 is not enough for the loudness line
        f.loudness = -17.0;
        f.dynamic_range = 10.0;
        let recs = generate_recommendations(&scores([60.0, 80.0, 80.0, 80.0, 80.0]), &f);
        assert_eq!(recs, vec!["🎛️ Rebalance EQ toward a 2-4 kHz spectral centroid"]);
    }

    #[test]
    fn weak_commercial_lines() {
        let s = scores([80.0, 50.0, 80.0, 80.0, 80.0]);
        let mut f = features();
        f.duration = 120.0;
        assert_eq!(generate_recommendations(&s, &f), vec!["⏱️ Consider extending to 2:30-3:30 for radio"]);
        f.duration = 300.0;
        assert_eq!(generate_recommendations(&s, &f), vec!["✂️ Trim to under 4 minutes for radio play"]);
        f.duration = 200.0;
        assert_eq!(generate_recommendations(&s, &f), vec!["🥁 Aim for 100-130 BPM for mainstream appeal"]);
    }

    #[test]
    fn every_weak_category_is_addressed_in_order() {
        let recs = generate_recommendations(&scores([69.0; 5]), &features());
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[4], "📻 Optimize for streaming loudness standards");
        assert!(!recs.iter().any(|r| r.starts_with("🎉")));
    }
}
