//! The five category scores. Each starts from a base and collects fixed
//! bonuses when a feature lands in a range; the result is clamped to 0-100.
//! Thresholds are part of the scoring contract.

use crate::analyzer::AudioFeatures;

/// Loudness the production and radio scores are centred on.
pub const TARGET_LOUDNESS_LUFS: f64 = -14.0;

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

// ── Production Quality ────────────────────────────────────────────────
// Mix and master: loudness on target, healthy dynamics, balanced spectrum.
pub fn production_quality(f: &AudioFeatures) -> f64 {
    let mut score = 50.0;

    // Up to 15 pts, losing 2 per dB off -14 LUFS
    let loudness_diff = (f.loudness - TARGET_LOUDNESS_LUFS).abs();
    score += (15.0 - loudness_diff * 2.0).max(0.0);

    let dr = f.dynamic_range;
    if (8.0..=12.0).contains(&dr) {
        score += 20.0;
    } else if (6.0..=14.0).contains(&dr) {
        score += 10.0;
    }

    if (2000.0..=4000.0).contains(&f.spectral_centroid) {
        score += 15.0;
    }

    clamp_score(score)
}

// ── Commercial Appeal ─────────────────────────────────────────────────
// Mainstream tempo and a 3-4 minute runtime.
pub fn commercial_appeal(f: &AudioFeatures) -> f64 {
    let mut score = 50.0;

    if (100.0..=130.0).contains(&f.tempo) {
        score += 25.0;
    } else if (90.0..=140.0).contains(&f.tempo) {
        score += 15.0;
    }

    if (180.0..=240.0).contains(&f.duration) {
        score += 25.0;
    } else if (150.0..=270.0).contains(&f.duration) {
        score += 15.0;
    }

    clamp_score(score)
}

// ── Innovation ────────────────────────────────────────────────────────
// Starts higher (60): unusual tempo, harmonic richness, varied dynamics.
pub fn innovation(f: &AudioFeatures) -> f64 {
    let mut score = 60.0;

    if f.tempo < 80.0 || f.tempo > 150.0 {
        score += 15.0;
    }
    if f.harmonic_ratio > 0.6 {
        score += 10.0;
    }
    if f.rms_std > 0.1 {
        score += 15.0;
    }

    clamp_score(score)
}

// ── Emotional Impact ──────────────────────────────────────────────────
pub fn emotional_impact(f: &AudioFeatures) -> f64 {
    let mut score = 50.0;

    // Energy
    if f.rms_mean > 0.15 {
        score += 20.0;
    }
    // Dynamic movement
    if f.rms_std > 0.05 {
        score += 20.0;
    }
    // Harmonic richness
    if f.harmonic_ratio > 0.5 {
        score += 10.0;
    }

    clamp_score(score)
}

// ── Radio Readiness ───────────────────────────────────────────────────
// Radio wants 2:30-4:00 at streaming loudness.
pub fn radio_readiness(f: &AudioFeatures) -> f64 {
    let mut score = 50.0;

    if (150.0..=240.0).contains(&f.duration) {
        score += 30.0;
    } else if (120.0..=270.0).contains(&f.duration) {
        score += 15.0;
    }

    let loudness_diff = (f.loudness - TARGET_LOUDNESS_LUFS).abs();
    if loudness_diff < 2.0 {
        score += 20.0;
    } else if loudness_diff < 4.0 {
        score += 10.0;
    }

    clamp_score(score)
}
