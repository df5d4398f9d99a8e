use super::CompressionLevel;
use crate::audio::AudioBuffer;
use crate::dsp::db_to_linear;

/// Limiter ceiling used by the mastering chain.
pub const DEFAULT_LIMITER_THRESHOLD_DB: f64 = -0.3;

/// Static peak compression: every sample whose magnitude exceeds the level's
/// threshold is pulled toward it by the ratio, keeping its sign.
///
/// There is no envelope follower; attack and release in
/// [`CompressorParams`](super::CompressorParams) are not applied.
pub fn apply_compression(mut audio: AudioBuffer, level: CompressionLevel) -> AudioBuffer {
    let p = level.params();
    log::info!(
        "Applying compression: {level} (threshold {}, ratio {}:1)",
        p.threshold,
        p.ratio
    );

    for channel in audio.channels_mut() {
        for sample in channel.iter_mut() {
            *sample = compress_sample(*sample, p.threshold, p.ratio);
        }
    }
    audio
}

#[inline]
fn compress_sample(x: f32, threshold: f32, ratio: f32) -> f32 {
    let mag = x.abs();
    if mag > threshold {
        (threshold + (mag - threshold) / ratio).copysign(x)
    } else {
        x
    }
}

/// Brick-wall clip to ±10^(threshold_db/20). Idempotent.
pub fn apply_limiter(mut audio: AudioBuffer, threshold_db: f64) -> AudioBuffer {
    let ceiling = db_to_linear(threshold_db) as f32;
    log::info!("Applying limiter: ceiling {threshold_db} dBFS ({ceiling:.4})");

    let mut clipped = 0usize;
    for channel in audio.channels_mut() {
        for sample in channel.iter_mut() {
            if sample.abs() > ceiling {
                clipped += 1;
            }
            *sample = sample.clamp(-ceiling, ceiling);
        }
    }
    log::debug!("Limiter clipped {clipped} samples");
    audio
}
