use crate::audio::AudioBuffer;
use crate::dsp::{self, EPSILON};

/// Scale the whole buffer by one gain so its RMS matches the target.
///
/// Uses the engine's RMS loudness approximation
/// `target_rms = 10^((target_lufs + 23) / 20)`, not a gated K-weighted meter.
/// Score thresholds are calibrated against this formula. Digital silence
/// gets a gain of 1.0.
pub fn normalize_loudness(mut audio: AudioBuffer, target_lufs: f64) -> AudioBuffer {
    log::info!("Normalizing to {target_lufs} LUFS");

    let current_rms = dsp::rms(audio.samples());
    let target_rms = dsp::lufs_to_rms(target_lufs);
    let gain = if current_rms > EPSILON {
        target_rms / current_rms
    } else {
        1.0
    };
    log::debug!("Loudness gain {gain:.4} (rms {current_rms:.6} -> {target_rms:.6})");

    let gain = gain as f32;
    for channel in audio.channels_mut() {
        for sample in channel.iter_mut() {
            *sample *= gain;
        }
    }
    audio
}
