use crate::audio::AudioBuffer;

/// Mid/side width adjustment. 0.0 folds to mono-in-stereo, 1.0 is identity,
/// 2.0 doubles the side signal. Mono buffers pass through untouched.
///
/// No clipping guard: the limiter at the end of the chain handles overs.
pub fn adjust_stereo_width(mut audio: AudioBuffer, width: f64) -> AudioBuffer {
    debug_assert!(
        (0.0..=2.0).contains(&width),
        "stereo width {width} outside 0..=2"
    );
    if width == 1.0 {
        return audio;
    }
    let Some((left, right)) = audio.stereo_mut() else {
        log::debug!("Stereo width skipped: mono input");
        return audio;
    };
    log::info!("Adjusting stereo width: {width}");

    let width = width as f32;
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let mid = (*l + *r) / 2.0;
        let side = (*l - *r) / 2.0 * width;
        *l = mid + side;
        *r = mid - side;
    }
    audio
}
