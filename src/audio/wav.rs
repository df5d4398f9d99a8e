use super::{AudioBuffer, EngineError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Decode a WAV file into an [`AudioBuffer`], scaling integer PCM to [-1.0, 1.0].
pub fn load_wav(path: &Path) -> Result<AudioBuffer, WavError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext != "wav" {
        return Err(WavError::UnsupportedFormat(ext));
    }

    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    log::debug!(
        "Decoding {}: {} ch, {} Hz, {} bit {:?}",
        path.display(),
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}

/// Encode a buffer as 32-bit float WAV with the buffer's rate and channel count.
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<(), WavError> {
    let spec = WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in buffer.to_interleaved() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
