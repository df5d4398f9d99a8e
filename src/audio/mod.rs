pub mod wav;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Audio buffer is empty")]
    EmptyAudio,
    #[error("Unsupported channel layout: {0} channels (expected 1 or 2)")]
    UnsupportedChannelLayout(usize),
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
    #[error("Channel length mismatch: expected {expected} samples, found {found}")]
    ChannelLengthMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Multichannel sample matrix plus sample rate.
///
/// Always holds one or two channels of equal length. Samples are nominally in
/// [-1.0, 1.0] but may exceed that range between mastering stages.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if !(1..=2).contains(&channels.len()) {
            return Err(EngineError::UnsupportedChannelLayout(channels.len()));
        }
        let expected = channels[0].len();
        if let Some(ch) = channels.iter().find(|ch| ch.len() != expected) {
            return Err(EngineError::ChannelLengthMismatch {
                expected,
                found: ch.len(),
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    /// Build from frame-interleaved samples (L R L R ...).
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if !(1..=2).contains(&channel_count) {
            return Err(EngineError::UnsupportedChannelLayout(channel_count));
        }
        let frames = samples.len() / channel_count;
        let partial = samples.len() % channel_count;
        if partial != 0 {
            log::warn!(
                "Dropping {partial} trailing samples: not a whole {channel_count}-channel frame"
            );
        }
        let channels = (0..channel_count)
            .map(|c| {
                samples
                    .iter()
                    .skip(c)
                    .step_by(channel_count)
                    .take(frames)
                    .copied()
                    .collect()
            })
            .collect();
        Self::new(channels, sample_rate)
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.sample_count() * self.channel_count());
        for i in 0..self.sample_count() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mutable sample access, one fixed-length slice per channel.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> + '_ {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Left and right sample slices, or `None` for mono.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match self.channels.as_mut_slice() {
            [left, right] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn sample_count(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.sample_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Every sample of every channel, channel by channel.
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.channels.iter().flat_map(|ch| ch.iter().copied())
    }

    /// Average of all channels.
    pub fn to_mono(&self) -> Vec<f32> {
        match self.channels.as_slice() {
            [mono] => mono.clone(),
            [left, right] => left
                .iter()
                .zip(right)
                .map(|(l, r)| (l + r) * 0.5)
                .collect(),
            _ => unreachable!("channel count is validated on construction"),
        }
    }

    pub fn peak(&self) -> f32 {
        self.samples().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub(crate) fn require_samples(&self) -> Result<()> {
        if self.is_empty() {
            Err(EngineError::EmptyAudio)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_three_channels() {
        let err = AudioBuffer::new(vec![vec![0.0; 4]; 3], 44100).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedChannelLayout(3));
    }

    #[test]
    fn rejects_no_channels() {
        let err = AudioBuffer::new(Vec::new(), 44100).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedChannelLayout(0));
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let err = AudioBuffer::mono(vec![0.0; 4], 0).unwrap_err();
        assert_eq!(err, EngineError::InvalidSampleRate(0));
    }

    #[test]
    fn rejects_ragged_channels() {
        let err = AudioBuffer::stereo(vec![0.0; 4], vec![0.0; 3], 48000).unwrap_err();
        assert_eq!(
            err,
            EngineError::ChannelLengthMismatch {
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn interleave_round_trip() {
        let interleaved = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buf = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();
        assert_eq!(buf.channel_count(), 2);
        assert_eq!(buf.sample_count(), 3);
        assert_eq!(buf.channels()[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(buf.channels()[1], vec![-0.1, -0.2, -0.3]);
        assert_eq!(buf.to_interleaved(), interleaved);
    }

    #[test]
    fn trailing_partial_frame_is_dropped() {
        let buf = AudioBuffer::from_interleaved(&[0.1, -0.1, 0.2, -0.2, 0.3], 2, 44100).unwrap();
        assert_eq!(buf.sample_count(), 2);
        assert_eq!(buf.channels()[0], vec![0.1, 0.2]);
        assert_eq!(buf.channels()[1], vec![-0.1, -0.2]);
    }

    #[test]
    fn mutable_access_keeps_channel_lengths() {
        let mut buf = AudioBuffer::stereo(vec![0.5; 5], vec![-0.5; 5], 44100).unwrap();
        for channel in buf.channels_mut() {
            assert_eq!(channel.len(), 5);
            channel[0] = 0.0;
            channel.reverse();
        }
        let (left, right) = buf.stereo_mut().unwrap();
        left[0] = 1.0;
        right[0] = -1.0;

        assert_eq!(buf.channels()[0], vec![1.0, 0.5, 0.5, 0.5, 0.0]);
        assert_eq!(buf.channels()[1], vec![-1.0, -0.5, -0.5, -0.5, 0.0]);
        assert_eq!(buf.to_interleaved().len(), 10);

        let mut mono = AudioBuffer::mono(vec![0.0; 3], 44100).unwrap();
        assert!(mono.stereo_mut().is_none());
        assert_eq!(mono.channels_mut().count(), 1);
    }

    #[test]
    fn duration_and_downmix() {
        let buf = AudioBuffer::stereo(vec![1.0; 22050], vec![0.0; 22050], 44100).unwrap();
        assert!((buf.duration_secs() - 0.5).abs() < 1e-12);
        assert!(buf.to_mono().iter().all(|&s| (s - 0.5).abs() < 1e-7));
        assert!((buf.peak() - 1.0).abs() < 1e-7);
    }

    #[test]
    fn empty_buffer_is_valid_but_flagged() {
        let buf = AudioBuffer::mono(Vec::new(), 44100).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.require_samples(), Err(EngineError::EmptyAudio));
    }
}
