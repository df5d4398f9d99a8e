//! Preset EQ: a series of second-order peak filters, each run forward and
//! backward (zero phase) and then scaled by the band gain.

use super::EqPreset;
use crate::audio::AudioBuffer;
use crate::dsp::db_to_linear;
use std::f64::consts::PI;

/// Quality factor shared by every band.
pub const BAND_Q: f64 = 1.0;

/// Edge padding for forward/backward filtering: 3 × filter length.
const PAD_LEN: usize = 9;

/// Second-order IIR section in direct form II transposed, `a[0] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Resonant peak filter centred on `center_hz` with quality `q`.
    ///
    /// Returns `None` when the centre is at or above Nyquist, where the design
    /// is undefined.
    pub fn peak(center_hz: f64, q: f64, sample_rate: u32) -> Option<Self> {
        let nyquist = sample_rate as f64 / 2.0;
        if center_hz <= 0.0 || center_hz >= nyquist {
            return None;
        }
        let w0 = PI * center_hz / nyquist;
        let bandwidth = w0 / q;
        let beta = (bandwidth / 2.0).tan();
        let gain = 1.0 / (1.0 + beta);
        Some(Self {
            b: [1.0 - gain, 0.0, -(1.0 - gain)],
            a: [1.0, -2.0 * gain * w0.cos(), 2.0 * gain - 1.0],
        })
    }

    /// Run the filter over `x` starting from state `zi`.
    fn run(&self, x: &[f64], zi: [f64; 2]) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let [mut z0, mut z1] = zi;
        x.iter()
            .map(|&xn| {
                let y = b0 * xn + z0;
                z0 = b1 * xn - a1 * y + z1;
                z1 = b2 * xn - a2 * y;
                y
            })
            .collect()
    }

    /// Steady-state of the filter for a unit step input.
    fn step_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    /// Zero-phase filtering: forward pass, reverse, second pass, reverse.
    /// Edges are odd-extended and both passes start in steady state so the
    /// output does not ring in from zero.
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let pad = PAD_LEN.min(x.len() - 1);
        let ext = odd_extend(x, pad);
        let zi = self.step_state();

        let x0 = ext[0];
        let mut y = self.run(&ext, [zi[0] * x0, zi[1] * x0]);
        let y0 = y[y.len() - 1];
        y.reverse();
        let mut y = self.run(&y, [zi[0] * y0, zi[1] * y0]);
        y.reverse();

        y.drain(..pad);
        y.truncate(x.len());
        y
    }
}

/// Point-symmetric extension of `x` by `n` samples on each side.
fn odd_extend(x: &[f64], n: usize) -> Vec<f64> {
    let len = x.len();
    let (first, last) = (x[0], x[len - 1]);
    let mut out = Vec::with_capacity(len + 2 * n);
    out.extend((1..=n).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=n).map(|i| 2.0 * last - x[len - 1 - i]));
    out
}

/// Apply an EQ preset to every channel independently. `Balanced` returns the
/// buffer untouched.
pub fn apply_eq(mut audio: AudioBuffer, preset: EqPreset) -> AudioBuffer {
    log::info!("Applying EQ preset: {preset}");

    let sample_rate = audio.sample_rate();
    for &(center_hz, gain_db) in preset.bands() {
        let Some(filter) = Biquad::peak(center_hz, BAND_Q, sample_rate) else {
            log::warn!(
                "Skipping {center_hz} Hz EQ band: at or above Nyquist for {sample_rate} Hz audio"
            );
            continue;
        };
        let gain = db_to_linear(gain_db);
        log::debug!("EQ band {center_hz} Hz: gain {gain:.4} ({gain_db:+} dB)");

        for channel in audio.channels_mut() {
            let input: Vec<f64> = channel.iter().map(|&s| s as f64).collect();
            let filtered = filter.filtfilt(&input);
            for (out, y) in channel.iter_mut().zip(filtered) {
                *out = (y * gain) as f32;
            }
        }
    }
    audio
}
