//! Band-limited phase accumulator and the engine's two oscillator-derived
//! signal sources: the audible [`Oscillator`] and the control-rate [`Lfo`].
//!
//! Anti-aliasing for the discontinuous waveforms (square, saw) uses PolyBLEP
//! (Polynomial Band-Limited Step), applied within one sample of the
//! transition. Sine and triangle need no correction: sine has no
//! discontinuity and triangle's is naturally band-limited (its *derivative*
//! is discontinuous, not the signal itself).

use super::fastmath::sinf;
use crate::types::Waveform;
use std::f32::consts::PI;

/// PolyBLEP correction for band-limited discontinuities.
///
/// - `t`: current phase position in `[0, 1)`
/// - `dt`: phase increment per sample (frequency * inverse sample rate)
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    if t < dt {
        let t = t / dt;
        return t + t - t * t - 1.0;
    }
    if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        return t * t + t + t + 1.0;
    }
    0.0
}

/// Phase accumulator shared by the audible oscillator and the LFO.
///
/// Maintains a phase in `[0, 1)` and advances it each sample by `freq * isr`.
#[derive(Clone, Copy, Default)]
pub struct Phasor {
    pub phase: f32,
}

impl Phasor {
    #[inline]
    pub fn advance(&mut self, freq: f32, isr: f32) {
        self.phase += freq * isr;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        if self.phase < 0.0 {
            self.phase += 1.0;
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// The audible signal source. Bandlimited via PolyBLEP for square/saw.
///
/// `generate_sample` advances internal phase by one sample and returns a
/// value in `[-1, 1]`.
#[derive(Clone, Copy, Default)]
pub struct Oscillator {
    phasor: Phasor,
    freq: f32,
    waveform: Waveform,
}

impl Oscillator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz.max(0.0);
    }

    pub fn frequency(&self) -> f32 {
        self.freq
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn reset_phase(&mut self) {
        self.phasor.reset();
    }

    /// Generates one sample at the oscillator's current frequency and
    /// advances phase. `isr` is `1.0 / sample_rate`.
    pub fn generate_sample(&mut self, isr: f32) -> f32 {
        self.generate_sample_at(self.freq, isr)
    }

    /// Generates one sample at an explicitly supplied frequency, for blocks
    /// where pitch is swept sample-by-sample (the pitch envelope). Advances
    /// phase by the supplied frequency rather than the stored one.
    pub fn generate_sample_at(&mut self, freq_hz: f32, isr: f32) -> f32 {
        let phase = self.phasor.phase;
        let dt = freq_hz * isr;

        let sample = match self.waveform {
            Waveform::Sine => sinf(phase * 2.0 * PI),
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Saw => {
                let blep = poly_blep(phase, dt);
                phase * 2.0 - 1.0 - blep
            }
            Waveform::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, dt) - poly_blep((phase + 0.5).fract(), dt)
            }
        };

        self.phasor.advance(freq_hz, isr);
        sample
    }
}

/// Low-frequency modulation source. Identical generation to [`Oscillator`]
/// but meant for control-rate use (filter/cutoff wobble), with an output
/// depth scale and block-fill API.
#[derive(Clone, Copy, Default)]
pub struct Lfo {
    osc: Oscillator,
    depth: f32,
}

impl Lfo {
    pub fn new() -> Self {
        Self {
            osc: Oscillator::new(),
            depth: 1.0,
        }
    }

    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.osc.set_frequency(freq_hz);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    /// Sets output scale. Depth 0 yields a zero block regardless of phase.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    /// Fills `buf[..n]` with LFO samples scaled by depth.
    pub fn generate(&mut self, buf: &mut [f32], n: usize, isr: f32) {
        if self.depth == 0.0 {
            for slot in buf.iter_mut().take(n) {
                *slot = 0.0;
            }
            // Phase still advances at depth 0 so behavior stays continuous
            // if depth is raised mid-note.
            for _ in 0..n {
                self.osc.phasor.advance(self.osc.freq, isr);
            }
            return;
        }
        for slot in buf.iter_mut().take(n) {
            *slot = self.osc.generate_sample(isr) * self.depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_oscillator_is_bounded() {
        let mut osc = Oscillator::new();
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(440.0);
        let isr = 1.0 / 48_000.0;
        for _ in 0..48_000 {
            let s = osc.generate_sample(isr);
            assert!((-1.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn oscillator_at_zero_freq_is_dc() {
        let mut osc = Oscillator::new();
        osc.set_waveform(Waveform::Sine);
        osc.set_frequency(0.0);
        let isr = 1.0 / 48_000.0;
        let first = osc.generate_sample(isr);
        for _ in 0..1000 {
            let s = osc.generate_sample(isr);
            assert!((s - first).abs() < 1e-6);
        }
    }

    #[test]
    fn lfo_depth_zero_is_silent() {
        let mut lfo = Lfo::new();
        lfo.set_frequency(5.0);
        lfo.set_depth(0.0);
        let mut buf = [1.0; 16];
        lfo.generate(&mut buf, 16, 1.0 / 48_000.0);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn waveform_index_wraps() {
        assert_eq!(Waveform::from_index(4), Waveform::Sine);
        assert_eq!(Waveform::from_index(-1), Waveform::Triangle);
    }
}
