//! One-pole resonant low-pass filter.
//!
//! Not a biquad: a single real pole with an explicit resonance feedback term,
//! cheap enough to recompute every sample when swept by the LFO while still
//! caching its one coefficient across samples where the cutoff holds still.

use super::fastmath::{expf, ftz};

/// One-pole low-pass with a resonance term feeding back the second
/// difference of the output.
///
/// ```text
/// y[n] = y[n-1] + a * (x[n] - y[n-1] + q * (y[n-1] - y[n-2]))
/// a = 1 - exp(-2*pi*fc/sr)
/// ```
///
/// Stable for `q < 1`; the public setter clamps to `0.95` with margin to
/// spare.
#[derive(Clone, Copy, Default)]
pub struct LowPassFilter {
    cutoff: f32,
    resonance: f32,
    cached_cutoff: f32,
    cached_sr: f32,
    cached_alpha: f32,
    y1: f32,
    y2: f32,
}

impl LowPassFilter {
    pub fn new() -> Self {
        Self {
            cutoff: 1000.0,
            resonance: 0.0,
            cached_cutoff: f32::NAN,
            cached_sr: f32::NAN,
            cached_alpha: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Clamps to `[20, sr/2 * 0.9]`. The upper bound needs `sr` so it is
    /// reapplied lazily in [`LowPassFilter::process`]; this setter only
    /// enforces the lower bound and an absolute sanity ceiling.
    pub fn set_cutoff(&mut self, fc_hz: f32) {
        self.cutoff = fc_hz.max(20.0);
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.0, 0.95);
    }

    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    fn alpha(&mut self, fc: f32, sr: f32) -> f32 {
        if self.cached_cutoff != fc || self.cached_sr != sr {
            self.cached_cutoff = fc;
            self.cached_sr = sr;
            let omega = -2.0 * std::f32::consts::PI * fc / sr;
            self.cached_alpha = 1.0 - expf(omega);
        }
        self.cached_alpha
    }

    /// Processes one sample at the filter's stored cutoff/resonance.
    pub fn process(&mut self, input: f32, sr: f32) -> f32 {
        let fc = self.cutoff.clamp(20.0, sr * 0.5 * 0.9);
        self.process_at(input, fc, self.resonance, sr)
    }

    /// Processes one sample at an explicitly supplied cutoff, used when the
    /// block's LFO modulates cutoff sample-by-sample instead of once per
    /// block.
    pub fn process_at(&mut self, input: f32, fc_hz: f32, q: f32, sr: f32) -> f32 {
        let fc = fc_hz.clamp(20.0, sr * 0.5 * 0.9);
        let q = q.clamp(0.0, 0.95);
        let a = self.alpha(fc, sr);

        let y = self.y1 + a * (input - self.y1 + q * (self.y1 - self.y2));
        self.y2 = ftz(self.y1, 1e-20);
        self.y1 = ftz(y, 1e-20);
        y
    }

    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_dc_at_nyquist_cutoff() {
        let mut f = LowPassFilter::new();
        f.set_cutoff(48_000.0);
        f.set_resonance(0.0);
        let sr = 48_000.0;
        let mut last = 0.0;
        for _ in 0..1000 {
            last = f.process(1.0, sr);
        }
        assert!(last > 0.9, "expected near-unity passband, got {last}");
    }

    #[test]
    fn attenuates_high_freq_at_low_cutoff() {
        let sr = 48_000.0;
        let mut f = LowPassFilter::new();
        f.set_cutoff(20.0);
        f.set_resonance(0.0);

        let freq = 1000.0_f32;
        let n = 4800;
        let mut out_rms = 0.0f32;
        let mut in_rms = 0.0f32;
        for i in 0..n {
            let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin();
            let y = f.process(x, sr);
            in_rms += x * x;
            out_rms += y * y;
        }
        in_rms = (in_rms / n as f32).sqrt();
        out_rms = (out_rms / n as f32).sqrt();
        let db = 20.0 * (out_rms / in_rms).log10();
        assert!(db <= -30.0, "expected >= 30 dB attenuation, got {db} dB");
    }

    #[test]
    fn stable_under_max_resonance_on_silence() {
        let mut f = LowPassFilter::new();
        f.set_cutoff(1000.0);
        f.set_resonance(0.95);
        let y = f.process_at(1.0, 1000.0, 0.95, 48_000.0);
        assert!(y.is_finite());
        for _ in 0..48_000 * 10 {
            let y = f.process(0.0, 48_000.0);
            assert!(y.is_finite());
            assert!(y.abs() < 10.0);
        }
    }

    #[test]
    fn resonance_is_clamped() {
        let mut f = LowPassFilter::new();
        f.set_resonance(5.0);
        assert_eq!(f.resonance(), 0.95);
        f.set_resonance(-1.0);
        assert_eq!(f.resonance(), 0.0);
    }
}
