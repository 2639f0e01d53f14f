//! Chamber-style reverb: early reflections, two input diffusers, a bank of
//! damped/modulated comb filters, and one output diffuser.
//!
//! Topology and anti-denormal discipline are grounded on the Dattorro-style
//! buffer/allpass primitives used elsewhere in this tree; the tap layout and
//! comb count are this effect's own, chosen for a small chamber rather than
//! a hall.

use crate::dsp::{ftz, sinf, Phasor};

const EARLY_TAPS_MS: [f32; 8] = [13.0, 19.0, 26.0, 33.0, 41.0, 48.0, 53.0, 59.0];
const EARLY_LEVEL: f32 = 0.15;

const IN_DIFFUSER_MS: [f32; 2] = [5.0, 8.9];
const IN_DIFFUSER_GAIN: f32 = 0.5;

const OUT_DIFFUSER_MS: f32 = 6.7;
const OUT_DIFFUSER_GAIN: f32 = 0.5;

/// Comb delays in ms, and distinct wobble initial phases so the six combs
/// don't beat in lockstep and ring metallically.
const COMB_DELAYS_MS: [f32; 6] = [29.7, 34.3, 39.1, 44.6, 50.8, 57.1];
const COMB_WOBBLE_PHASES: [f32; 6] = [0.0, 0.17, 0.41, 0.58, 0.73, 0.92];
const COMB_WOBBLE_HZ: f32 = 0.3;
const COMB_WOBBLE_DEPTH_SAMPLES: f32 = 0.4;

fn ms_to_samples(ms: f32, sr: f32) -> usize {
    ((ms / 1000.0) * sr).max(1.0) as usize
}

struct ReverbBuffer {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl ReverbBuffer {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(2)],
            write_pos: 0,
        }
    }

    fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = ftz(value, 1e-20);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    fn read(&self, delay: usize) -> f32 {
        let delay = delay.min(self.buffer.len() - 1);
        let pos = if self.write_pos >= delay {
            self.write_pos - delay
        } else {
            self.buffer.len() - (delay - self.write_pos)
        };
        self.buffer[pos]
    }

    /// Linear-interpolated read at a fractional delay, used by the
    /// sub-sample-modulated comb bank.
    fn read_fractional(&self, delay: f32) -> f32 {
        let base = delay.floor();
        let frac = delay - base;
        let d0 = base as usize;
        let d1 = d0 + 1;
        let s0 = self.read(d0);
        let s1 = self.read(d1);
        s0 + (s1 - s0) * frac
    }

    fn allpass(&mut self, input: f32, delay: usize, coeff: f32) -> f32 {
        let delayed = self.read(delay);
        let v = input - coeff * delayed;
        self.write(v);
        delayed + coeff * v
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One damped, gently-modulated comb resonator in the parallel bank.
struct DampedComb {
    buffer: ReverbBuffer,
    base_delay_samples: f32,
    damp_state: f32,
    wobble: Phasor,
}

impl DampedComb {
    fn new(delay_ms: f32, wobble_phase: f32, sr: f32) -> Self {
        let base_delay_samples = (delay_ms / 1000.0) * sr;
        let size = base_delay_samples as usize + 8;
        Self {
            buffer: ReverbBuffer::new(size),
            base_delay_samples,
            damp_state: 0.0,
            wobble: Phasor {
                phase: wobble_phase,
            },
        }
    }

    fn process(&mut self, input: f32, feedback: f32, damp_coeff: f32, sr: f32) -> f32 {
        self.wobble.advance(COMB_WOBBLE_HZ, 1.0 / sr);
        let wobble = sinf(self.wobble.phase * 2.0 * std::f32::consts::PI) * COMB_WOBBLE_DEPTH_SAMPLES;
        let delay = (self.base_delay_samples + wobble).max(1.0);

        let delayed = self.buffer.read_fractional(delay);
        self.damp_state = ftz(delayed * (1.0 - damp_coeff) + self.damp_state * damp_coeff, 1e-20);
        self.buffer.write(input + self.damp_state * feedback);
        delayed
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.damp_state = 0.0;
    }
}

/// Chamber reverb: early reflections + 2 input diffusers + 6 damped combs +
/// 1 output diffuser, mono in and out (the engine spreads to stereo later).
pub struct ReverbEffect {
    sample_rate: f32,
    early_taps: [usize; 8],
    early_line: ReverbBuffer,
    in_diff: [ReverbBuffer; 2],
    in_diff_delays: [usize; 2],
    combs: [DampedComb; 6],
    out_diff: ReverbBuffer,
    out_diff_delay: usize,
    size: f32,
    damping: f32,
    dry_wet: f32,
}

impl ReverbEffect {
    pub fn new(sample_rate: f32) -> Self {
        let early_taps = EARLY_TAPS_MS.map(|ms| ms_to_samples(ms, sample_rate));
        let max_early = *early_taps.iter().max().unwrap();

        let in_diff_delays = IN_DIFFUSER_MS.map(|ms| ms_to_samples(ms, sample_rate));
        let in_diff = in_diff_delays.map(|d| ReverbBuffer::new(d + 1));

        let combs = std::array::from_fn(|i| {
            DampedComb::new(COMB_DELAYS_MS[i], COMB_WOBBLE_PHASES[i], sample_rate)
        });

        let out_diff_delay = ms_to_samples(OUT_DIFFUSER_MS, sample_rate);

        Self {
            sample_rate,
            early_taps,
            early_line: ReverbBuffer::new(max_early + 1),
            in_diff,
            in_diff_delays,
            combs,
            out_diff: ReverbBuffer::new(out_diff_delay + 1),
            out_diff_delay,
            size: 0.5,
            damping: 0.5,
            dry_wet: 0.3,
        }
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(0.0, 1.0);
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = damping.clamp(0.0, 1.0);
    }

    pub fn set_dry_wet(&mut self, mix: f32) {
        self.dry_wet = mix.clamp(0.0, 1.0);
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn dry_wet(&self) -> f32 {
        self.dry_wet
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let input = ftz(input, 1e-20);

        self.early_line.write(input);
        let mut early = 0.0;
        for &tap in &self.early_taps {
            early += self.early_line.read(tap);
        }
        early *= EARLY_LEVEL;

        let mut x = input;
        for i in 0..2 {
            x = self.in_diff[i].allpass(x, self.in_diff_delays[i], IN_DIFFUSER_GAIN);
        }

        let feedback = (0.4 + self.size * 0.45).min(0.98);
        let damp_coeff = 1.0 - self.damping * 0.5;

        let mut comb_out = 0.0;
        for comb in &mut self.combs {
            comb_out += comb.process(x, feedback, damp_coeff, self.sample_rate);
        }
        comb_out /= self.combs.len() as f32;

        let out_ap = self.out_diff.allpass(comb_out, self.out_diff_delay, OUT_DIFFUSER_GAIN);

        let wet = early + out_ap;
        (input * (1.0 - self.dry_wet) + wet * self.dry_wet).clamp(-1.0, 1.0)
    }

    pub fn clear(&mut self) {
        self.early_line.clear();
        for d in &mut self.in_diff {
            d.clear();
        }
        for comb in &mut self.combs {
            comb.clear();
        }
        self.out_diff.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_decays_to_silence_over_ten_seconds() {
        let sr = 48_000.0;
        let mut r = ReverbEffect::new(sr);
        r.set_size(0.9);
        r.set_damping(0.3);
        r.set_dry_wet(1.0);

        r.process(1.0);
        let mut last = 1.0f32;
        for _ in 0..(10 * sr as usize) {
            last = r.process(0.0);
            assert!(last.is_finite());
            assert!(last.abs() <= 1.0 + 1e-6);
        }
        assert!(last.abs() < 1e-3, "expected decay to silence, got {last}");
    }

    #[test]
    fn dry_wet_zero_passes_dry_signal() {
        let mut r = ReverbEffect::new(48_000.0);
        r.set_dry_wet(0.0);
        for i in 0..50 {
            let x = (i as f32 * 0.05).sin() * 0.5;
            let y = r.process(x);
            assert!((y - x).abs() < 1e-6);
        }
    }

    #[test]
    fn feedback_stays_below_unity_at_max_size() {
        let mut r = ReverbEffect::new(48_000.0);
        r.set_size(1.0);
        let feedback = (0.4 + r.size() * 0.45).min(0.98);
        assert!(feedback < 0.98 + 1e-6);
        assert!(feedback < 1.0);
    }
}
