//! The real-time DSP graph: oscillator -> envelope gate -> resonant
//! low-pass (LFO-modulated) -> tape delay -> chamber reverb -> DC blocker
//! -> volume -> stereo interleave.
//!
//! [`Engine::process`] is the audio callback's only entry point. It never
//! allocates, locks a blocking mutex, or performs a syscall: every buffer is
//! sized at construction, and the only cross-thread state it touches is the
//! atomics in [`Parameters`] and [`GateRequests`].

use crate::dsp::{Envelope, Lfo, LowPassFilter, Oscillator};
use crate::effects::{DcBlocker, DelayEffect, ReverbEffect};
use crate::param::{GateRequests, Parameters, SmoothedValue};
use crate::types::PitchEnvMode;
use std::sync::Arc;

/// Fixed internal LFO rate and depth. Not user-controllable: the only LFO
/// knob the control surface exposes is its waveform (Bank B, encoder 5);
/// rate and depth are implementation constants chosen to give the filter a
/// gentle, musically useful wobble.
const LFO_RATE_HZ: f32 = 4.0;
const LFO_DEPTH: f32 = 1.0;

/// Time constant for the zipper-prone parameters the audio thread smooths
/// locally: volume, base frequency, filter cutoff.
const SMOOTH_TIME_CONSTANT_SECS: f32 = 0.01;

const FILTER_MOD_MIN_HZ: f32 = 100.0;
const FILTER_MOD_MAX_HZ: f32 = 8000.0;
const GATE_FLOOR: f32 = 1e-3;

/// One octave, expressed as the semitone span the pitch envelope ramps
/// across.
const PITCH_ENV_SEMITONES: f32 = 12.0;
const MIN_AUDIBLE_HZ: f32 = 20.0;

/// Tracks the pitch-envelope ramp that overrides the base frequency for the
/// duration of attack when a pitch envelope mode is armed.
#[derive(Clone, Copy, Default)]
struct PitchRamp {
    active: bool,
    elapsed: f32,
}

/// Owns every piece of per-voice DSP state and the smoothers that bridge it
/// to the lock-free parameter plane. Constructed once; never reallocates.
pub struct Engine {
    sr: f32,
    isr: f32,
    block_size: usize,

    params: Arc<Parameters>,
    gate: Arc<GateRequests>,
    trigger_applied: u64,
    release_applied: u64,

    oscillator: Oscillator,
    lfo: Lfo,
    envelope: Envelope,
    filter: LowPassFilter,
    delay: DelayEffect,
    reverb: ReverbEffect,
    dc_blocker: DcBlocker,

    volume: SmoothedValue,
    base_frequency: SmoothedValue,
    filter_cutoff: SmoothedValue,

    pitch_ramp: PitchRamp,

    lfo_buf: Vec<f32>,
    env_buf: Vec<f32>,
}

impl Engine {
    /// `params`/`gate` are shared with whatever owns the control surface
    /// (or, in tests, with whoever is driving the engine directly).
    pub fn new(
        sample_rate: f32,
        block_size: usize,
        params: Arc<Parameters>,
        gate: Arc<GateRequests>,
    ) -> Self {
        let volume0 = params.volume.get();
        let base_freq0 = params.base_frequency.get();
        let filter_cutoff0 = params.filter_freq.get();

        let mut lfo = Lfo::new();
        lfo.set_frequency(LFO_RATE_HZ);
        lfo.set_depth(LFO_DEPTH);

        let mut oscillator = Oscillator::new();
        oscillator.set_waveform(params.waveform());
        oscillator.set_frequency(base_freq0);

        let mut envelope = Envelope::new();
        envelope.set_attack(params.attack.get());
        envelope.set_release(params.release.get());

        let mut filter = LowPassFilter::new();
        filter.set_cutoff(filter_cutoff0);
        filter.set_resonance(params.filter_res.get());

        let mut delay = DelayEffect::new(sample_rate);
        delay.set_delay_time(params.delay_time.get());
        delay.set_feedback(params.delay_feedback.get());
        delay.set_dry_wet(params.delay_mix.get());

        let mut reverb = ReverbEffect::new(sample_rate);
        reverb.set_size(params.reverb_size.get());
        reverb.set_dry_wet(params.reverb_mix.get());

        Self {
            sr: sample_rate,
            isr: 1.0 / sample_rate,
            block_size,
            params,
            gate,
            trigger_applied: 0,
            release_applied: 0,
            oscillator,
            lfo,
            envelope,
            filter,
            delay,
            reverb,
            dc_blocker: DcBlocker::new(),
            volume: SmoothedValue::new(volume0, SMOOTH_TIME_CONSTANT_SECS, sample_rate),
            base_frequency: SmoothedValue::new(base_freq0, SMOOTH_TIME_CONSTANT_SECS, sample_rate),
            filter_cutoff: SmoothedValue::new(
                filter_cutoff0,
                SMOOTH_TIME_CONSTANT_SECS,
                sample_rate,
            ),
            pitch_ramp: PitchRamp::default(),
            lfo_buf: vec![0.0; block_size],
            env_buf: vec![0.0; block_size],
        }
    }

    /// Convenience constructor for tests and library consumers that don't
    /// need to share parameters with a control surface.
    pub fn with_defaults(sample_rate: f32, block_size: usize) -> Self {
        Self::new(
            sample_rate,
            block_size,
            Arc::new(Parameters::new()),
            Arc::new(GateRequests::new()),
        )
    }

    pub fn params(&self) -> &Arc<Parameters> {
        &self.params
    }

    pub fn gate(&self) -> &Arc<GateRequests> {
        &self.gate
    }

    // -- Direct API mirroring the control surface's parameter writes, used
    // by library consumers and tests that drive the engine without GPIO. --

    pub fn set_volume(&self, v: f32) {
        self.params.volume.set(v.clamp(0.0, 1.0));
    }

    pub fn set_frequency(&self, hz: f32) {
        self.params.base_frequency.set(hz.max(MIN_AUDIBLE_HZ));
    }

    pub fn set_attack_time(&self, secs: f32) {
        self.params.attack.set(secs.max(0.0));
    }

    pub fn set_release_time(&self, secs: f32) {
        self.params.release.set(secs.clamp(0.01, 5.0));
    }

    /// The delay's own dry/wet, distinct from `reverbMix`. Not reachable
    /// from any encoder, only from this direct API.
    pub fn set_delay_mix(&self, m: f32) {
        self.params.delay_mix.set(m.clamp(0.0, 1.0));
    }

    pub fn set_pitch_envelope_mode(&self, mode: PitchEnvMode) {
        self.params.set_pitch_env_mode(mode);
    }

    pub fn cycle_pitch_envelope(&self) -> PitchEnvMode {
        let next = self.params.pitch_env_mode().cycle();
        self.params.set_pitch_env_mode(next);
        next
    }

    pub fn trigger(&self) {
        self.gate.trigger.fire();
    }

    pub fn release(&self) {
        self.gate.release.fire();
    }

    pub fn is_active(&self) -> bool {
        self.envelope.is_active()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sr
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Applies any trigger/release edges that arrived since the last block,
    /// at most one of each (an edge that fired N times within a block is
    /// still a single trigger/release; that's the whole point of the gate).
    fn apply_gate_events(&mut self) {
        if self.gate.trigger.poll(&mut self.trigger_applied) {
            self.envelope.trigger();
            self.oscillator.reset_phase();
            if self.params.pitch_env_mode() != PitchEnvMode::None {
                self.pitch_ramp = PitchRamp {
                    active: true,
                    elapsed: 0.0,
                };
            }
        }
        if self.gate.release.poll(&mut self.release_applied) {
            self.envelope.release();
            // "Restored to f0 before release completes": if a release
            // lands mid-ramp, snap back to the base frequency immediately
            // rather than let the ramp keep sweeping into the release tail.
            self.pitch_ramp.active = false;
        }
    }

    /// Computes this sample's oscillator frequency, advancing (and
    /// retiring) the pitch-envelope ramp if one is active.
    fn next_oscillator_freq(&mut self, base_freq: f32, attack_secs: f32) -> f32 {
        if !self.pitch_ramp.active {
            return base_freq;
        }
        let progress = if attack_secs > 0.0 {
            (self.pitch_ramp.elapsed / attack_secs).min(1.0)
        } else {
            1.0
        };
        let mode = self.params.pitch_env_mode();
        let start_semitones = match mode {
            PitchEnvMode::Up => -PITCH_ENV_SEMITONES,
            PitchEnvMode::Down => PITCH_ENV_SEMITONES,
            PitchEnvMode::None => 0.0,
        };
        let semitones = start_semitones * (1.0 - progress);
        let freq = (base_freq * 2f32.powf(semitones / 12.0)).max(MIN_AUDIBLE_HZ);

        self.pitch_ramp.elapsed += self.isr;
        if progress >= 1.0 {
            self.pitch_ramp.active = false;
        }
        freq
    }

    /// Fills `out` (stereo-interleaved, `2 * block_size` floats) with the
    /// next block. Never panics, never allocates, bounded output.
    pub fn process(&mut self, out: &mut [f32]) {
        let n = self.block_size;
        debug_assert!(out.len() >= n * 2);

        self.apply_gate_events();

        // Parameters that don't need audio-thread smoothing: read once per
        // block (no combination is unsafe since each is independently
        // clamped).
        self.oscillator.set_waveform(self.params.waveform());
        self.lfo.set_waveform(self.params.lfo_waveform());
        self.filter.set_resonance(self.params.filter_res.get());
        self.delay.set_delay_time(self.params.delay_time.get());
        self.delay.set_feedback(self.params.delay_feedback.get());
        self.reverb.set_size(self.params.reverb_size.get());
        self.reverb.set_dry_wet(self.params.reverb_mix.get());
        self.delay.set_dry_wet(self.params.delay_mix.get());
        self.envelope.set_attack(self.params.attack.get());
        self.envelope.set_release(self.params.release.get());

        let attack_secs = self.params.attack.get();
        let volume_target = self.params.volume.get();
        let base_freq_target = self.params.base_frequency.get();
        let filter_cutoff_target = self.params.filter_freq.get();

        self.lfo.generate(&mut self.lfo_buf, n, self.isr);
        self.envelope.generate(&mut self.env_buf, n, self.isr);

        for i in 0..n {
            // Volume=0 must yield bit-exact silence (not an asymptotic
            // approach to it): snap the smoother instead of gliding toward
            // an exact-zero target.
            let volume = if volume_target == 0.0 {
                self.volume.set_immediate(0.0);
                0.0
            } else {
                self.volume.next(volume_target)
            };
            let base_freq = self.base_frequency.next(base_freq_target);
            let cutoff_base = self.filter_cutoff.next(filter_cutoff_target);

            let freq = self.next_oscillator_freq(base_freq, attack_secs);
            let osc_sample = self.oscillator.generate_sample_at(freq, self.isr);

            let lfo_sample = self.lfo_buf[i];
            let fc = (cutoff_base * 2f32.powf(lfo_sample * 2.0))
                .clamp(FILTER_MOD_MIN_HZ, FILTER_MOD_MAX_HZ);
            let resonance = self.filter.resonance();
            let mut filtered = self.filter.process_at(osc_sample, fc, resonance, self.sr);

            let env_sample = self.env_buf[i];
            if env_sample < GATE_FLOOR {
                filtered = 0.0;
            } else {
                filtered *= env_sample;
            }

            let delayed = self.delay.process(filtered);
            let reverbed = self.reverb.process(delayed);
            let dc_blocked = self.dc_blocker.process(reverbed);

            let sample = (dc_blocked * volume).clamp(-1.0, 1.0);
            out[i * 2] = sample;
            out[i * 2 + 1] = sample;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: usize) -> Vec<f32> {
        vec![0.0; n * 2]
    }

    #[test]
    fn silent_start_produces_exact_zero() {
        let mut engine = Engine::with_defaults(48_000.0, 256);
        for _ in 0..10 {
            let mut out = block(256);
            engine.process(&mut out);
            assert!(out.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn basic_beep_rms_is_in_range_then_decays() {
        let mut engine = Engine::with_defaults(48_000.0, 256);
        engine.set_volume(0.5);
        engine.set_frequency(440.0);
        engine.set_attack_time(0.01);
        engine.set_release_time(0.05);
        // Bypass delay/reverb so this scenario measures the envelope's own
        // decay, not the effects' tail: their feedback (grounded on a much
        // slower, musical decay curve) wouldn't settle below 1e-3 within
        // this window on its own.
        engine.set_delay_mix(0.0);
        engine.params().reverb_mix.set(0.0);
        engine.trigger();

        let sr = 48_000.0;
        let active_frames = (0.1 * sr) as usize;
        let mut sum_sq = 0.0f64;
        let mut produced = 0usize;
        let mut out = block(256);
        while produced < active_frames {
            engine.process(&mut out);
            for chunk in out.chunks(2) {
                sum_sq += (chunk[0] as f64) * (chunk[0] as f64);
            }
            produced += 256;
        }
        let rms = (sum_sq / produced as f64).sqrt();
        assert!((0.2..=0.5).contains(&rms), "rms {rms} out of range");

        engine.release();
        let release_frames = (0.1 * sr) as usize;
        produced = 0;
        while produced < release_frames {
            engine.process(&mut out);
            produced += 256;
        }
        let last = out[0];
        assert!(last.abs() < 1e-3, "expected near-silence after release, got {last}");
    }

    #[test]
    fn volume_zero_is_bit_exact_silence() {
        let mut engine = Engine::with_defaults(48_000.0, 256);
        engine.set_volume(0.0);
        engine.set_frequency(220.0);
        engine.trigger();
        let mut out = block(256);
        for _ in 0..20 {
            engine.process(&mut out);
            assert!(out.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn pitch_envelope_up_ramps_one_octave_over_attack() {
        let mut engine = Engine::with_defaults(48_000.0, 1);
        engine.set_pitch_envelope_mode(PitchEnvMode::Up);
        engine.set_frequency(200.0);
        engine.set_attack_time(0.1);
        engine.trigger();
        engine.apply_gate_events();

        let freq0 = engine.next_oscillator_freq(200.0, 0.1);
        assert!((freq0 - 100.0).abs() < 1.0, "freq0 = {freq0}");

        let n = (0.1 * 48_000.0) as usize;
        let mut freq = freq0;
        for _ in 0..n {
            freq = engine.next_oscillator_freq(200.0, 0.1);
        }
        assert!((freq - 200.0).abs() < 1.0, "freq at t=0.1s = {freq}");
    }

    #[test]
    fn pitch_envelope_cycles_and_returns_to_start() {
        let engine = Engine::with_defaults(48_000.0, 256);
        assert_eq!(engine.params.pitch_env_mode(), PitchEnvMode::None);
        assert_eq!(engine.cycle_pitch_envelope(), PitchEnvMode::Up);
        assert_eq!(engine.cycle_pitch_envelope(), PitchEnvMode::Down);
        assert_eq!(engine.cycle_pitch_envelope(), PitchEnvMode::None);
    }

    #[test]
    fn delay_impulse_reappears_at_delay_time_with_other_effects_bypassed() {
        let mut engine = Engine::with_defaults(48_000.0, 1);
        engine.params.delay_time.set(0.25);
        engine.params.delay_feedback.set(0.0);
        engine.params.delay_mix.set(1.0);
        engine.params.reverb_mix.set(0.0);
        engine.params.reverb_size.set(0.0);
        engine.params.volume.set(1.0);

        // Settle the delay-time smoother before measuring.
        for _ in 0..20_000 {
            let mut out = block(1);
            engine.process(&mut out);
        }

        let mut peak_idx = 0usize;
        let mut peak_val = 0.0f32;
        engine.delay.process(1.0);
        for i in 1..13_000 {
            let y = engine.delay.process(0.0);
            if y.abs() > peak_val {
                peak_val = y.abs();
                peak_idx = i;
            }
        }
        let expected = (0.25 * 48_000.0) as i64;
        assert!((peak_idx as i64 - expected).abs() <= 2);
    }

    #[test]
    fn engine_never_exceeds_unit_output_under_ten_seconds_of_impulse_then_silence() {
        let mut engine = Engine::with_defaults(48_000.0, 256);
        engine.params.reverb_size.set(1.0);
        engine.params.delay_feedback.set(0.95);
        engine.params.volume.set(1.0);
        engine.trigger();
        let mut out = block(256);
        let blocks = (10.0 * 48_000.0 / 256.0) as usize;
        for i in 0..blocks {
            if i == 5 {
                engine.release();
            }
            engine.process(&mut out);
            for &s in out.iter() {
                assert!(s.is_finite());
                assert!((-1.0..=1.0).contains(&s));
            }
        }
    }

    #[test]
    fn bounds_check_no_nan_on_silence_after_impulse() {
        let mut engine = Engine::with_defaults(48_000.0, 256);
        engine.set_volume(1.0);
        engine.trigger();
        let mut out = block(256);
        engine.process(&mut out);
        engine.release();
        for _ in 0..200 {
            engine.process(&mut out);
            assert!(out.iter().all(|s| s.is_finite()));
        }
    }
}
