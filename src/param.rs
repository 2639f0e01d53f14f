//! Lock-free parameter plane between control threads and the audio thread.
//!
//! Every parameter a control thread can mutate lives in an [`AtomicParam`]:
//! the writer stores a target with `Ordering::Relaxed` (no control-thread
//! blocking, ever), and the audio thread loads it once per block. Parameters
//! that would otherwise zipper when swept (volume, cutoff, base frequency,
//! delay time) are additionally smoothed audio-thread-side by a
//! [`SmoothedValue`]; the control thread never touches the smoother.

use crate::types::{Bank, PitchEnvMode, Waveform};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// A single-writer/many-reader float carrier. Stored as raw bits so the
/// load/store is a single atomic machine-word operation.
#[derive(Default)]
pub struct AtomicParam {
    bits: AtomicU32,
}

impl AtomicParam {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Same carrier for small enum/integer values, encoded as `i32`.
#[derive(Default)]
pub struct AtomicIndex {
    value: AtomicU32,
}

impl AtomicIndex {
    pub fn new(value: i32) -> Self {
        Self {
            value: AtomicU32::new(value as u32),
        }
    }

    pub fn set(&self, value: i32) {
        self.value.store(value as u32, Ordering::Relaxed);
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Relaxed) as i32
    }
}

/// A single discrete event (button press, not a continuous value) crossing
/// from a control thread to the audio thread. A [`Mutex`] serializes
/// concurrent senders against each other only; the audio thread reads the
/// sequence counter with a plain atomic load and never takes the lock, so
/// it never blocks.
#[derive(Default)]
pub struct EdgeGate {
    lock: Mutex<()>,
    seq: AtomicU64,
}

impl EdgeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called from a control thread (e.g. a button's press callback).
    pub fn fire(&self) {
        let _guard = self.lock.lock().unwrap();
        self.seq.fetch_add(1, Ordering::Relaxed);
    }

    /// Audio-thread side: compares the live sequence number against
    /// `applied` (the caller's own bookkeeping of what it last consumed).
    /// Returns `true` at most once per `fire()`, collapsing any burst of
    /// fires that arrived within one block into a single edge, exactly
    /// what an idempotent trigger/release/play request wants.
    pub fn poll(&self, applied: &mut u64) -> bool {
        let seq = self.seq.load(Ordering::Relaxed);
        if seq != *applied {
            *applied = seq;
            true
        } else {
            false
        }
    }
}

/// The two discrete gate events the audio engine reacts to. Kept separate
/// from [`Parameters`] because these are edges, not continuously-readable
/// values.
#[derive(Default)]
pub struct GateRequests {
    pub trigger: EdgeGate,
    pub release: EdgeGate,
}

impl GateRequests {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One-pole smoother. Audio-thread-only: the control thread writes a target
/// into the paired [`AtomicParam`]; the audio thread owns the running value
/// and advances it each sample.
#[derive(Clone, Copy)]
pub struct SmoothedValue {
    current: f32,
    coefficient: f32,
}

impl SmoothedValue {
    /// `coefficient` close to 1.0 glides slowly; close to 0.0 snaps almost
    /// immediately. A reasonable default for zipper-free audio-rate sweeps
    /// is derived from a ~5 ms time constant at the given sample rate.
    pub fn new(initial: f32, time_constant_secs: f32, sample_rate: f32) -> Self {
        let coefficient = (-1.0 / (time_constant_secs * sample_rate)).exp();
        Self {
            current: initial,
            coefficient,
        }
    }

    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    /// Advances toward `target` by one smoothing step and returns the new
    /// current value.
    pub fn next(&mut self, target: f32) -> f32 {
        self.current = target + (self.current - target) * self.coefficient;
        self.current
    }
}

/// Control-surface snapshot, one field per engine-visible knob. Bank A and
/// Bank B share the same five encoders but address disjoint parameter sets.
pub struct Parameters {
    // Bank A
    pub volume: AtomicParam,
    pub filter_freq: AtomicParam,
    pub filter_res: AtomicParam,
    pub delay_feedback: AtomicParam,
    pub reverb_mix: AtomicParam,
    // Bank B
    pub release: AtomicParam,
    pub delay_time: AtomicParam,
    pub reverb_size: AtomicParam,
    pub osc_waveform_idx: AtomicIndex,
    pub lfo_waveform_idx: AtomicIndex,
    // Not bank-switched: base frequency, attack, delay dry/wet, pitch
    // envelope mode. None of these has an encoder binding in the control
    // surface's table; they're reachable only through the engine's direct
    // API (the same surface the end-to-end test scenarios drive).
    pub base_frequency: AtomicParam,
    pub attack: AtomicParam,
    pub delay_mix: AtomicParam,
    pub pitch_env_mode: AtomicIndex,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            volume: AtomicParam::new(0.7),
            filter_freq: AtomicParam::new(2000.0),
            filter_res: AtomicParam::new(0.3),
            delay_feedback: AtomicParam::new(0.3),
            reverb_mix: AtomicParam::new(0.3),
            release: AtomicParam::new(0.5),
            delay_time: AtomicParam::new(0.3),
            reverb_size: AtomicParam::new(0.5),
            osc_waveform_idx: AtomicIndex::new(Waveform::Sine.index()),
            lfo_waveform_idx: AtomicIndex::new(Waveform::Sine.index()),
            base_frequency: AtomicParam::new(110.0),
            attack: AtomicParam::new(0.01),
            delay_mix: AtomicParam::new(0.35),
            pitch_env_mode: AtomicIndex::new(0),
        }
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_index(self.osc_waveform_idx.get())
    }

    pub fn lfo_waveform(&self) -> Waveform {
        Waveform::from_index(self.lfo_waveform_idx.get())
    }

    pub fn pitch_env_mode(&self) -> PitchEnvMode {
        match self.pitch_env_mode.get() {
            1 => PitchEnvMode::Up,
            2 => PitchEnvMode::Down,
            _ => PitchEnvMode::None,
        }
    }

    pub fn set_pitch_env_mode(&self, mode: PitchEnvMode) {
        self.pitch_env_mode.set(match mode {
            PitchEnvMode::None => 0,
            PitchEnvMode::Up => 1,
            PitchEnvMode::Down => 2,
        });
    }
}

/// Rotation step/range for one (bank, encoder) slot, used by the control
/// surface to turn a tick into a clamped parameter write.
#[derive(Clone, Copy)]
pub struct EncoderBinding {
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl EncoderBinding {
    pub const fn new(step: f32, min: f32, max: f32) -> Self {
        Self { step, min, max }
    }

    pub fn apply(&self, current: f32, dir: i32) -> f32 {
        (current + self.step * dir as f32).clamp(self.min, self.max)
    }
}

/// Which bank is currently addressed, derived from shift state alone.
pub fn bank_for_shift(shift_pressed: bool) -> Bank {
    if shift_pressed {
        Bank::B
    } else {
        Bank::A
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_param_roundtrips() {
        let p = AtomicParam::new(1.0);
        p.set(0.42);
        assert_eq!(p.get(), 0.42);
    }

    #[test]
    fn smoothed_value_converges() {
        let mut s = SmoothedValue::new(0.0, 0.005, 48_000.0);
        let mut last = 0.0;
        for _ in 0..10_000 {
            last = s.next(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn encoder_binding_clamps() {
        let b = EncoderBinding::new(0.1, 0.0, 1.0);
        assert_eq!(b.apply(0.95, 1), 1.0);
        assert_eq!(b.apply(0.05, -1), 0.0);
    }

    #[test]
    fn bank_follows_shift() {
        assert_eq!(bank_for_shift(true), Bank::B);
        assert_eq!(bank_for_shift(false), Bank::A);
    }

    #[test]
    fn edge_gate_collapses_a_burst_into_one_edge() {
        let gate = EdgeGate::new();
        let mut applied = 0;
        assert!(!gate.poll(&mut applied));
        gate.fire();
        gate.fire();
        gate.fire();
        assert!(gate.poll(&mut applied));
        assert!(!gate.poll(&mut applied));
    }

    #[test]
    fn gate_requests_trigger_and_release_are_independent() {
        let gates = GateRequests::new();
        let mut trig_applied = 0;
        let mut rel_applied = 0;
        gates.trigger.fire();
        assert!(gates.trigger.poll(&mut trig_applied));
        assert!(!gates.release.poll(&mut rel_applied));
    }

    #[test]
    fn pitch_env_mode_roundtrips() {
        let p = Parameters::new();
        assert_eq!(p.pitch_env_mode(), PitchEnvMode::None);
        p.set_pitch_env_mode(PitchEnvMode::Up);
        assert_eq!(p.pitch_env_mode(), PitchEnvMode::Up);
        p.set_pitch_env_mode(PitchEnvMode::Down);
        assert_eq!(p.pitch_env_mode(), PitchEnvMode::Down);
    }
}
