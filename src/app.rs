//! Ties the audio engine and the secret-mode sample player into the single
//! block-producing source the sink driver pulls from, and wires the control
//! surface's callbacks to both.
//!
//! When secret mode is off, trigger/release drive the synth engine; when
//! it's on, trigger plays the loaded sample instead and release is a
//! no-op (the sample runs to completion or loops on its own).

use crate::engine::Engine;
use crate::param::EdgeGate;
use crate::sample::SamplePlayer;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The block source a [`crate::audio::SinkDriver`] pulls from: either the
/// synth engine or the sample player, selected by `secret_mode`.
pub struct Synth {
    engine: Engine,
    sample_player: Mutex<SamplePlayer>,
    sample_play: Arc<EdgeGate>,
    sample_play_applied: u64,
    secret_mode: Arc<AtomicBool>,
    block_size: usize,
}

impl Synth {
    pub fn new(engine: Engine, sample_play: Arc<EdgeGate>, secret_mode: Arc<AtomicBool>) -> Self {
        let block_size = engine.block_size();
        Self {
            engine,
            sample_player: Mutex::new(SamplePlayer::new()),
            sample_play,
            sample_play_applied: 0,
            secret_mode,
            block_size,
        }
    }

    /// Loads the secret-mode sample. Absence of the file (or a decode
    /// failure) is non-fatal: secret mode stays reachable, it just produces
    /// silence until a sample loads successfully.
    pub fn load_sample(&self, path: &Path) {
        let sr = self.engine.sample_rate();
        match self.sample_player.lock().unwrap().load(path, sr) {
            Ok(()) => println!("[Sample] loaded {}", path.display()),
            Err(e) => eprintln!("[Sample] could not load {}: {e} (secret mode will be silent)", path.display()),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn secret_mode_flag(&self) -> &Arc<AtomicBool> {
        &self.secret_mode
    }

    pub fn sample_play_gate(&self) -> &Arc<EdgeGate> {
        &self.sample_play
    }

    /// The block callback handed to the sink driver.
    pub fn process(&mut self, out: &mut [f32]) {
        if self.secret_mode.load(Ordering::Relaxed) {
            if self.sample_play.poll(&mut self.sample_play_applied) {
                self.sample_player.lock().unwrap().play();
            }
            self.sample_player
                .lock()
                .unwrap()
                .process(out, self.block_size);
        } else {
            self.engine.process(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{GateRequests, Parameters};

    fn synth() -> Synth {
        let engine = Engine::new(
            48_000.0,
            256,
            Arc::new(Parameters::new()),
            Arc::new(GateRequests::new()),
        );
        Synth::new(engine, Arc::new(EdgeGate::new()), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn defaults_to_engine_output() {
        let mut synth = synth();
        synth.engine().set_volume(1.0);
        synth.engine().set_frequency(440.0);
        synth.engine().trigger();
        let mut out = vec![0.0; 512];
        synth.process(&mut out);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn secret_mode_silent_without_a_loaded_sample() {
        let mut synth = synth();
        synth.secret_mode_flag().store(true, Ordering::Relaxed);
        synth.sample_play_gate().fire();
        let mut out = vec![1.0; 512];
        synth.process(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn toggling_secret_mode_off_falls_back_to_engine() {
        let mut synth = synth();
        synth.secret_mode_flag().store(true, Ordering::Relaxed);
        synth.secret_mode_flag().store(false, Ordering::Relaxed);
        synth.engine().set_volume(1.0);
        synth.engine().trigger();
        let mut out = vec![0.0; 512];
        synth.process(&mut out);
        assert!(out.iter().any(|&s| s != 0.0));
    }
}
