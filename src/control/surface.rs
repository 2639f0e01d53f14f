//! Control surface: binds the physical encoders and switches to parameter
//! writes, bank switching, trigger/release, pitch envelope cycling, and
//! shutdown.
//!
//! Pin numbering (BCM) deliberately avoids GPIO18/19/21, which the I2S DAC
//! overlay claims.

use super::encoder::RotaryEncoder;
use super::gpio::Gpio;
use super::switch::MomentarySwitch;
use crate::param::{bank_for_shift, EncoderBinding, Parameters};
use crate::types::Bank;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const ENC1_CLK: u8 = 17;
const ENC1_DT: u8 = 2;
const ENC2_CLK: u8 = 27;
const ENC2_DT: u8 = 22;
const ENC3_CLK: u8 = 23;
const ENC3_DT: u8 = 24;
const ENC4_CLK: u8 = 20;
const ENC4_DT: u8 = 26;
const ENC5_CLK: u8 = 14;
const ENC5_DT: u8 = 13;

const TRIGGER_PIN: u8 = 4;
const PITCH_ENV_PIN: u8 = 10;
const SHIFT_PIN: u8 = 15;
const SHUTDOWN_PIN: u8 = 3;

const VOLUME: EncoderBinding = EncoderBinding::new(0.02, 0.0, 1.0);
const RELEASE: EncoderBinding = EncoderBinding::new(0.1, 0.01, 5.0);
const FILTER_FREQ: EncoderBinding = EncoderBinding::new(50.0, 20.0, 20_000.0);
const DELAY_TIME: EncoderBinding = EncoderBinding::new(0.05, 0.001, 2.0);
const FILTER_RES: EncoderBinding = EncoderBinding::new(0.02, 0.0, 0.95);
const REVERB_SIZE: EncoderBinding = EncoderBinding::new(0.02, 0.0, 1.0);
const DELAY_FEEDBACK: EncoderBinding = EncoderBinding::new(0.02, 0.0, 0.95);
const REVERB_MIX: EncoderBinding = EncoderBinding::new(0.02, 0.0, 1.0);

/// Secret-mode gesture: three trigger presses inside this window while
/// shift is held. Ordinary playing in Bank B never does this by accident,
/// but it costs nothing beyond a few extra envelope triggers if it does.
const GESTURE_COUNT: u32 = 3;
const GESTURE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Default)]
struct GestureState {
    count: u32,
    first_press: Option<Instant>,
}

/// Owns every encoder's and switch's polling thread. Dropping it stops and
/// joins them all, releasing the underlying GPIO pins.
pub struct ControlSurface {
    _encoders: Vec<RotaryEncoder>,
    _switches: Vec<MomentarySwitch>,
}

impl ControlSurface {
    /// `on_shutdown` is called from the shutdown switch's polling thread;
    /// it should only signal the main thread (e.g. over a channel), since
    /// the GPIO pins it holds must be released by dropping this
    /// `ControlSurface` before the process actually tears down.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gpio: &dyn Gpio,
        params: Arc<Parameters>,
        on_trigger: impl Fn() + Send + 'static,
        on_release: impl Fn() + Send + 'static,
        on_pitch_env_cycle: impl Fn() + Send + 'static,
        on_shutdown: impl Fn() + Send + 'static,
        on_secret_mode_toggle: impl Fn() + Send + 'static,
    ) -> Self {
        let shift = Arc::new(AtomicBool::new(false));
        let mut encoders = Vec::with_capacity(5);

        encoders.push(Self::bind_value_encoder(
            gpio,
            ENC1_CLK,
            ENC1_DT,
            Arc::clone(&shift),
            Arc::clone(&params),
            "volume",
            VOLUME,
            |p| &p.volume,
            "release",
            RELEASE,
            |p| &p.release,
        ));
        encoders.push(Self::bind_value_encoder(
            gpio,
            ENC2_CLK,
            ENC2_DT,
            Arc::clone(&shift),
            Arc::clone(&params),
            "filterFreq",
            FILTER_FREQ,
            |p| &p.filter_freq,
            "delayTime",
            DELAY_TIME,
            |p| &p.delay_time,
        ));
        encoders.push(Self::bind_value_encoder(
            gpio,
            ENC3_CLK,
            ENC3_DT,
            Arc::clone(&shift),
            Arc::clone(&params),
            "filterRes",
            FILTER_RES,
            |p| &p.filter_res,
            "reverbSize",
            REVERB_SIZE,
            |p| &p.reverb_size,
        ));
        encoders.push(Self::bind_enc4(gpio, Arc::clone(&shift), Arc::clone(&params)));
        encoders.push(Self::bind_enc5(gpio, Arc::clone(&shift), Arc::clone(&params)));

        let mut switches = Vec::with_capacity(4);

        let gesture = Arc::new(Mutex::new(GestureState::default()));
        let gesture_cb = Arc::clone(&gesture);
        let shift_for_trigger = Arc::clone(&shift);
        switches.push(MomentarySwitch::new(
            gpio,
            TRIGGER_PIN,
            move || {
                on_trigger();
                if shift_for_trigger.load(Ordering::Relaxed) {
                    let mut g = gesture_cb.lock().unwrap();
                    let now = Instant::now();
                    let expired = g
                        .first_press
                        .map(|t| now.duration_since(t) > GESTURE_WINDOW)
                        .unwrap_or(true);
                    if expired {
                        g.count = 0;
                        g.first_press = Some(now);
                    }
                    g.count += 1;
                    if g.count >= GESTURE_COUNT {
                        g.count = 0;
                        g.first_press = None;
                        on_secret_mode_toggle();
                    }
                }
            },
            on_release,
        ));

        switches.push(MomentarySwitch::new(
            gpio,
            PITCH_ENV_PIN,
            move || {
                on_pitch_env_cycle();
            },
            || {},
        ));

        let shift_press = Arc::clone(&shift);
        let shift_release = Arc::clone(&shift);
        switches.push(MomentarySwitch::new(
            gpio,
            SHIFT_PIN,
            move || {
                shift_press.store(true, Ordering::Relaxed);
                println!("[Control] bank: B");
            },
            move || {
                shift_release.store(false, Ordering::Relaxed);
                println!("[Control] bank: A");
            },
        ));

        switches.push(MomentarySwitch::new(
            gpio,
            SHUTDOWN_PIN,
            move || {
                on_shutdown();
            },
            || {},
        ));

        Self {
            _encoders: encoders,
            _switches: switches,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn bind_value_encoder(
        gpio: &dyn Gpio,
        clk: u8,
        dt: u8,
        shift: Arc<AtomicBool>,
        params: Arc<Parameters>,
        name_a: &'static str,
        binding_a: EncoderBinding,
        field_a: fn(&Parameters) -> &crate::param::AtomicParam,
        name_b: &'static str,
        binding_b: EncoderBinding,
        field_b: fn(&Parameters) -> &crate::param::AtomicParam,
    ) -> RotaryEncoder {
        RotaryEncoder::new(gpio, clk, dt, move |dir| {
            let bank = bank_for_shift(shift.load(Ordering::Relaxed));
            let (name, binding, field) = match bank {
                Bank::A => (name_a, binding_a, field_a),
                Bank::B => (name_b, binding_b, field_b),
            };
            let carrier = field(&params);
            let next = binding.apply(carrier.get(), dir);
            carrier.set(next);
            println!("[Bank {bank:?}] {name}: {next:.4}");
        })
    }

    fn bind_enc4(gpio: &dyn Gpio, shift: Arc<AtomicBool>, params: Arc<Parameters>) -> RotaryEncoder {
        RotaryEncoder::new(gpio, ENC4_CLK, ENC4_DT, move |dir| {
            match bank_for_shift(shift.load(Ordering::Relaxed)) {
                Bank::A => {
                    let next = DELAY_FEEDBACK.apply(params.delay_feedback.get(), dir);
                    params.delay_feedback.set(next);
                    println!("[Bank A] delayFeedback: {next:.4}");
                }
                Bank::B => {
                    let next = if dir >= 0 {
                        params.waveform().next()
                    } else {
                        params.waveform().prev()
                    };
                    params.osc_waveform_idx.set(next.index());
                    println!("[Bank B] oscWaveform: {next:?}");
                }
            }
        })
    }

    fn bind_enc5(gpio: &dyn Gpio, shift: Arc<AtomicBool>, params: Arc<Parameters>) -> RotaryEncoder {
        RotaryEncoder::new(gpio, ENC5_CLK, ENC5_DT, move |dir| {
            match bank_for_shift(shift.load(Ordering::Relaxed)) {
                Bank::A => {
                    let next = REVERB_MIX.apply(params.reverb_mix.get(), dir);
                    params.reverb_mix.set(next);
                    println!("[Bank A] reverbMix: {next:.4}");
                }
                Bank::B => {
                    let next = if dir >= 0 {
                        params.lfo_waveform().next()
                    } else {
                        params.lfo_waveform().prev()
                    };
                    params.lfo_waveform_idx.set(next.index());
                    println!("[Bank B] lfoWaveform: {next:?}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::gpio::{Level, SimulatedGpio};
    use crate::param::Parameters;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn trigger_tap_invokes_press_and_release() {
        let gpio = SimulatedGpio::new();
        let params = Arc::new(Parameters::new());
        let presses = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let (p, r) = (Arc::clone(&presses), Arc::clone(&releases));

        let surface = ControlSurface::new(
            &gpio,
            params,
            move || {
                p.fetch_add(1, Ordering::Relaxed);
            },
            move || {
                r.fetch_add(1, Ordering::Relaxed);
            },
            || {},
            || {},
            || {},
        );

        let trigger = gpio.handle_for(TRIGGER_PIN);
        trigger.set(Level::Low);
        thread::sleep(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(40));
        trigger.set(Level::High);
        thread::sleep(Duration::from_millis(20));

        drop(surface);
        assert_eq!(presses.load(Ordering::Relaxed), 1);
        assert_eq!(releases.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn shift_switches_bank_for_an_encoder_tick() {
        let gpio = SimulatedGpio::new();
        let params = Arc::new(Parameters::new());
        let starting_release = params.release.get();

        let surface = ControlSurface::new(
            &gpio,
            Arc::clone(&params),
            || {},
            || {},
            || {},
            || {},
            || {},
        );

        let shift = gpio.handle_for(SHIFT_PIN);
        shift.set(Level::Low);
        thread::sleep(Duration::from_millis(20));

        let clk = gpio.handle_for(ENC1_CLK);
        let dt = gpio.handle_for(ENC1_DT);
        dt.set(Level::High);
        clk.set(Level::Low);
        thread::sleep(Duration::from_millis(20));

        drop(surface);
        assert_ne!(params.release.get(), starting_release);
    }

    #[test]
    fn secret_gesture_fires_after_three_shifted_triggers() {
        let gpio = SimulatedGpio::new();
        let params = Arc::new(Parameters::new());
        let toggled = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&toggled);

        let surface = ControlSurface::new(
            &gpio,
            params,
            || {},
            || {},
            || {},
            || {},
            move || {
                t.fetch_add(1, Ordering::Relaxed);
            },
        );

        let shift = gpio.handle_for(SHIFT_PIN);
        shift.set(Level::Low);
        thread::sleep(Duration::from_millis(15));

        let trigger = gpio.handle_for(TRIGGER_PIN);
        for _ in 0..3 {
            trigger.set(Level::Low);
            thread::sleep(Duration::from_millis(15));
            trigger.set(Level::High);
            thread::sleep(Duration::from_millis(45));
        }

        drop(surface);
        assert_eq!(toggled.load(Ordering::Relaxed), 1);
    }
}
