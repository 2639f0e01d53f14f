//! GPIO abstraction over the BCM pin numbering the control surface is wired
//! to. A trait rather than a direct `rppal` dependency throughout the
//! module so tests (and non-Linux development builds) can run against a
//! simulated chip.

use crate::error::DubSirenError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    High,
    Low,
}

/// Read access to a single input pin, configured with an internal pull-up
/// (every switch and encoder contact on this board idles HIGH).
pub trait InputPin: Send {
    fn read(&self) -> Level;
}

/// Opens input pins by BCM number. `GpioUnavailable` is non-fatal at the
/// call site: the control surface disables itself and the engine runs with
/// its defaults.
pub trait Gpio: Send {
    fn input_pull_up(&self, bcm_pin: u8) -> Result<Box<dyn InputPin>, DubSirenError>;
}

/// Real hardware, backed by `rppal`.
#[cfg(target_os = "linux")]
pub struct RppalGpio {
    chip: rppal::gpio::Gpio,
}

#[cfg(target_os = "linux")]
impl RppalGpio {
    pub fn open() -> Result<Self, DubSirenError> {
        let chip =
            rppal::gpio::Gpio::new().map_err(|e| DubSirenError::GpioUnavailable(e.to_string()))?;
        Ok(Self { chip })
    }
}

#[cfg(target_os = "linux")]
struct RppalInputPin {
    pin: rppal::gpio::InputPin,
}

#[cfg(target_os = "linux")]
impl InputPin for RppalInputPin {
    fn read(&self) -> Level {
        match self.pin.read() {
            rppal::gpio::Level::High => Level::High,
            rppal::gpio::Level::Low => Level::Low,
        }
    }
}

#[cfg(target_os = "linux")]
impl Gpio for RppalGpio {
    fn input_pull_up(&self, bcm_pin: u8) -> Result<Box<dyn InputPin>, DubSirenError> {
        let pin = self
            .chip
            .get(bcm_pin)
            .map_err(|e| DubSirenError::GpioUnavailable(e.to_string()))?
            .into_input_pullup();
        Ok(Box::new(RppalInputPin { pin }))
    }
}

/// Headless stand-in used with `--simulate` and in tests: every pin reads
/// HIGH (idle/unpressed) unless driven low through its [`SimulatedPinHandle`].
/// Levels are retained by BCM pin number, so a handle fetched before or
/// after the control surface opens the same pin observes the same state.
#[derive(Default)]
pub struct SimulatedGpio {
    levels: Mutex<HashMap<u8, Arc<AtomicBool>>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    fn level_for(&self, bcm_pin: u8) -> Arc<AtomicBool> {
        let mut levels = self.levels.lock().unwrap();
        Arc::clone(
            levels
                .entry(bcm_pin)
                .or_insert_with(|| Arc::new(AtomicBool::new(true))),
        )
    }

    pub fn handle_for(&self, bcm_pin: u8) -> SimulatedPinHandle {
        SimulatedPinHandle {
            level: self.level_for(bcm_pin),
        }
    }
}

pub struct SimulatedPin {
    level: Arc<AtomicBool>,
}

impl SimulatedPin {
    pub fn new() -> (Self, SimulatedPinHandle) {
        let level = Arc::new(AtomicBool::new(true));
        (
            Self {
                level: Arc::clone(&level),
            },
            SimulatedPinHandle { level },
        )
    }
}

/// Test/simulation control handle: drives a [`SimulatedPin`] low or high as
/// if a button were pressed or released.
#[derive(Clone)]
pub struct SimulatedPinHandle {
    level: Arc<AtomicBool>,
}

impl SimulatedPinHandle {
    pub fn set(&self, level: Level) {
        self.level.store(level == Level::High, Ordering::Relaxed);
    }
}

impl InputPin for SimulatedPin {
    fn read(&self) -> Level {
        if self.level.load(Ordering::Relaxed) {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl Gpio for SimulatedGpio {
    fn input_pull_up(&self, bcm_pin: u8) -> Result<Box<dyn InputPin>, DubSirenError> {
        Ok(Box::new(SimulatedPin {
            level: self.level_for(bcm_pin),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_gpio_idles_high() {
        let gpio = SimulatedGpio::new();
        let pin = gpio.input_pull_up(4).unwrap();
        assert_eq!(pin.read(), Level::High);
    }

    #[test]
    fn simulated_pin_handle_drives_level() {
        let (pin, handle) = SimulatedPin::new();
        assert_eq!(pin.read(), Level::High);
        handle.set(Level::Low);
        assert_eq!(pin.read(), Level::Low);
    }

    #[test]
    fn handle_for_shares_state_with_opened_pin() {
        let gpio = SimulatedGpio::new();
        let pin = gpio.input_pull_up(17).unwrap();
        let handle = gpio.handle_for(17);
        handle.set(Level::Low);
        assert_eq!(pin.read(), Level::Low);
    }
}
