//! Momentary switch: debounced press/release polling on a dedicated thread.
//!
//! Idles HIGH through an internal pull-up; pressed reads LOW. A transition
//! must hold steady for at least [`DEBOUNCE`] before it is trusted, and a
//! press must have lasted at least [`MIN_PRESS_DURATION`] before its
//! matching release event fires. This absorbs contact bounce on both the
//! leading and trailing edge without swallowing a deliberate tap.

use super::gpio::{Gpio, Level};
use crossbeam_channel::{bounded, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const DEBOUNCE: Duration = Duration::from_millis(10);
const MIN_PRESS_DURATION: Duration = Duration::from_millis(30);

/// Owns a background thread that polls a single pin and invokes
/// `on_press`/`on_release` on debounced transitions. Stops and joins
/// cleanly on drop.
pub struct MomentarySwitch {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MomentarySwitch {
    pub fn new<P, R>(gpio: &dyn Gpio, pin: u8, mut on_press: P, mut on_release: R) -> Self
    where
        P: FnMut() + Send + 'static,
        R: FnMut() + Send + 'static,
    {
        let Ok(input) = gpio.input_pull_up(pin) else {
            return Self {
                stop_tx: None,
                handle: None,
            };
        };
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name(format!("switch-{pin}"))
            .spawn(move || {
                let mut debounced = input.read();
                let mut candidate = debounced;
                let mut candidate_since = Instant::now();
                let mut pressed_at: Option<Instant> = None;

                loop {
                    if stop_rx.try_recv().is_ok() {
                        return;
                    }

                    let raw = input.read();
                    if raw != candidate {
                        candidate = raw;
                        candidate_since = Instant::now();
                    } else if candidate != debounced && candidate_since.elapsed() >= DEBOUNCE {
                        debounced = candidate;
                        match debounced {
                            Level::Low => {
                                pressed_at = Some(Instant::now());
                                on_press();
                            }
                            Level::High => {
                                let held_long_enough = pressed_at
                                    .map(|at| at.elapsed() >= MIN_PRESS_DURATION)
                                    .unwrap_or(false);
                                if held_long_enough {
                                    on_release();
                                }
                                pressed_at = None;
                            }
                        }
                    }

                    thread::sleep(POLL_INTERVAL);
                }
            })
            .expect("failed to spawn switch polling thread");

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for MomentarySwitch {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::gpio::SimulatedGpio;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn press_and_release_fire_after_min_hold() {
        let gpio = SimulatedGpio::new();
        let pin = gpio.handle_for(4);
        let presses = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let (p, r) = (Arc::clone(&presses), Arc::clone(&releases));

        let switch = MomentarySwitch::new(
            &gpio,
            4,
            move || {
                p.fetch_add(1, Ordering::Relaxed);
            },
            move || {
                r.fetch_add(1, Ordering::Relaxed);
            },
        );

        pin.set(Level::Low);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(presses.load(Ordering::Relaxed), 1);

        thread::sleep(Duration::from_millis(40));
        pin.set(Level::High);
        thread::sleep(Duration::from_millis(20));

        drop(switch);
        assert_eq!(releases.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn bounce_within_debounce_window_is_ignored() {
        let gpio = SimulatedGpio::new();
        let pin = gpio.handle_for(4);
        let presses = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&presses);

        let switch = MomentarySwitch::new(&gpio, 4, move || {
            p.fetch_add(1, Ordering::Relaxed);
        }, || {});

        for _ in 0..3 {
            pin.set(Level::Low);
            thread::sleep(Duration::from_micros(500));
            pin.set(Level::High);
            thread::sleep(Duration::from_micros(500));
        }
        thread::sleep(Duration::from_millis(15));

        drop(switch);
        assert_eq!(presses.load(Ordering::Relaxed), 0);
    }
}
