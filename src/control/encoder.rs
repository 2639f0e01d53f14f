//! Rotary encoder: quadrature decode on a dedicated polling thread.
//!
//! Polls both contacts roughly every millisecond. On every edge of the
//! clock (CLK) line, the state of the data (DT) line at that instant gives
//! the direction: DT differing from CLK is +1, DT matching CLK is -1. Both
//! contacts idle HIGH through internal pull-ups, so a disconnected encoder
//! (or a simulated one never driven low) produces no ticks at all.

use super::gpio::{Gpio, Level};
use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Owns a background thread that polls a (CLK, DT) pin pair and invokes
/// `on_tick(direction)` (`+1` or `-1`) on every detent. Stops and joins
/// cleanly on drop.
pub struct RotaryEncoder {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RotaryEncoder {
    pub fn new<F>(gpio: &dyn Gpio, clk_pin: u8, dt_pin: u8, mut on_tick: F) -> Self
    where
        F: FnMut(i32) + Send + 'static,
    {
        let clk = gpio.input_pull_up(clk_pin);
        let dt = gpio.input_pull_up(dt_pin);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let (clk, dt) = match (clk, dt) {
            (Ok(clk), Ok(dt)) => (clk, dt),
            _ => {
                // Missing controls are non-fatal: leave the thread unspawned,
                // `on_tick` simply never fires.
                return Self {
                    stop_tx: None,
                    handle: None,
                };
            }
        };

        let handle = thread::Builder::new()
            .name(format!("encoder-{clk_pin}-{dt_pin}"))
            .spawn(move || {
                let mut last_clk = clk.read();
                loop {
                    if stop_rx.try_recv().is_ok() {
                        return;
                    }
                    let cur_clk = clk.read();
                    if let Some(direction) = decode_tick(last_clk, cur_clk, dt.read()) {
                        on_tick(direction);
                    }
                    last_clk = cur_clk;
                    thread::sleep(POLL_INTERVAL);
                }
            })
            .expect("failed to spawn encoder polling thread");

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for RotaryEncoder {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Decodes a single CLK transition into a direction, split out of the
/// polling loop so it can be unit tested without threads or real pins.
pub fn decode_tick(prev_clk: Level, cur_clk: Level, cur_dt: Level) -> Option<i32> {
    if cur_clk == prev_clk {
        return None;
    }
    Some(if cur_dt != cur_clk { 1 } else { -1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::gpio::SimulatedGpio;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn decode_tick_is_none_without_a_clk_edge() {
        assert_eq!(decode_tick(Level::High, Level::High, Level::Low), None);
    }

    #[test]
    fn decode_tick_matches_spec_table() {
        assert_eq!(decode_tick(Level::High, Level::Low, Level::High), Some(1));
        assert_eq!(decode_tick(Level::High, Level::Low, Level::Low), Some(-1));
    }

    #[test]
    fn encoder_ticks_on_clk_edges() {
        let gpio = SimulatedGpio::new();
        let clk = gpio.handle_for(17);
        let dt = gpio.handle_for(2);
        let count = Arc::new(AtomicI32::new(0));
        let count_cb = Arc::clone(&count);
        let encoder = RotaryEncoder::new(&gpio, 17, 2, move |dir| {
            count_cb.fetch_add(dir, Ordering::Relaxed);
        });

        dt.set(Level::High);
        clk.set(Level::Low);
        thread::sleep(Duration::from_millis(20));
        drop(encoder);

        assert_eq!(count.load(Ordering::Relaxed), -1);
    }

    #[test]
    fn missing_pins_do_not_panic() {
        struct AlwaysFails;
        impl Gpio for AlwaysFails {
            fn input_pull_up(
                &self,
                _bcm_pin: u8,
            ) -> Result<Box<dyn super::super::gpio::InputPin>, crate::error::DubSirenError> {
                Err(crate::error::DubSirenError::GpioUnavailable("no chip".into()))
            }
        }
        let gpio = AlwaysFails;
        let _encoder = RotaryEncoder::new(&gpio, 17, 2, |_| {});
    }
}
