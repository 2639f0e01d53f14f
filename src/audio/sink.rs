//! Audio sink driver: a dedicated thread that computes blocks and writes
//! them to the output device, independent of whatever callback cadence the
//! underlying transport uses.
//!
//! The device contract is fixed: stereo, sample rate matching the engine's
//! sample rate, 16-bit signed little-endian samples, period close to the
//! block size the engine was built with. [`CpalSink`] negotiates that
//! contract against whatever cpal actually offers and bridges the gap with
//! a single-producer/single-consumer ring buffer so the driver thread can
//! keep writing on its own schedule while cpal's callback drains at its own.

use crate::error::DubSirenError;
use crate::telemetry::SinkMetrics;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A destination for interleaved stereo i16 frames. Implementors may be
/// backed by a real device or discard everything (for headless/simulated
/// runs); either way `write` never blocks indefinitely.
pub trait AudioSink: Send {
    fn sample_rate(&self) -> f32;

    /// Writes interleaved stereo samples, returning the number of *frames*
    /// (not samples) actually accepted. A short write (fewer frames than
    /// offered) is a runtime-transient condition the driver counts and
    /// continues past, never a hard error.
    fn write(&mut self, samples: &[i16]) -> usize;
}

const RING_BLOCKS: usize = 8;

type RingProducer = ringbuf::HeapProd<i16>;

/// Real output device, bridged from the driver thread through a ring buffer
/// drained by cpal's real-time callback. The producer side lives on the
/// driver thread; the consumer side is moved into the cpal callback.
pub struct CpalSink {
    _stream: cpal::Stream,
    producer: RingProducer,
    sample_rate: f32,
    metrics: Arc<SinkMetrics>,
}

impl CpalSink {
    /// Opens `device` at `sample_rate`/stereo/period `block_size`. Fails
    /// with a diagnostic if no config negotiates a 2-channel stream at (or
    /// acceptably near) the requested rate.
    pub fn open(
        device: &Device,
        sample_rate: f32,
        block_size: usize,
        metrics: Arc<SinkMetrics>,
    ) -> Result<Self, DubSirenError> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| DubSirenError::DeviceConfigError(e.to_string()))?
            .find(|c| c.channels() == 2 && c.sample_format() == SampleFormat::I16)
            .or_else(|| {
                device
                    .supported_output_configs()
                    .ok()
                    .into_iter()
                    .flatten()
                    .find(|c| c.channels() == 2)
            })
            .ok_or_else(|| {
                DubSirenError::DeviceConfigError(
                    "no 2-channel output configuration available".to_string(),
                )
            })?;

        let target_rate = sample_rate as u32;
        let rate = target_rate.clamp(
            supported.min_sample_rate().0,
            supported.max_sample_rate().0,
        );
        let sample_format = supported.sample_format();
        let config = StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(rate),
            buffer_size: cpal::BufferSize::Fixed(block_size as u32),
        };

        let rb = HeapRb::<i16>::new(block_size * 2 * RING_BLOCKS);
        let (producer, mut consumer) = rb.split();
        let metrics_cb = Arc::clone(&metrics);

        let stream = match sample_format {
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _| {
                    let n = consumer.pop_slice(data);
                    if n < data.len() {
                        metrics_cb.record_underrun();
                        for slot in data[n..].iter_mut() {
                            *slot = 0;
                        }
                    }
                },
                |err| eprintln!("audio sink stream error: {err}"),
                None,
            ),
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    let mut scratch = vec![0i16; data.len()];
                    let n = consumer.pop_slice(&mut scratch);
                    if n < data.len() {
                        metrics_cb.record_underrun();
                    }
                    for (out, &s) in data.iter_mut().zip(scratch.iter()) {
                        *out = s as f32 / i16::MAX as f32;
                    }
                },
                |err| eprintln!("audio sink stream error: {err}"),
                None,
            ),
            other => {
                return Err(DubSirenError::DeviceConfigError(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| DubSirenError::StreamCreationFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| DubSirenError::StreamCreationFailed(e.to_string()))?;

        if rate != target_rate {
            eprintln!(
                "audio sink: requested {target_rate} Hz, device negotiated {rate} Hz instead"
            );
        }

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate: rate as f32,
            metrics,
        })
    }
}

impl AudioSink for CpalSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn write(&mut self, samples: &[i16]) -> usize {
        // Give the callback a little room to drain if the ring is briefly
        // full rather than immediately reporting a short write.
        let mut pushed = self.producer.push_slice(samples);
        let mut spins = 0;
        while pushed < samples.len() && spins < 50 {
            thread::sleep(Duration::from_micros(200));
            pushed += self.producer.push_slice(&samples[pushed..]);
            spins += 1;
        }
        if pushed < samples.len() {
            self.metrics.record_underrun();
        }
        pushed / 2
    }
}

/// Discards everything. Used for `--simulate` runs and tests: the engine
/// still runs a full audio thread, it just has nowhere real to send sound.
#[derive(Default)]
pub struct SimulateSink {
    sample_rate: f32,
}

impl SimulateSink {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

impl AudioSink for SimulateSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn write(&mut self, samples: &[i16]) -> usize {
        samples.len() / 2
    }
}

/// Owns the audio thread: pulls a block from `process`, converts to
/// clamped i16, writes it to the sink, and records load/underrun metrics.
/// Stops cleanly and drains on drop.
pub struct SinkDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    pub metrics: Arc<SinkMetrics>,
}

impl SinkDriver {
    /// `process` fills a stereo-interleaved f32 block of `block_size`
    /// frames (`2 * block_size` samples) each call. It must not allocate,
    /// lock, or perform syscalls beyond what the caller already set up.
    pub fn start<F>(
        mut sink: Box<dyn AudioSink>,
        block_size: usize,
        metrics: Arc<SinkMetrics>,
        mut process: F,
    ) -> Self
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);
        let metrics_thread = Arc::clone(&metrics);
        let sample_rate = sink.sample_rate();
        let block_ns = (block_size as f64 / sample_rate as f64 * 1_000_000_000.0) as u64;
        metrics_thread.load.set_buffer_time(block_ns);

        let handle = thread::spawn(move || {
            let mut float_block = vec![0.0f32; block_size * 2];
            let mut int_block = vec![0i16; block_size * 2];

            while !stop_thread.load(Ordering::Relaxed) {
                let started = Instant::now();
                let timer = metrics_thread.load.start_timer();
                process(&mut float_block);
                for (dst, &src) in int_block.iter_mut().zip(float_block.iter()) {
                    *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                }
                drop(timer);

                let written = sink.write(&int_block);
                metrics_thread.record_block();
                if written < block_size {
                    metrics_thread.record_underrun();
                }

                let elapsed = started.elapsed();
                let budget = Duration::from_nanos(block_ns);
                if elapsed < budget {
                    thread::sleep(budget - elapsed);
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
            metrics,
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SinkDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_roundtrips_under_capacity() {
        let rb = HeapRb::<i16>::new(16);
        let (mut prod, mut cons) = rb.split();
        let data = [1i16, 2, 3, 4];
        assert_eq!(prod.push_slice(&data), 4);
        let mut out = [0i16; 4];
        assert_eq!(cons.pop_slice(&mut out), 4);
        assert_eq!(out, data);
    }

    #[test]
    fn ring_buffer_leaves_remainder_zeroed_by_caller_on_underrun() {
        let rb = HeapRb::<i16>::new(16);
        let (mut prod, mut cons) = rb.split();
        prod.push_slice(&[7, 8]);
        let mut out = [0i16; 6];
        let n = cons.pop_slice(&mut out);
        assert_eq!(n, 2);
        assert_eq!(&out[..2], &[7, 8]);
    }

    #[test]
    fn ring_buffer_refuses_past_capacity() {
        let rb = HeapRb::<i16>::new(4);
        let (mut prod, _cons) = rb.split();
        let pushed = prod.push_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(pushed, 4);
    }

    #[test]
    fn simulate_sink_accepts_everything_silently() {
        let mut sink = SimulateSink::new(48_000.0);
        let block = vec![0i16; 512];
        assert_eq!(sink.write(&block), 256);
    }

    #[test]
    fn driver_runs_and_stops_cleanly() {
        let metrics = Arc::new(SinkMetrics::default());
        let sink: Box<dyn AudioSink> = Box::new(SimulateSink::new(48_000.0));
        let mut driver = SinkDriver::start(sink, 64, Arc::clone(&metrics), |block| {
            for s in block.iter_mut() {
                *s = 0.0;
            }
        });
        thread::sleep(Duration::from_millis(20));
        driver.stop();
        assert!(metrics.blocks_written_count() > 0);
    }
}
