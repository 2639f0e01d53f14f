//! Dub siren synthesizer daemon.
//!
//! Wires the GPIO control surface, the lock-free parameter plane, the DSP
//! engine, and the audio sink together, then blocks until asked to shut
//! down (shutdown button, or `quit`/EOF in `--interactive` mode).

use clap::Parser;
use crossbeam_channel::bounded;
use dubsiren::audio::{
    default_output_device, find_output_device, list_output_devices, print_diagnostics, AudioSink,
    CpalSink, SimulateSink, SinkDriver,
};
use dubsiren::config::EngineConfig;
use dubsiren::control::{ControlSurface, Gpio, SimulatedGpio};
#[cfg(target_os = "linux")]
use dubsiren::control::RppalGpio;
use dubsiren::param::{GateRequests, Parameters};
use dubsiren::telemetry::SinkMetrics;
use dubsiren::{DubSirenError, EdgeGate, Engine, Synth};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Command-line arguments for the dub siren daemon.
#[derive(Parser)]
#[command(name = "dubsirend")]
#[command(about = "Real-time dub siren synthesizer", long_about = None)]
struct Args {
    /// Audio sample rate in Hz.
    #[arg(long)]
    sample_rate: Option<f32>,

    /// Frames per audio callback.
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Output device (name or index). Default device if omitted.
    #[arg(long)]
    device: Option<String>,

    /// Run with a simulated sink and simulated GPIO; no real hardware
    /// is touched. Useful off-board and in CI.
    #[arg(long)]
    simulate: bool,

    /// Read commands from stdin (`trigger`, `release`, `quit`) instead of,
    /// or in addition to, the GPIO control surface. Intended for
    /// development off the physical board.
    #[arg(long)]
    interactive: bool,

    /// Secret-mode sample to load at startup.
    #[arg(long)]
    sample: Option<PathBuf>,

    /// List available output audio devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Run audio host/device diagnostics and exit.
    #[arg(long)]
    diagnose: bool,
}

fn print_devices() {
    println!("Output devices:");
    for info in list_output_devices() {
        let marker = if info.is_default { " *" } else { "" };
        println!("  {}: {}{}", info.index, info.name, marker);
    }
}

#[cfg(target_os = "linux")]
fn open_gpio(simulate: bool) -> Box<dyn Gpio> {
    if simulate {
        return Box::new(SimulatedGpio::new());
    }
    match RppalGpio::open() {
        Ok(gpio) => Box::new(gpio),
        Err(e) => {
            eprintln!("[GPIO] {e} (control surface disabled, engine keeps its defaults)");
            Box::new(SimulatedGpio::new())
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn open_gpio(_simulate: bool) -> Box<dyn Gpio> {
    Box::new(SimulatedGpio::new())
}

fn open_sink(
    config: &EngineConfig,
    metrics: Arc<SinkMetrics>,
) -> Result<Box<dyn AudioSink>, DubSirenError> {
    if config.simulate {
        return Ok(Box::new(SimulateSink::new(config.sample_rate)));
    }

    let device = match &config.device {
        Some(spec) => {
            find_output_device(spec).ok_or_else(|| DubSirenError::DeviceNotFound(spec.clone()))?
        }
        None => default_output_device().ok_or(DubSirenError::NoDefaultDevice)?,
    };

    let sink = CpalSink::open(&device, config.sample_rate, config.block_size, metrics)?;
    Ok(Box::new(sink))
}

fn run(config: EngineConfig) -> Result<(), DubSirenError> {
    let params = Arc::new(Parameters::new());
    let gates = Arc::new(GateRequests::new());
    let sample_play = Arc::new(EdgeGate::new());
    let secret_mode = Arc::new(AtomicBool::new(false));

    let metrics = Arc::new(SinkMetrics::default());
    let sink = open_sink(&config, Arc::clone(&metrics))?;
    let sample_rate = sink.sample_rate();

    let engine = Engine::new(
        sample_rate,
        config.block_size,
        Arc::clone(&params),
        Arc::clone(&gates),
    );
    let mut synth = Synth::new(engine, Arc::clone(&sample_play), Arc::clone(&secret_mode));
    synth.load_sample(&config.sample_path);

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

    let gpio = open_gpio(config.simulate);
    let shutdown_tx_button = shutdown_tx.clone();
    let secret_mode_trigger = Arc::clone(&secret_mode);
    let sample_play_trigger = Arc::clone(&sample_play);
    let gate_trigger = Arc::clone(&gates);
    let gate_release = Arc::clone(&gates);
    let params_pitch_env = Arc::clone(&params);

    let control = ControlSurface::new(
        gpio.as_ref(),
        Arc::clone(&params),
        move || {
            if secret_mode_trigger.load(Ordering::Relaxed) {
                sample_play_trigger.fire();
            } else {
                gate_trigger.trigger.fire();
            }
        },
        move || {
            gate_release.release.fire();
        },
        move || {
            let next = params_pitch_env.pitch_env_mode().cycle();
            params_pitch_env.set_pitch_env_mode(next);
            println!("[Control] pitch envelope: {next:?}");
        },
        move || {
            println!("[Control] shutdown requested");
            let _ = shutdown_tx_button.send(());
        },
        move || {
            let was = secret_mode.fetch_xor(true, Ordering::Relaxed);
            println!("[Control] secret mode: {}", if was { "off" } else { "on" });
        },
    );

    let driver = SinkDriver::start(sink, config.block_size, Arc::clone(&metrics), move |block| {
        synth.process(block);
    });

    if config.interactive {
        let shutdown_tx_stdin = shutdown_tx.clone();
        let gate_stdin = Arc::clone(&gates);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(cmd) => match cmd.trim() {
                        "trigger" => gate_stdin.trigger.fire(),
                        "release" => gate_stdin.release.fire(),
                        "quit" => {
                            let _ = shutdown_tx_stdin.send(());
                            return;
                        }
                        "" => {}
                        other => println!("[Interactive] unrecognized command: {other}"),
                    },
                    Err(_) => {
                        let _ = shutdown_tx_stdin.send(());
                        return;
                    }
                }
            }
            let _ = shutdown_tx_stdin.send(());
        });
    }

    let _ = shutdown_rx.recv();

    drop(driver);
    drop(control);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_devices {
        print_devices();
        return ExitCode::SUCCESS;
    }
    if args.diagnose {
        print_diagnostics();
        return ExitCode::SUCCESS;
    }

    let mut config = EngineConfig::new().with_simulate(args.simulate);
    if let Some(sr) = args.sample_rate {
        config = config.with_sample_rate(sr);
    }
    if let Some(bs) = args.buffer_size {
        config = config.with_block_size(bs);
    }
    if let Some(device) = args.device {
        config = config.with_device(device);
    }
    config = config.with_interactive(args.interactive);
    if let Some(sample) = args.sample {
        config.sample_path = sample;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dubsirend: {e}");
            ExitCode::FAILURE
        }
    }
}
