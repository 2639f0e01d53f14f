//! Configuration for the dub siren engine's audio sink and GPIO wiring.

use std::path::PathBuf;

/// Runtime configuration assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Audio sample rate in Hz. Immutable after the engine is constructed.
    pub sample_rate: f32,
    /// Frames per audio callback.
    pub block_size: usize,
    /// Output device specification (name or index). None uses system default.
    pub device: Option<String>,
    /// Run with a simulated sink and simulated GPIO (headless/CI/testing).
    pub simulate: bool,
    /// Read commands from stdin in addition to the GPIO control surface.
    pub interactive: bool,
    /// Path to the optional secret-mode sample file.
    pub sample_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::types::DEFAULT_SAMPLE_RATE,
            block_size: crate::types::DEFAULT_BLOCK_SIZE,
            device: None,
            simulate: false,
            interactive: false,
            sample_path: PathBuf::from("assets/audio/custom.mp3"),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sr: f32) -> Self {
        self.sample_rate = sr;
        self
    }

    pub fn with_block_size(mut self, n: usize) -> Self {
        self.block_size = n;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}
