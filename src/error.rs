//! Error types for the dub siren engine.
//!
//! Only init-fatal conditions are represented here: device negotiation
//! failure and explicit sample decode failure. Everything else (underruns,
//! out-of-range parameters, missing GPIO) is absorbed at the component that
//! owns it rather than propagated as a hard error.

use std::fmt;

/// Errors that can occur when standing up the audio engine or its sink.
#[derive(Debug)]
pub enum DubSirenError {
    /// The specified audio device was not found.
    DeviceNotFound(String),
    /// No default audio device is available.
    NoDefaultDevice,
    /// Failed to create an audio stream.
    StreamCreationFailed(String),
    /// The requested channel count is invalid.
    InvalidChannelCount(u16),
    /// Failed to get device configuration.
    DeviceConfigError(String),
    /// The specified audio host was not found.
    HostNotFound(String),
    /// Failed to decode an explicitly loaded sample file.
    SampleDecodeFailed(String),
    /// GPIO chip could not be opened; controls are disabled but the engine
    /// still runs with defaults.
    GpioUnavailable(String),
}

impl fmt::Display for DubSirenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DubSirenError::DeviceNotFound(name) => {
                write!(f, "audio device not found: {name}")
            }
            DubSirenError::NoDefaultDevice => {
                write!(f, "no default audio device available")
            }
            DubSirenError::StreamCreationFailed(msg) => {
                write!(f, "failed to create audio stream: {msg}")
            }
            DubSirenError::InvalidChannelCount(count) => {
                write!(f, "invalid channel count: {count}")
            }
            DubSirenError::DeviceConfigError(msg) => {
                write!(f, "device configuration error: {msg}")
            }
            DubSirenError::HostNotFound(name) => {
                write!(f, "audio host not found: {name}")
            }
            DubSirenError::SampleDecodeFailed(msg) => {
                write!(f, "failed to decode sample: {msg}")
            }
            DubSirenError::GpioUnavailable(msg) => {
                write!(f, "gpio unavailable: {msg}")
            }
        }
    }
}

impl std::error::Error for DubSirenError {}
