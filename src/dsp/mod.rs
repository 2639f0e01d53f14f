//! Low-level DSP primitives: oscillator, LFO, envelope, filter.

pub mod envelope;
pub mod fastmath;
pub mod filter;
pub mod oscillator;

pub use envelope::{Envelope, EnvelopeStage};
pub use fastmath::{
    cosf, exp2f, expf, expm1f, fast_tan, fast_tanh, fast_tanh_f32, ftz, log2f, modpi, par_cosf,
    par_sinf, pow10, pow1half, powf, sinf,
};
pub use filter::LowPassFilter;
pub use oscillator::{Lfo, Oscillator, Phasor};
