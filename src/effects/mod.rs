//! Time-based effects stage of the DSP graph: tape delay, chamber reverb,
//! DC blocker.

mod dc_blocker;
mod delay;
mod reverb;

pub use dc_blocker::DcBlocker;
pub use delay::DelayEffect;
pub use reverb::ReverbEffect;
