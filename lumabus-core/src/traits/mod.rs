//! Collaborator traits
//!
//! These traits define the interface between the protocol logic and the
//! pieces that live outside it: the LED waveform generator and the
//! server's means of challenging an address holder.

pub mod led;
pub mod liveness;

pub use led::{LedChannels, WaveformGenerator};
pub use liveness::{BusLivenessProbe, LivenessProbe};
