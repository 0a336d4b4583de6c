//! LED output traits

use lumabus_protocol::{Channel, Phase};

/// Trait for the waveform generator driving an LED
///
/// Implementations render the current pattern from a free-running phase
/// counter. The protocol only ever moves that counter.
pub trait WaveformGenerator {
    /// Jump the running waveform to `phase`
    fn jump_to_phase(&mut self, phase: Phase);

    /// Select the pattern to render
    fn set_pattern(&mut self, pattern: u8);
}

/// Trait for direct RGB channel writes
pub trait LedChannels {
    /// Set one channel to a 16-bit value
    fn write_channel(&mut self, channel: Channel, value: u16);
}
