//! Liveness probing of address holders

use lumabus_hal::I2cBus;
use lumabus_protocol::{Address, Message};

/// Trait for challenging the current holder of an address
///
/// The address server uses this to find out whether the holder of an
/// address is still on the bus, both before granting and on release. Implementations deliver
/// ADDRESS_CHALLENGE(nonce) to `holder` and read back one byte.
pub trait LivenessProbe {
    /// Challenge `holder` and return its answer
    ///
    /// `None` means nothing answered (NACK, timeout).
    fn challenge(&mut self, holder: Address, nonce: u8) -> Option<u8>;
}

/// Liveness probe over an I2C master
///
/// Writes the challenge and reads the answer in one repeated-start
/// transaction.
pub struct BusLivenessProbe<'a, B> {
    bus: &'a mut B,
}

impl<'a, B: I2cBus> BusLivenessProbe<'a, B> {
    /// Borrow a bus for the duration of one server transaction
    pub fn new(bus: &'a mut B) -> Self {
        Self { bus }
    }
}

impl<B: I2cBus> LivenessProbe for BusLivenessProbe<'_, B> {
    fn challenge(&mut self, holder: Address, nonce: u8) -> Option<u8> {
        let frame = Message::AddressChallenge { nonce }.to_frame_at(holder).ok()?;
        let mut reply = [0u8; 1];
        match self.bus.write_read(holder.as_u8(), frame.bytes(), &mut reply) {
            Ok(()) => Some(reply[0]),
            Err(_) => {
                debug!("no answer to challenge at {}", holder);
                None
            }
        }
    }
}
