//! I2C bus abstractions
//!
//! The shared bus is a single-master I2C segment. Frames are written to
//! one 7-bit target or to the general-call address, and the only read the
//! protocol ever performs is the one-byte liveness read-back.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// General-call (broadcast) address
pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Transport-level failure
///
/// A missing acknowledge is the normal way an absent device shows up on
/// the bus, so callers usually treat [`BusError::Nack`] as "no reply".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Bus error (misplaced start/stop)
    Bus,
    /// Arbitration lost
    ArbitrationLost,
    /// NACK received
    Nack,
    /// Overrun
    Overrun,
    /// Other error
    Other,
}

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Bus => BusError::Bus,
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLost,
            ErrorKind::NoAcknowledge(_) => BusError::Nack,
            ErrorKind::Overrun => BusError::Overrun,
            _ => BusError::Other,
        }
    }
}

/// I2C bus master
///
/// Provides the write and read operations the protocol needs.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write (`[command, args...]`)
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// Used by the address server to challenge a holder and collect its
    /// one-byte answer.
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Write data to every device via the general-call address
    fn general_call(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.write(GENERAL_CALL_ADDRESS, data)
    }
}

/// Adapter exposing any `embedded-hal` I2C master as an [`I2cBus`]
#[derive(Debug)]
pub struct EmbeddedHalBus<T> {
    inner: T,
}

impl<T: I2c> EmbeddedHalBus<T> {
    /// Wrap an `embedded-hal` I2C master
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Release the wrapped master
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: I2c> I2cBus for EmbeddedHalBus<T> {
    type Error = BusError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), BusError> {
        self.inner
            .write(address, data)
            .map_err(|e| BusError::from(e.kind()))
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.inner
            .read(address, buf)
            .map_err(|e| BusError::from(e.kind()))
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), BusError> {
        self.inner
            .write_read(address, write_data, read_buf)
            .map_err(|e| BusError::from(e.kind()))
    }
}

impl BusError {
    /// Check whether the target simply did not answer
    pub fn is_no_reply(&self) -> bool {
        matches!(self, BusError::Nack)
    }
}
