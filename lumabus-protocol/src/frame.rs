//! Command frame encoding and decoding
//!
//! Frame format (after the transport's address phase):
//! - COMMAND (1 byte): command identifier
//! - ARGS (0-3 bytes): command-specific parameters
//!
//! The target address travels alongside the bytes so receivers can check
//! that broadcast-only commands really arrived via general-call.

use crate::address::Address;

/// Maximum number of argument bytes (LED_WRITE_WORD carries three)
pub const MAX_ARGS: usize = 3;

/// Maximum complete frame size (COMMAND + MAX_ARGS)
pub const MAX_FRAME_SIZE: usize = 1 + MAX_ARGS;

/// Errors that can occur while decoding or encoding a frame
///
/// None of these are reported on the bus; a receiver drops the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No command byte
    Empty,
    /// More argument bytes than any command carries
    TooLong,
    /// Argument count does not match the command
    BadLength,
    /// Command byte not part of the protocol
    UnknownCommand(u8),
    /// Command delivered to (or built for) an address it may not use
    WrongTarget,
    /// Address argument outside the 7-bit range
    InvalidAddress(u8),
    /// LED channel other than red, green or blue
    InvalidChannel(u8),
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// One command as delivered to a target address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandFrame {
    target: Address,
    data: [u8; MAX_FRAME_SIZE],
    len: u8,
}

impl CommandFrame {
    /// Create a new frame with the given command and arguments
    pub fn new(target: Address, command: u8, args: &[u8]) -> Result<Self, FrameError> {
        if args.len() > MAX_ARGS {
            return Err(FrameError::TooLong);
        }
        Ok(Self::from_parts(target, command, args))
    }

    /// Create a frame with no arguments
    pub const fn bare(target: Address, command: u8) -> Self {
        Self {
            target,
            data: [command, 0, 0, 0],
            len: 1,
        }
    }

    /// Create a frame with a single argument byte
    pub const fn with_arg(target: Address, command: u8, arg: u8) -> Self {
        Self {
            target,
            data: [command, arg, 0, 0],
            len: 2,
        }
    }

    /// Build a frame from arguments already known to fit
    pub(crate) fn from_parts(target: Address, command: u8, args: &[u8]) -> Self {
        let n = args.len().min(MAX_ARGS);
        let mut data = [0u8; MAX_FRAME_SIZE];
        data[0] = command;
        data[1..1 + n].copy_from_slice(&args[..n]);
        Self {
            target,
            data,
            len: (1 + n) as u8,
        }
    }

    /// Decode the bytes received at `target`
    ///
    /// `bytes` is `[command, args...]` exactly as written by the sender.
    pub fn decode(target: Address, bytes: &[u8]) -> Result<Self, FrameError> {
        let (&command, args) = bytes.split_first().ok_or(FrameError::Empty)?;
        Self::new(target, command, args)
    }

    /// Address the frame is (or was) delivered to
    pub fn target(&self) -> Address {
        self.target
    }

    /// Check if the frame went out via general-call
    pub fn is_broadcast(&self) -> bool {
        self.target.is_broadcast()
    }

    /// Command byte
    pub fn command(&self) -> u8 {
        self.data[0]
    }

    /// Argument bytes
    pub fn args(&self) -> &[u8] {
        &self.data[1..self.len as usize]
    }

    /// The bytes to put on the wire after the address phase
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Arguments, provided there are exactly `count` of them
    pub fn expect_args(&self, count: usize) -> Result<&[u8], FrameError> {
        let args = self.args();
        if args.len() == count {
            Ok(args)
        } else {
            Err(FrameError::BadLength)
        }
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let bytes = self.bytes();
        if buffer.len() < bytes.len() {
            return Err(FrameError::BufferTooSmall);
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }
}
