//! Lumabus wire protocol
//!
//! This crate defines the command frames exchanged on a shared I2C bus by
//! the address server, addressable devices and LED drivers.
//!
//! # Protocol Overview
//!
//! Every command is a byte stream delivered to one target address or to
//! the general-call address `0x00`:
//! ```text
//! ┌─────────┬─────────┬─────────────┐
//! │ ADDRESS │ COMMAND │ ARGS        │
//! │ 7 bit   │ 1B      │ 0–3B        │
//! └─────────┴─────────┴─────────────┘
//! ```
//!
//! The address phase belongs to the bus transport. This crate only sees
//! the target it was delivered to, the command byte and its arguments.
//! There is no negative acknowledgment: frames that fail to decode are
//! dropped by the receiver.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod address;
pub mod frame;
pub mod messages;

pub use address::{Address, GroupId, Phase};
pub use frame::{CommandFrame, FrameError, MAX_ARGS};
pub use messages::{Channel, Message, Target};
