//! Board-agnostic core logic for Lumabus devices
//!
//! This crate contains the protocol state machines that do not depend on
//! specific hardware implementations:
//!
//! - Address server (allocation table, release disputes)
//! - Address client (request, release, collision probe)
//! - Phase synchronization controller (include/exclude/synchronize)
//! - Device node tying the client and LED handling to the bus
//! - Collaborator traits (waveform generator, liveness probe)
//! - Configuration type definitions
//!
//! Every node reacts to one frame at a time and owns its own state; there
//! is no global state and no internal threading.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod addressing;
pub mod config;
pub mod device;
pub mod sync;
pub mod traits;

pub use addressing::{AddressClient, AddressServer, ClientEvent, ClientState};
pub use device::{Device, Outbound};
pub use sync::{SyncController, SyncOutcome};
