//! Lumabus Hardware Abstraction Layer
//!
//! This crate defines the bus transport seen by the address server and by
//! every addressable device. Chip-specific drivers implement [`I2cBus`]
//! directly, or wrap an `embedded-hal` master in [`EmbeddedHalBus`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  lumabus-core (server, client, sync)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  lumabus-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ EmbeddedHalBus│       │  board-native │
//! │ (any I2c)     │       │    drivers    │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;

pub use i2c::{BusError, EmbeddedHalBus, I2cBus, GENERAL_CALL_ADDRESS};
