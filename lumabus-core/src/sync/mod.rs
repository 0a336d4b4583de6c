//! Group phase synchronization
//!
//! Each LED device keeps a small amount of state that decides how it
//! reacts to the next synchronize broadcast.

mod controller;

pub use controller::{DeviceSyncState, SyncController, SyncOutcome};
