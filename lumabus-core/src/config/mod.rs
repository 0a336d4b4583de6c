//! Configuration types
//!
//! Board-agnostic configuration structures, optionally stored as postcard
//! binary data.

#[cfg(feature = "serde")]
pub mod storage;
pub mod types;

#[cfg(feature = "serde")]
pub use storage::*;
pub use types::*;
