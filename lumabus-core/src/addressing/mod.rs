//! Dynamic address allocation
//!
//! Server and client halves of the allocation protocol plus the liveness
//! challenge used to settle release disputes.

pub mod challenge;
mod client;
mod server;
mod state;
mod table;

pub use client::{AddressClient, ClientError, ClientEvent};
pub use server::{AddressServer, Negotiation, ReleaseOutcome, ServerStats};
pub use state::{ClientInput, ClientState};
pub use table::{AllocationRecord, AllocationState, AllocationTable, MAX_POOL_SIZE};
