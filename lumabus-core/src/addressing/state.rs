//! Client address state machine
//!
//! The client's address is a function of its current state and the
//! inputs it has seen: frames it sent and broadcasts it heard. The machine
//! is explicit, finite, and deterministic; inputs that do not apply to
//! the current state leave it unchanged.

use lumabus_protocol::{Address, Message};

/// Client address states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientState {
    /// No address; only broadcasts reach this device
    #[default]
    Unaddressed,
    /// REQUEST_ADDRESS sent, waiting for the grant
    Requesting,
    /// RELEASE_REQUEST sent for a candidate we do not own
    Probing(Address),
    /// Holding an address
    Addressed(Address),
    /// RELEASE_REQUEST sent for our own address
    Releasing(Address),
}

/// Inputs that can move the client between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientInput {
    /// We sent REQUEST_ADDRESS
    RequestSent,
    /// We sent RELEASE_REQUEST for a candidate address
    ProbeSent(Address),
    /// We sent RELEASE_REQUEST for our own address
    ReleaseSent,
    /// Caller abandoned the pending request, or it timed out
    Cancelled,
    /// ADDRESS_ALLOCATION heard
    Allocation(Address),
    /// NO_ROOM_ON_BUS heard
    NoRoom,
    /// RELEASE_ACKNOWLEDGE heard
    Acknowledge(Address),
    /// RELEASE_DISPUTED heard
    Disputed(Address),
    /// RELEASE_FORCE heard
    Force(Address),
    /// RELEASE_NOT_ALLOCATED heard
    NotAllocated(Address),
}

impl ClientInput {
    /// Convert a broadcast from the server into an input
    pub fn from_message(message: &Message) -> Option<Self> {
        match *message {
            Message::AddressAllocation(a) => Some(ClientInput::Allocation(a)),
            Message::NoRoomOnBus => Some(ClientInput::NoRoom),
            Message::ReleaseAcknowledge(a) => Some(ClientInput::Acknowledge(a)),
            Message::ReleaseDisputed(a) => Some(ClientInput::Disputed(a)),
            Message::ReleaseForce(a) => Some(ClientInput::Force(a)),
            Message::ReleaseNotAllocated(a) => Some(ClientInput::NotAllocated(a)),
            _ => None,
        }
    }
}

impl ClientState {
    /// Address the device answers to, if any
    ///
    /// A releasing device keeps listening until the server confirms.
    pub fn address(&self) -> Option<Address> {
        match *self {
            ClientState::Addressed(a) | ClientState::Releasing(a) => Some(a),
            _ => None,
        }
    }

    /// Check if a server reply is outstanding
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            ClientState::Requesting | ClientState::Probing(_) | ClientState::Releasing(_)
        )
    }

    /// Process an input and return the next state
    pub fn transition(self, input: ClientInput) -> Self {
        use ClientInput::*;
        use ClientState::*;

        match (self, input) {
            // Unaddressed transitions
            (Unaddressed, RequestSent) => Requesting,
            (Unaddressed, ProbeSent(candidate)) => Probing(candidate),

            // Requesting transitions
            (Requesting, Allocation(a)) if a.is_allocable() => Addressed(a),
            (Requesting, NoRoom) => Unaddressed,
            (Requesting, Cancelled) => Unaddressed,

            // Probing transitions: a free or reclaimed candidate is ours
            (Probing(c), NotAllocated(a)) if a == c => Addressed(c),
            (Probing(c), Force(a)) if a == c => Addressed(c),
            // Holder was releasing it anyway
            (Probing(c), Acknowledge(a)) if a == c => Addressed(c),
            (Probing(c), Disputed(a)) if a == c => Unaddressed,
            (Probing(_), Cancelled) => Unaddressed,

            // Addressed transitions
            (Addressed(own), ReleaseSent) => Releasing(own),
            // Server reclaimed our address
            (Addressed(own), Acknowledge(a)) if a == own => Unaddressed,
            (Addressed(own), Force(a)) if a == own => Unaddressed,

            // Releasing transitions
            (Releasing(own), Acknowledge(a)) if a == own => Unaddressed,
            (Releasing(own), Force(a)) if a == own => Unaddressed,
            // Another live device claims it too; it keeps the address
            (Releasing(own), Disputed(a)) if a == own => Unaddressed,
            (Releasing(own), Cancelled) => Addressed(own),

            // Default: stay in current state
            _ => self,
        }
    }
}
