//! Address client
//!
//! Runs on every device. Builds the frames the device sends to the server,
//! feeds server broadcasts through [`ClientState::transition`] and reports
//! what changed. Waiting for a reply never blocks; the caller drives
//! timeouts through [`AddressClient::update_time`].

use lumabus_protocol::{Address, CommandFrame, FrameError, Message};

use super::challenge::{expected_response, yield_response};
use super::state::{ClientInput, ClientState};
use crate::config::ClientConfig;

/// Errors from client operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientError {
    /// Operation not valid in the current state
    InvalidState(ClientState),
    /// Probe candidate outside 0x02..=0x7F
    NotAllocable(Address),
    /// Frame could not be built
    Frame(FrameError),
}

impl From<FrameError> for ClientError {
    fn from(e: FrameError) -> Self {
        ClientError::Frame(e)
    }
}

/// Outcome reported to the caller after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientEvent {
    /// Device now owns this address (grant or successful probe)
    Addressed(Address),
    /// Server had no free address
    NoRoom,
    /// Own release completed
    Released(Address),
    /// Own release refused: another live device answers for the address
    ReleaseDisputed(Address),
    /// Probe candidate has a live holder
    ProbeDisputed(Address),
    /// Server reclaimed the address while we held it
    Revoked(Address),
    /// Server did not answer in time; state rolled back
    TimedOut(ClientState),
}

/// Address client for one device
#[derive(Debug, Clone)]
pub struct AddressClient {
    state: ClientState,
    config: ClientConfig,
    /// Time spent waiting in the current pending state
    waiting_ms: u32,
    /// Rolling nonce for release requests
    nonce: u8,
}

impl AddressClient {
    /// Create an unaddressed client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            state: ClientState::Unaddressed,
            config,
            waiting_ms: 0,
            nonce: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Address this device answers to, if any
    pub fn address(&self) -> Option<Address> {
        self.state.address()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn enter(&mut self, next: ClientState) {
        if next != self.state {
            trace!("client {} -> {}", self.state, next);
            self.state = next;
            self.waiting_ms = 0;
        }
    }

    fn next_nonce(&mut self) -> u8 {
        self.nonce = self.nonce.wrapping_add(1);
        self.nonce
    }

    /// Ask the server for an address
    ///
    /// Only valid while unaddressed. Returns REQUEST_ADDRESS for 0x01.
    pub fn request_address(&mut self) -> Result<CommandFrame, ClientError> {
        if self.state != ClientState::Unaddressed {
            return Err(ClientError::InvalidState(self.state));
        }
        let frame = Message::RequestAddress.to_frame()?;
        self.enter(self.state.transition(ClientInput::RequestSent));
        debug!("requesting address");
        Ok(frame)
    }

    /// Give up the address this device holds
    ///
    /// Only valid while addressed. The device keeps answering at its
    /// address, with the yield response, until the server confirms.
    pub fn release_own_address(&mut self) -> Result<CommandFrame, ClientError> {
        let own = match self.state {
            ClientState::Addressed(own) => own,
            other => return Err(ClientError::InvalidState(other)),
        };
        let dispute_byte = self.next_nonce();
        let frame = Message::ReleaseRequest {
            address: own,
            dispute_byte,
        }
        .to_frame()?;
        self.enter(self.state.transition(ClientInput::ReleaseSent));
        debug!("releasing {}", own);
        Ok(frame)
    }

    /// Try to take over `candidate` by asking the server to release it
    ///
    /// Used when normal allocation is not possible. If the current holder
    /// is gone the server frees the address and it becomes ours.
    pub fn probe_address(&mut self, candidate: Address) -> Result<CommandFrame, ClientError> {
        if self.state != ClientState::Unaddressed {
            return Err(ClientError::InvalidState(self.state));
        }
        if !candidate.is_allocable() {
            return Err(ClientError::NotAllocable(candidate));
        }
        let dispute_byte = self.next_nonce();
        let frame = Message::ReleaseRequest {
            address: candidate,
            dispute_byte,
        }
        .to_frame()?;
        self.enter(self.state.transition(ClientInput::ProbeSent(candidate)));
        debug!("probing {}", candidate);
        Ok(frame)
    }

    /// Abandon any pending request
    ///
    /// Safe at any time; does nothing outside the pending states.
    pub fn cancel(&mut self) {
        self.enter(self.state.transition(ClientInput::Cancelled));
    }

    /// Advance the reply timer
    ///
    /// Returns `TimedOut` once a pending request has waited for the
    /// configured reply timeout.
    pub fn update_time(&mut self, delta_ms: u32) -> Option<ClientEvent> {
        if !self.state.is_pending() {
            return None;
        }
        self.waiting_ms = self.waiting_ms.saturating_add(delta_ms);
        if self.waiting_ms < self.config.reply_timeout_ms {
            return None;
        }

        let abandoned = self.state;
        warn!("no reply from server in {}", abandoned);
        self.cancel();
        Some(ClientEvent::TimedOut(abandoned))
    }

    /// Process a broadcast from the server
    pub fn handle_message(&mut self, message: &Message) -> Option<ClientEvent> {
        let input = ClientInput::from_message(message)?;
        let before = self.state;
        let after = before.transition(input);
        if after == before {
            return None;
        }
        self.enter(after);

        let event = match (before, after) {
            (_, ClientState::Addressed(address)) => ClientEvent::Addressed(address),
            (ClientState::Requesting, _) => ClientEvent::NoRoom,
            (ClientState::Probing(candidate), _) => ClientEvent::ProbeDisputed(candidate),
            (ClientState::Releasing(own), _) if input == ClientInput::Disputed(own) => {
                warn!("release of {} disputed by another holder", own);
                ClientEvent::ReleaseDisputed(own)
            }
            (ClientState::Releasing(own), _) => ClientEvent::Released(own),
            (ClientState::Addressed(own), _) => ClientEvent::Revoked(own),
            // Unaddressed never changes on a broadcast
            (ClientState::Unaddressed, _) => return None,
        };
        info!("client event {}", event);
        Some(event)
    }

    /// Answer a liveness challenge sent to our address
    ///
    /// A holder answers the expected response, a releasing holder the
    /// yield response. Without an address there is nothing to answer.
    pub fn answer_challenge(&self, nonce: u8) -> Option<u8> {
        let key = self.config.challenge_key;
        match self.state {
            ClientState::Addressed(own) => Some(expected_response(key, own, nonce)),
            ClientState::Releasing(own) => Some(yield_response(key, own, nonce)),
            _ => None,
        }
    }
}
