//! Address server
//!
//! The single device at 0x01. It owns the allocation table, grants the
//! lowest free address to each requester and arbitrates release requests
//! by challenging the current holder. All replies are broadcast, so the
//! server never needs to know who sent a request.

use lumabus_hal::I2cBus;
use lumabus_protocol::messages::CMD_ADDRESS_ALLOCATION;
use lumabus_protocol::{Address, CommandFrame, Message};

use super::challenge::{judge, Verdict};
use super::table::{AllocationState, AllocationTable};
use crate::config::{ConfigError, ServerConfig};
use crate::traits::{BusLivenessProbe, LivenessProbe};

/// Result of an address request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Negotiation {
    /// Lowest free address granted
    Granted(Address),
    /// Pool exhausted
    NoRoom,
}

impl Negotiation {
    /// Whether an address was handed out
    pub fn is_success(&self) -> bool {
        matches!(self, Negotiation::Granted(_))
    }

    /// Broadcast announcing the result
    pub fn message(&self) -> Message {
        match *self {
            Negotiation::Granted(address) => Message::AddressAllocation(address),
            Negotiation::NoRoom => Message::NoRoomOnBus,
        }
    }
}

/// Result of a release request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReleaseOutcome {
    /// Holder confirmed the release; address free
    Acknowledged(Address),
    /// Live holder still claims the address; nothing changed
    Disputed(Address),
    /// Holder did not answer the challenge; address reclaimed
    Forced(Address),
    /// No holder on record
    NotAllocated(Address),
}

impl ReleaseOutcome {
    /// Whether the request freed an address
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ReleaseOutcome::Acknowledged(_) | ReleaseOutcome::Forced(_)
        )
    }

    /// Broadcast announcing the result
    pub fn message(&self) -> Message {
        match *self {
            ReleaseOutcome::Acknowledged(address) => Message::ReleaseAcknowledge(address),
            ReleaseOutcome::Disputed(address) => Message::ReleaseDisputed(address),
            ReleaseOutcome::Forced(address) => Message::ReleaseForce(address),
            ReleaseOutcome::NotAllocated(address) => Message::ReleaseNotAllocated(address),
        }
    }
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServerStats {
    pub grants: u32,
    pub no_room: u32,
    pub acknowledged: u32,
    pub disputed: u32,
    pub forced: u32,
    pub not_allocated: u32,
    /// Free-marked candidates skipped because someone still answers there
    pub in_use: u32,
}

/// Address server state
///
/// One instance per bus. A second server is an operator error the
/// protocol does not detect.
#[derive(Debug, Clone)]
pub struct AddressServer {
    table: AllocationTable,
    challenge_key: u8,
    stats: ServerStats,
    /// Rolling nonce for challenges the server starts itself
    nonce: u8,
}

impl AddressServer {
    /// Create a server with every pool address free
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigError> {
        let table = AllocationTable::from_config(config)?;
        info!(
            "address server up, pool {}..={}",
            config.first_address,
            config.last_address
        );
        Ok(Self::with_table(table, config.challenge_key))
    }

    /// Create a server around an existing table
    pub fn with_table(table: AllocationTable, challenge_key: u8) -> Self {
        Self {
            table,
            challenge_key,
            stats: ServerStats::default(),
            nonce: 0,
        }
    }

    /// Current allocation table
    pub fn table(&self) -> &AllocationTable {
        &self.table
    }

    /// Diagnostic counters
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Handle REQUEST_ADDRESS
    ///
    /// Grants the lowest free address nobody answers for. Each candidate
    /// is challenged first: a device may still sit on an address the table
    /// lost track of, such as the previous holder of a reclaimed address.
    /// A candidate that answers stays allocated and the next one is tried.
    /// The answer goes to whoever asked last, which on a single-master bus
    /// is the sender of this request.
    pub fn handle_address_negotiation<P: LivenessProbe>(&mut self, probe: &mut P) -> Negotiation {
        while let Some(candidate) = self.table.allocate_lowest() {
            self.nonce = self.nonce.wrapping_add(1);
            let answer = probe.challenge(candidate, self.nonce);
            match judge(self.challenge_key, candidate, self.nonce, answer) {
                Verdict::Live | Verdict::Yielded => {
                    self.stats.in_use += 1;
                    warn!("{} marked free but still answers, skipping", candidate);
                }
                Verdict::Stale => {
                    self.stats.grants += 1;
                    info!("granted {}", candidate);
                    return Negotiation::Granted(candidate);
                }
            }
        }

        self.stats.no_room += 1;
        warn!("no room on bus");
        Negotiation::NoRoom
    }

    /// Handle RELEASE_REQUEST(slave_address, dispute_byte)
    ///
    /// Challenges the current holder with `dispute_byte` as nonce. A
    /// correct answer keeps the grant; the yield answer frees it as an
    /// acknowledged release; silence or a wrong answer reclaims it.
    pub fn handle_address_release<P: LivenessProbe>(
        &mut self,
        slave_address: Address,
        dispute_byte: u8,
        probe: &mut P,
    ) -> ReleaseOutcome {
        match self.table.get(slave_address) {
            None | Some(AllocationState::Free) => {
                self.stats.not_allocated += 1;
                debug!("release of {}: not allocated", slave_address);
                return ReleaseOutcome::NotAllocated(slave_address);
            }
            Some(AllocationState::Allocated) | Some(AllocationState::Disputed) => {}
        }

        let answer = probe.challenge(slave_address, dispute_byte);
        match judge(self.challenge_key, slave_address, dispute_byte, answer) {
            Verdict::Live => {
                // The probe fails and the grant stands.
                self.table.set(slave_address, AllocationState::Disputed);
                self.stats.disputed += 1;
                info!("release of {} disputed by live holder", slave_address);
                self.table.set(slave_address, AllocationState::Allocated);
                ReleaseOutcome::Disputed(slave_address)
            }
            Verdict::Yielded => {
                self.table.set(slave_address, AllocationState::Free);
                self.stats.acknowledged += 1;
                info!("released {}", slave_address);
                ReleaseOutcome::Acknowledged(slave_address)
            }
            Verdict::Stale => {
                self.table.set(slave_address, AllocationState::Free);
                self.stats.forced += 1;
                warn!("reclaimed {} from unresponsive holder", slave_address);
                ReleaseOutcome::Forced(slave_address)
            }
        }
    }

    /// ADDRESS_ALLOCATION broadcast for `allocated_address`
    pub fn do_address_response(allocated_address: Address) -> CommandFrame {
        CommandFrame::with_arg(
            Address::BROADCAST,
            CMD_ADDRESS_ALLOCATION,
            allocated_address.as_u8(),
        )
    }

    /// React to one frame delivered on the bus
    ///
    /// Only frames addressed to 0x01 are considered. Returns the
    /// broadcast to send, if any.
    pub fn on_frame<P: LivenessProbe>(
        &mut self,
        frame: &CommandFrame,
        probe: &mut P,
    ) -> Option<CommandFrame> {
        if !frame.target().is_server() {
            return None;
        }

        let message = match Message::from_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                trace!("dropping frame {}: {}", frame.command(), e);
                return None;
            }
        };

        match message {
            Message::RequestAddress => match self.handle_address_negotiation(probe) {
                Negotiation::Granted(address) => Some(Self::do_address_response(address)),
                Negotiation::NoRoom => Message::NoRoomOnBus.to_frame().ok(),
            },
            Message::ReleaseRequest {
                address,
                dispute_byte,
            } => self
                .handle_address_release(address, dispute_byte, probe)
                .message()
                .to_frame()
                .ok(),
            _ => None,
        }
    }

    /// Handle one frame and put the reply on `bus`
    ///
    /// Liveness challenges go out over the same bus before the reply.
    pub fn serve<B: I2cBus>(&mut self, frame: &CommandFrame, bus: &mut B) -> Result<(), B::Error> {
        let reply = self.on_frame(frame, &mut BusLivenessProbe::new(bus));
        match reply {
            Some(reply) => bus.write(reply.target().as_u8(), reply.bytes()),
            None => Ok(()),
        }
    }
}
