//! Message types for the Lumabus protocol
//!
//! Command identifiers fall into two families:
//! - 0xA0..=0xAE: dynamic address allocation (server at 0x01)
//! - 0x20..=0x2B: LED control and phase synchronization

use crate::address::{Address, GroupId, Phase};
use crate::frame::{CommandFrame, FrameError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Command IDs: address allocation
pub const CMD_REQUEST_ADDRESS: u8 = 0xA0;
pub const CMD_ADDRESS_ALLOCATION: u8 = 0xA1;
pub const CMD_NO_ROOM_ON_BUS: u8 = 0xA2;
pub const CMD_RELEASE_REQUEST: u8 = 0xA9;
pub const CMD_RELEASE_ACKNOWLEDGE: u8 = 0xAA;
pub const CMD_RELEASE_DISPUTED: u8 = 0xAB;
pub const CMD_RELEASE_FORCE: u8 = 0xAC;
pub const CMD_RELEASE_NOT_ALLOCATED: u8 = 0xAD;
pub const CMD_ADDRESS_CHALLENGE: u8 = 0xAE;

// Command IDs: LED control
pub const CMD_LED_WRITE_WORD: u8 = 0x20;
pub const CMD_LED_SET_PATTERN: u8 = 0x21;
pub const CMD_LED_INCLUDE_DEVICE: u8 = 0x26;
pub const CMD_LED_EXCLUDE_DEVICE: u8 = 0x27;
pub const CMD_LED_INCLUDE_GROUP: u8 = 0x28;
pub const CMD_LED_EXCLUDE_GROUP: u8 = 0x29;
pub const CMD_LED_INCLUSIVE_SYNCHRONIZE: u8 = 0x2A;
pub const CMD_LED_EXCLUSIVE_SYNCHRONIZE: u8 = 0x2B;

/// Which addresses a command may be delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// The address server (0x01) only
    Server,
    /// General-call (0x00) only
    Broadcast,
    /// Any explicit address, never general-call
    Device,
    /// Anywhere, including general-call
    Any,
}

impl Target {
    /// Check whether a frame delivered to `address` respects this rule
    pub fn accepts(self, address: Address) -> bool {
        match self {
            Target::Server => address.is_server(),
            Target::Broadcast => address.is_broadcast(),
            Target::Device => !address.is_broadcast(),
            Target::Any => true,
        }
    }
}

/// RGB channel addressed by LED_WRITE_WORD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// Parse a channel from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Channel::Red),
            1 => Some(Channel::Green),
            2 => Some(Channel::Blue),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// Every command understood on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// Ask the server for an address
    RequestAddress,
    /// The most recent requester now owns this address
    AddressAllocation(Address),
    /// The most recent requester could not be given an address
    NoRoomOnBus,
    /// Release (or probe) an address; `dispute_byte` is the challenge nonce
    ReleaseRequest { address: Address, dispute_byte: u8 },
    /// Address released by its holder and free again
    ReleaseAcknowledge(Address),
    /// A live holder still claims the address
    ReleaseDisputed(Address),
    /// Server reclaimed an unresponsive holder's address
    ReleaseForce(Address),
    /// Server has no record of a holder
    ReleaseNotAllocated(Address),
    /// Liveness challenge to a holder; answered with one read-back byte
    AddressChallenge { nonce: u8 },
    /// Write a 16-bit value to one RGB channel
    LedWriteWord { channel: Channel, value: u16 },
    /// Select the waveform pattern
    LedSetPattern(u8),
    /// Jump to `phase` at the next synchronize
    LedIncludeDevice { phase: Phase },
    /// Ignore the next inclusive synchronize
    LedExcludeDevice,
    /// As `LedIncludeDevice`, for every member of `group`
    LedIncludeGroup { group: GroupId, phase: Phase },
    /// As `LedExcludeDevice`, for every member of `group`
    LedExcludeGroup { group: GroupId },
    /// Every device not excluded jumps to `phase` (or its include phase)
    LedInclusiveSynchronize { phase: Phase },
    /// Only included devices jump, each to its include phase
    LedExclusiveSynchronize,
}

fn address_arg(frame: &CommandFrame) -> Result<Address, FrameError> {
    let args = frame.expect_args(1)?;
    Address::new(args[0]).ok_or(FrameError::InvalidAddress(args[0]))
}

impl Message {
    /// Command identifier byte
    pub fn command(&self) -> u8 {
        match self {
            Message::RequestAddress => CMD_REQUEST_ADDRESS,
            Message::AddressAllocation(_) => CMD_ADDRESS_ALLOCATION,
            Message::NoRoomOnBus => CMD_NO_ROOM_ON_BUS,
            Message::ReleaseRequest { .. } => CMD_RELEASE_REQUEST,
            Message::ReleaseAcknowledge(_) => CMD_RELEASE_ACKNOWLEDGE,
            Message::ReleaseDisputed(_) => CMD_RELEASE_DISPUTED,
            Message::ReleaseForce(_) => CMD_RELEASE_FORCE,
            Message::ReleaseNotAllocated(_) => CMD_RELEASE_NOT_ALLOCATED,
            Message::AddressChallenge { .. } => CMD_ADDRESS_CHALLENGE,
            Message::LedWriteWord { .. } => CMD_LED_WRITE_WORD,
            Message::LedSetPattern(_) => CMD_LED_SET_PATTERN,
            Message::LedIncludeDevice { .. } => CMD_LED_INCLUDE_DEVICE,
            Message::LedExcludeDevice => CMD_LED_EXCLUDE_DEVICE,
            Message::LedIncludeGroup { .. } => CMD_LED_INCLUDE_GROUP,
            Message::LedExcludeGroup { .. } => CMD_LED_EXCLUDE_GROUP,
            Message::LedInclusiveSynchronize { .. } => CMD_LED_INCLUSIVE_SYNCHRONIZE,
            Message::LedExclusiveSynchronize => CMD_LED_EXCLUSIVE_SYNCHRONIZE,
        }
    }

    /// Addressing rule for this command
    pub fn target(&self) -> Target {
        match self {
            Message::RequestAddress | Message::ReleaseRequest { .. } => Target::Server,
            Message::AddressAllocation(_)
            | Message::NoRoomOnBus
            | Message::ReleaseAcknowledge(_)
            | Message::ReleaseDisputed(_)
            | Message::ReleaseForce(_)
            | Message::ReleaseNotAllocated(_)
            | Message::LedIncludeGroup { .. }
            | Message::LedExcludeGroup { .. }
            | Message::LedInclusiveSynchronize { .. }
            | Message::LedExclusiveSynchronize => Target::Broadcast,
            Message::AddressChallenge { .. }
            | Message::LedIncludeDevice { .. }
            | Message::LedExcludeDevice => Target::Device,
            Message::LedWriteWord { .. } | Message::LedSetPattern(_) => Target::Any,
        }
    }

    /// Parse a message from a received frame
    ///
    /// Fails on unknown commands, wrong argument counts, out-of-range
    /// arguments and commands delivered to an address they may not use.
    pub fn from_frame(frame: &CommandFrame) -> Result<Self, FrameError> {
        let message = match frame.command() {
            CMD_REQUEST_ADDRESS => {
                frame.expect_args(0)?;
                Message::RequestAddress
            }
            CMD_ADDRESS_ALLOCATION => Message::AddressAllocation(address_arg(frame)?),
            CMD_NO_ROOM_ON_BUS => {
                frame.expect_args(0)?;
                Message::NoRoomOnBus
            }
            CMD_RELEASE_REQUEST => {
                let (raw, dispute_byte) = match *frame.args() {
                    [raw] => (raw, 0),
                    [raw, dispute_byte] => (raw, dispute_byte),
                    _ => return Err(FrameError::BadLength),
                };
                let address = Address::new(raw).ok_or(FrameError::InvalidAddress(raw))?;
                Message::ReleaseRequest {
                    address,
                    dispute_byte,
                }
            }
            CMD_RELEASE_ACKNOWLEDGE => Message::ReleaseAcknowledge(address_arg(frame)?),
            CMD_RELEASE_DISPUTED => Message::ReleaseDisputed(address_arg(frame)?),
            CMD_RELEASE_FORCE => Message::ReleaseForce(address_arg(frame)?),
            CMD_RELEASE_NOT_ALLOCATED => Message::ReleaseNotAllocated(address_arg(frame)?),
            CMD_ADDRESS_CHALLENGE => Message::AddressChallenge {
                nonce: frame.expect_args(1)?[0],
            },
            CMD_LED_WRITE_WORD => {
                let args = frame.expect_args(3)?;
                let channel =
                    Channel::from_byte(args[0]).ok_or(FrameError::InvalidChannel(args[0]))?;
                Message::LedWriteWord {
                    channel,
                    value: u16::from_le_bytes([args[1], args[2]]),
                }
            }
            CMD_LED_SET_PATTERN => Message::LedSetPattern(frame.expect_args(1)?[0]),
            CMD_LED_INCLUDE_DEVICE => Message::LedIncludeDevice {
                phase: frame.expect_args(1)?[0],
            },
            CMD_LED_EXCLUDE_DEVICE => {
                frame.expect_args(0)?;
                Message::LedExcludeDevice
            }
            CMD_LED_INCLUDE_GROUP => {
                let args = frame.expect_args(2)?;
                Message::LedIncludeGroup {
                    group: GroupId(args[0]),
                    phase: args[1],
                }
            }
            CMD_LED_EXCLUDE_GROUP => Message::LedExcludeGroup {
                group: GroupId(frame.expect_args(1)?[0]),
            },
            CMD_LED_INCLUSIVE_SYNCHRONIZE => Message::LedInclusiveSynchronize {
                phase: frame.expect_args(1)?[0],
            },
            CMD_LED_EXCLUSIVE_SYNCHRONIZE => {
                frame.expect_args(0)?;
                Message::LedExclusiveSynchronize
            }
            other => return Err(FrameError::UnknownCommand(other)),
        };

        if !message.target().accepts(frame.target()) {
            return Err(FrameError::WrongTarget);
        }
        Ok(message)
    }

    /// Encode a server- or broadcast-bound message into a frame
    ///
    /// Messages without a fixed destination (`Target::Device`) need
    /// [`Message::to_frame_at`]; `Target::Any` messages go out as
    /// general-call.
    pub fn to_frame(&self) -> Result<CommandFrame, FrameError> {
        match self.target() {
            Target::Server => Ok(self.frame_unchecked(Address::SERVER)),
            Target::Broadcast | Target::Any => Ok(self.frame_unchecked(Address::BROADCAST)),
            Target::Device => Err(FrameError::WrongTarget),
        }
    }

    /// Encode this message into a frame for an explicit destination
    pub fn to_frame_at(&self, to: Address) -> Result<CommandFrame, FrameError> {
        if !self.target().accepts(to) {
            return Err(FrameError::WrongTarget);
        }
        Ok(self.frame_unchecked(to))
    }

    fn frame_unchecked(&self, to: Address) -> CommandFrame {
        let command = self.command();
        match *self {
            Message::RequestAddress
            | Message::NoRoomOnBus
            | Message::LedExcludeDevice
            | Message::LedExclusiveSynchronize => CommandFrame::bare(to, command),
            Message::AddressAllocation(address)
            | Message::ReleaseAcknowledge(address)
            | Message::ReleaseDisputed(address)
            | Message::ReleaseForce(address)
            | Message::ReleaseNotAllocated(address) => {
                CommandFrame::from_parts(to, command, &[address.as_u8()])
            }
            // A zero nonce is sent as the plain one-byte form
            Message::ReleaseRequest {
                address,
                dispute_byte: 0,
            } => CommandFrame::from_parts(to, command, &[address.as_u8()]),
            Message::ReleaseRequest {
                address,
                dispute_byte,
            } => CommandFrame::from_parts(to, command, &[address.as_u8(), dispute_byte]),
            Message::AddressChallenge { nonce: byte }
            | Message::LedSetPattern(byte)
            | Message::LedIncludeDevice { phase: byte }
            | Message::LedExcludeGroup {
                group: GroupId(byte),
            }
            | Message::LedInclusiveSynchronize { phase: byte } => {
                CommandFrame::from_parts(to, command, &[byte])
            }
            Message::LedWriteWord { channel, value } => {
                let [low, high] = value.to_le_bytes();
                CommandFrame::from_parts(to, command, &[channel.to_byte(), low, high])
            }
            Message::LedIncludeGroup { group, phase } => {
                CommandFrame::from_parts(to, command, &[group.0, phase])
            }
        }
    }
}
