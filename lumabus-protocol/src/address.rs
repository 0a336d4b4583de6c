//! Bus addresses and the small identifiers carried in LED commands

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position within a device's waveform cycle
pub type Phase = u8;

/// 7-bit bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address(u8);

impl Address {
    /// General-call address, delivered to every device
    pub const BROADCAST: Self = Self(0x00);
    /// The address server
    pub const SERVER: Self = Self(0x01);
    /// Lowest address the server may hand out
    pub const FIRST_ALLOCABLE: Self = Self(0x02);
    /// Highest 7-bit address
    pub const LAST_ALLOCABLE: Self = Self(0x7F);

    /// Create an address from a raw byte
    ///
    /// Returns `None` for values outside the 7-bit range.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= Self::LAST_ALLOCABLE.0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Raw byte value
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Check if this is the general-call address
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    /// Check if this is the address server's address
    pub const fn is_server(self) -> bool {
        self.0 == Self::SERVER.0
    }

    /// Check if the server may hand this address to a device
    pub const fn is_allocable(self) -> bool {
        self.0 >= Self::FIRST_ALLOCABLE.0
    }
}

impl TryFrom<u8> for Address {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        Self::new(raw).ok_or(raw)
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> u8 {
        address.0
    }
}

/// Static group identifier used by the group include/exclude commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupId(pub u8);
