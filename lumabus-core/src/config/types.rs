//! Configuration type definitions
//!
//! Server and device settings. None of these change at runtime; group
//! membership in particular is static and never negotiated on the bus.

use lumabus_protocol::{Address, GroupId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default time a client waits for the server's broadcast reply
pub const DEFAULT_REPLY_TIMEOUT_MS: u32 = 250;

/// Default bus-wide key mixed into liveness challenges
pub const DEFAULT_CHALLENGE_KEY: u8 = 0x4C;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pool bounds include a reserved address or are reversed
    InvalidPool,
    /// Reply timeout of zero would abandon every request immediately
    ZeroTimeout,
    /// Stored blob does not start with the config magic
    BadMagic,
    /// Stored blob written by an incompatible version
    VersionMismatch,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
}

/// Address server configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServerConfig {
    /// Lowest address handed out
    pub first_address: Address,
    /// Highest address handed out
    pub last_address: Address,
    /// Key mixed into liveness challenges; must match the clients'
    pub challenge_key: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Full allocable range with the default challenge key
    pub const fn new() -> Self {
        Self {
            first_address: Address::FIRST_ALLOCABLE,
            last_address: Address::LAST_ALLOCABLE,
            challenge_key: DEFAULT_CHALLENGE_KEY,
        }
    }

    /// Restrict the pool to `first..=last`
    pub const fn with_pool(mut self, first: Address, last: Address) -> Self {
        self.first_address = first;
        self.last_address = last;
        self
    }

    /// Use a different challenge key
    pub const fn with_challenge_key(mut self, key: u8) -> Self {
        self.challenge_key = key;
        self
    }

    /// Check the pool stays inside the allocable range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.first_address.is_allocable() || self.first_address > self.last_address {
            return Err(ConfigError::InvalidPool);
        }
        Ok(())
    }

    /// Number of addresses in the pool
    pub fn pool_size(&self) -> usize {
        (self.last_address.as_u8() - self.first_address.as_u8()) as usize + 1
    }
}

/// Address client configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClientConfig {
    /// Give up waiting for a server reply after this long
    pub reply_timeout_ms: u32,
    /// Key mixed into liveness challenges; must match the server's
    pub challenge_key: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
            challenge_key: DEFAULT_CHALLENGE_KEY,
        }
    }
}

impl ClientConfig {
    /// Validate the client settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reply_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Phase synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncConfig {
    /// Group this device belongs to, if any
    pub group: Option<GroupId>,
}

/// Complete configuration of an LED device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceConfig {
    /// Addressing behavior
    pub client: ClientConfig,
    /// Synchronization behavior
    pub sync: SyncConfig,
}

impl DeviceConfig {
    /// Device in `group` with default client settings
    pub fn in_group(group: GroupId) -> Self {
        Self {
            client: ClientConfig::default(),
            sync: SyncConfig { group: Some(group) },
        }
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()
    }
}
