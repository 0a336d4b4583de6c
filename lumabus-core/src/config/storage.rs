//! Device configuration blob
//!
//! Stores a [`DeviceConfig`] as postcard binary data behind a small
//! header, so a device can keep its group and timing settings in flash.

use serde::{Deserialize, Serialize};

use super::types::{ConfigError, DeviceConfig};

/// Magic number to identify a stored device configuration
pub const DEVICE_CONFIG_MAGIC: u32 = 0x4C554D42; // "LUMB"

/// Current device configuration format version
pub const DEVICE_CONFIG_VERSION: u8 = 1;

/// Upper bound on the encoded size of [`StoredDeviceConfig`]
pub const MAX_STORED_CONFIG_SIZE: usize = 32;

/// Device configuration as written to flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDeviceConfig {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// The configuration itself
    pub config: DeviceConfig,
}

impl StoredDeviceConfig {
    /// Wrap a configuration with the current header
    pub const fn new(config: DeviceConfig) -> Self {
        Self {
            magic: DEVICE_CONFIG_MAGIC,
            version: DEVICE_CONFIG_VERSION,
            config,
        }
    }

    /// Serialize into `buffer`, returning the number of bytes used
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, ConfigError> {
        let used = postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)?;
        Ok(used.len())
    }

    /// Deserialize and check header and contents
    pub fn decode(bytes: &[u8]) -> Result<DeviceConfig, ConfigError> {
        let stored: StoredDeviceConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if stored.magic != DEVICE_CONFIG_MAGIC {
            return Err(ConfigError::BadMagic);
        }
        if stored.version != DEVICE_CONFIG_VERSION {
            warn!(
                "Config version mismatch: found {}, expected {}",
                stored.version,
                DEVICE_CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch);
        }

        stored.config.validate()?;
        Ok(stored.config)
    }
}
