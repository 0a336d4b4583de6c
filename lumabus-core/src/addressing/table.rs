//! Server-side allocation table

use heapless::Vec;
use lumabus_protocol::Address;

use crate::config::{ConfigError, ServerConfig};

/// Largest possible pool (0x02..=0x7F)
pub const MAX_POOL_SIZE: usize = 126;

/// Allocation state of one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocationState {
    /// Nobody holds the address
    #[default]
    Free,
    /// Granted to a device
    Allocated,
    /// A release probe found a live holder; reverts to `Allocated`
    Disputed,
}

/// One row of the allocation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AllocationRecord {
    pub address: Address,
    pub state: AllocationState,
}

/// Allocation state for every address in the server's pool
///
/// Addresses outside the pool (including 0x00 and 0x01) have no record.
#[derive(Debug, Clone)]
pub struct AllocationTable {
    first: Address,
    states: Vec<AllocationState, MAX_POOL_SIZE>,
}

impl Default for AllocationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationTable {
    /// Table covering the full allocable range, all free
    pub fn new() -> Self {
        let states = core::iter::repeat(AllocationState::Free)
            .take(MAX_POOL_SIZE)
            .collect();
        Self {
            first: Address::FIRST_ALLOCABLE,
            states,
        }
    }

    /// Table covering the configured pool, all free
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut states = Vec::new();
        states
            .resize_default(config.pool_size())
            .map_err(|_| ConfigError::InvalidPool)?;
        Ok(Self {
            first: config.first_address,
            states,
        })
    }

    fn index(&self, address: Address) -> Option<usize> {
        let offset = address.as_u8().checked_sub(self.first.as_u8())? as usize;
        (offset < self.states.len()).then_some(offset)
    }

    fn address_at(&self, index: usize) -> Option<Address> {
        Address::new(self.first.as_u8() + index as u8)
    }

    /// State of `address`, or `None` if it is not in the pool
    pub fn get(&self, address: Address) -> Option<AllocationState> {
        self.index(address).map(|i| self.states[i])
    }

    /// Record for `address`, or `None` if it is not in the pool
    pub fn record(&self, address: Address) -> Option<AllocationRecord> {
        self.get(address)
            .map(|state| AllocationRecord { address, state })
    }

    /// Set the state of `address`
    ///
    /// Returns `false` if the address is not in the pool.
    pub fn set(&mut self, address: Address, state: AllocationState) -> bool {
        match self.index(address) {
            Some(i) => {
                self.states[i] = state;
                true
            }
            None => false,
        }
    }

    /// Lowest free address, if any
    pub fn lowest_free(&self) -> Option<Address> {
        let index = self
            .states
            .iter()
            .position(|s| *s == AllocationState::Free)?;
        self.address_at(index)
    }

    /// Mark the lowest free address allocated and return it
    pub fn allocate_lowest(&mut self) -> Option<Address> {
        let address = self.lowest_free()?;
        self.set(address, AllocationState::Allocated);
        Some(address)
    }

    /// Number of free addresses
    pub fn free_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == AllocationState::Free)
            .count()
    }

    /// Number of addresses in the pool
    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    /// Iterate over every record in address order
    pub fn records(&self) -> impl Iterator<Item = AllocationRecord> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(move |(i, &state)| {
                self.address_at(i)
                    .map(|address| AllocationRecord { address, state })
            })
    }
}
