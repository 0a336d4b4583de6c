//! LED device node
//!
//! Ties an address client, a sync controller and the LED driver to the
//! bus. The transport hands every frame it sees to [`Device::on_frame`];
//! the device keeps frames meant for 0x00 or its own address and ignores
//! the rest.

use lumabus_protocol::{Address, CommandFrame, Message};

use crate::addressing::{AddressClient, ClientError, ClientEvent};
use crate::config::{ConfigError, DeviceConfig};
use crate::sync::{SyncController, SyncOutcome};
use crate::traits::{LedChannels, WaveformGenerator};

/// What the device wants the transport to do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outbound {
    /// Put this frame on the bus
    Send(CommandFrame),
    /// Return this byte to the master's read
    Reply(u8),
}

/// One LED device on the bus
pub struct Device<L> {
    client: AddressClient,
    sync: SyncController,
    led: L,
    last_event: Option<ClientEvent>,
    last_sync: Option<SyncOutcome>,
}

impl<L: WaveformGenerator + LedChannels> Device<L> {
    /// Create an unaddressed device driving `led`
    pub fn new(config: DeviceConfig, led: L) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client: AddressClient::new(config.client),
            sync: SyncController::new(config.sync),
            led,
            last_event: None,
            last_sync: None,
        })
    }

    /// Address client
    pub fn client(&self) -> &AddressClient {
        &self.client
    }

    /// Sync controller
    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    /// LED driver
    pub fn led(&self) -> &L {
        &self.led
    }

    /// LED driver, mutably
    pub fn led_mut(&mut self) -> &mut L {
        &mut self.led
    }

    /// Take the last addressing event, if one happened since the last call
    pub fn take_event(&mut self) -> Option<ClientEvent> {
        self.last_event.take()
    }

    /// Outcome of the last synchronize broadcast
    pub fn last_sync(&self) -> Option<SyncOutcome> {
        self.last_sync
    }

    /// Start address negotiation
    pub fn request_address(&mut self) -> Result<Outbound, ClientError> {
        self.client.request_address().map(Outbound::Send)
    }

    /// Start releasing the held address
    pub fn release_own_address(&mut self) -> Result<Outbound, ClientError> {
        self.client.release_own_address().map(Outbound::Send)
    }

    /// Try to reclaim a specific address
    pub fn probe_address(&mut self, candidate: Address) -> Result<Outbound, ClientError> {
        self.client.probe_address(candidate).map(Outbound::Send)
    }

    /// Abandon any pending addressing request
    pub fn cancel(&mut self) {
        self.client.cancel();
    }

    /// Advance the client's reply timer
    pub fn update_time(&mut self, delta_ms: u32) -> Option<ClientEvent> {
        let event = self.client.update_time(delta_ms);
        if event.is_some() {
            self.last_event = event;
        }
        event
    }

    fn accepts(&self, frame: &CommandFrame) -> bool {
        frame.is_broadcast() || self.client.address() == Some(frame.target())
    }

    /// Handle one frame seen on the bus
    pub fn on_frame(&mut self, frame: &CommandFrame) -> Option<Outbound> {
        if !self.accepts(frame) {
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
            Message::AddressAllocation(_)
            | Message::NoRoomOnBus
            | Message::ReleaseAcknowledge(_)
            | Message::ReleaseDisputed(_)
            | Message::ReleaseForce(_)
            | Message::ReleaseNotAllocated(_) => self.on_addressing(&message),
            Message::AddressChallenge { nonce } => {
                self.client.answer_challenge(nonce).map(Outbound::Reply)
            }
            Message::LedWriteWord { channel, value } => {
                self.led.write_channel(channel, value);
                None
            }
            Message::LedSetPattern(pattern) => {
                self.led.set_pattern(pattern);
                None
            }
            Message::LedIncludeDevice { phase } => {
                self.sync.include(phase);
                None
            }
            Message::LedExcludeDevice => {
                self.sync.exclude();
                None
            }
            Message::LedIncludeGroup { group, phase } => {
                self.sync.include_group(group, phase);
                None
            }
            Message::LedExcludeGroup { group } => {
                self.sync.exclude_group(group);
                None
            }
            Message::LedInclusiveSynchronize { phase } => {
                self.last_sync = Some(self.sync.inclusive_synchronize(phase, &mut self.led));
                None
            }
            Message::LedExclusiveSynchronize => {
                self.last_sync = Some(self.sync.exclusive_synchronize(&mut self.led));
                None
            }
            // Server-bound; never delivered to a device address
            Message::RequestAddress | Message::ReleaseRequest { .. } => None,
        }
    }

    fn on_addressing(&mut self, message: &Message) -> Option<Outbound> {
        if let Some(event) = self.client.handle_message(message) {
            self.last_event = Some(event);
        }
        None
    }
}
