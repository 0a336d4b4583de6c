//! Whole-bus scenarios
//!
//! A simulated bus delivers server-bound frames to the address server and
//! every other frame to every powered device, the way general-call and
//! address matching behave on real hardware. Frames a node sends in
//! response are queued and delivered in order.

use std::collections::VecDeque;

use lumabus_core::addressing::{AllocationState, ClientEvent, ClientState};
use lumabus_core::config::{ClientConfig, DeviceConfig, ServerConfig};
use lumabus_core::traits::{LedChannels, LivenessProbe, WaveformGenerator};
use lumabus_core::{AddressServer, Device, Outbound, SyncOutcome};
use lumabus_protocol::{Address, Channel, CommandFrame, GroupId, Message, Phase};

#[derive(Default)]
struct SimLed {
    jumps: Vec<Phase>,
}

impl WaveformGenerator for SimLed {
    fn jump_to_phase(&mut self, phase: Phase) {
        self.jumps.push(phase);
    }

    fn set_pattern(&mut self, _pattern: u8) {}
}

impl LedChannels for SimLed {
    fn write_channel(&mut self, _channel: Channel, _value: u16) {}
}

struct Node {
    device: Device<SimLed>,
    powered: bool,
}

/// Challenges go to every powered device; the first reply wins the read
struct SimProbe<'a> {
    nodes: &'a mut [Node],
}

impl LivenessProbe for SimProbe<'_> {
    fn challenge(&mut self, holder: Address, nonce: u8) -> Option<u8> {
        let frame = Message::AddressChallenge { nonce }.to_frame_at(holder).ok()?;
        self.nodes
            .iter_mut()
            .filter(|node| node.powered)
            .find_map(|node| match node.device.on_frame(&frame) {
                Some(Outbound::Reply(byte)) => Some(byte),
                _ => None,
            })
    }
}

struct SimBus {
    server: AddressServer,
    nodes: Vec<Node>,
    /// Swallow the server's next reply
    drop_next_reply: bool,
    log: Vec<CommandFrame>,
}

impl SimBus {
    fn new(pool: (u8, u8), configs: &[DeviceConfig]) -> Self {
        let config = ServerConfig::new().with_pool(addr(pool.0), addr(pool.1));
        let nodes = configs
            .iter()
            .map(|config| Node {
                device: Device::new(*config, SimLed::default()).unwrap(),
                powered: true,
            })
            .collect();
        Self {
            server: AddressServer::new(&config).unwrap(),
            nodes,
            drop_next_reply: false,
            log: Vec::new(),
        }
    }

    fn with_devices(count: usize) -> Self {
        Self::new((2, 0x7F), &vec![DeviceConfig::default(); count])
    }

    fn device(&self, index: usize) -> &Device<SimLed> {
        &self.nodes[index].device
    }

    fn device_mut(&mut self, index: usize) -> &mut Device<SimLed> {
        &mut self.nodes[index].device
    }

    fn state(&self, index: usize) -> ClientState {
        self.device(index).client().state()
    }

    fn deliver(&mut self, outbound: Outbound) {
        let mut queue = VecDeque::new();
        if let Outbound::Send(frame) = outbound {
            queue.push_back(frame);
        }

        while let Some(frame) = queue.pop_front() {
            self.log.push(frame);
            if frame.target().is_server() {
                let mut probe = SimProbe {
                    nodes: &mut self.nodes,
                };
                let reply = self.server.on_frame(&frame, &mut probe);
                if let Some(reply) = reply {
                    if self.drop_next_reply {
                        self.drop_next_reply = false;
                    } else {
                        queue.push_back(reply);
                    }
                }
            } else {
                for node in self.nodes.iter_mut().filter(|node| node.powered) {
                    if let Some(Outbound::Send(next)) = node.device.on_frame(&frame) {
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    fn broadcast(&mut self, message: Message) {
        let frame = message.to_frame().unwrap();
        self.deliver(Outbound::Send(frame));
    }

    fn request(&mut self, index: usize) {
        let out = self.device_mut(index).request_address().unwrap();
        self.deliver(out);
    }

    fn release(&mut self, index: usize) {
        let out = self.device_mut(index).release_own_address().unwrap();
        self.deliver(out);
    }

    fn probe(&mut self, index: usize, candidate: u8) {
        let out = self.device_mut(index).probe_address(addr(candidate)).unwrap();
        self.deliver(out);
    }
}

fn addr(raw: u8) -> Address {
    Address::new(raw).unwrap()
}

#[test]
fn devices_get_distinct_addresses_in_order() {
    let mut bus = SimBus::with_devices(3);
    for i in 0..3 {
        bus.request(i);
    }

    assert_eq!(bus.state(0), ClientState::Addressed(addr(2)));
    assert_eq!(bus.state(1), ClientState::Addressed(addr(3)));
    assert_eq!(bus.state(2), ClientState::Addressed(addr(4)));
    assert_eq!(bus.server.stats().grants, 3);
}

#[test]
fn only_requester_adopts_grant() {
    let mut bus = SimBus::with_devices(3);
    bus.request(1);

    assert_eq!(bus.state(0), ClientState::Unaddressed);
    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));
    assert_eq!(bus.state(2), ClientState::Unaddressed);
}

#[test]
fn full_pool_reports_no_room() {
    let mut bus = SimBus::new((2, 3), &[DeviceConfig::default(); 3]);
    bus.request(0);
    bus.request(1);
    bus.request(2);

    assert_eq!(bus.state(2), ClientState::Unaddressed);
    assert_eq!(bus.device_mut(2).take_event(), Some(ClientEvent::NoRoom));
    assert_eq!(bus.server.stats().no_room, 1);
}

#[test]
fn release_then_reuse_lowest_hole() {
    let mut bus = SimBus::with_devices(4);
    for i in 0..3 {
        bus.request(i);
    }

    bus.release(1);
    assert_eq!(bus.state(1), ClientState::Unaddressed);
    assert_eq!(bus.device_mut(1).take_event(), Some(ClientEvent::Released(addr(3))));
    assert_eq!(bus.server.stats().acknowledged, 1);

    bus.request(3);
    assert_eq!(bus.state(3), ClientState::Addressed(addr(3)));
}

#[test]
fn lost_grant_times_out_and_leaked_address_is_reclaimed() {
    let mut bus = SimBus::with_devices(2);

    // Grant of 0x02 never arrives
    bus.drop_next_reply = true;
    bus.request(0);
    assert_eq!(bus.state(0), ClientState::Requesting);

    let timeout = ClientConfig::default().reply_timeout_ms;
    assert_eq!(
        bus.device_mut(0).update_time(timeout),
        Some(ClientEvent::TimedOut(ClientState::Requesting))
    );
    assert_eq!(bus.state(0), ClientState::Unaddressed);

    // A later grant is not adopted by the device that gave up
    bus.request(1);
    assert_eq!(bus.state(0), ClientState::Unaddressed);
    assert_eq!(bus.state(1), ClientState::Addressed(addr(3)));

    // Nobody answers for 0x02, so the probe takes it over
    bus.probe(0, 2);
    assert_eq!(bus.state(0), ClientState::Addressed(addr(2)));
    assert_eq!(bus.server.stats().forced, 1);
}

#[test]
fn probe_of_live_address_is_disputed() {
    let mut bus = SimBus::with_devices(2);
    bus.request(0);

    bus.probe(1, 2);
    assert_eq!(bus.state(1), ClientState::Unaddressed);
    assert_eq!(
        bus.device_mut(1).take_event(),
        Some(ClientEvent::ProbeDisputed(addr(2)))
    );
    assert_eq!(bus.state(0), ClientState::Addressed(addr(2)));
    assert_eq!(bus.server.stats().disputed, 1);
}

#[test]
fn probe_of_free_address_succeeds() {
    let mut bus = SimBus::with_devices(1);
    bus.probe(0, 0x40);
    assert_eq!(bus.state(0), ClientState::Addressed(addr(0x40)));
    assert_eq!(bus.server.stats().not_allocated, 1);
}

#[test]
fn powered_off_holder_loses_address() {
    let mut bus = SimBus::with_devices(2);
    bus.request(0);
    bus.nodes[0].powered = false;

    bus.probe(1, 2);
    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));
}

#[test]
fn misbehaving_holder_is_revoked() {
    let wrong_key = DeviceConfig {
        client: ClientConfig {
            challenge_key: 0x00,
            ..ClientConfig::default()
        },
        ..DeviceConfig::default()
    };
    let mut bus = SimBus::new((2, 0x7F), &[wrong_key, DeviceConfig::default()]);
    bus.request(0);
    assert_eq!(bus.state(0), ClientState::Addressed(addr(2)));
    bus.device_mut(0).take_event();

    // Holder answers with the wrong key, so the server forces the address
    bus.probe(1, 2);

    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));
    assert_eq!(bus.state(0), ClientState::Unaddressed);
    assert_eq!(bus.device_mut(0).take_event(), Some(ClientEvent::Revoked(addr(2))));

    // The revoked device is free to ask again, but 0x02 is taken
    bus.request(0);
    assert_eq!(bus.state(0), ClientState::Addressed(addr(3)));
    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));
}

#[test]
fn reclaimed_address_is_not_granted_twice() {
    let mut bus = SimBus::with_devices(3);
    bus.request(0);
    bus.nodes[0].powered = false;

    // Device 1 takes over 0x02; the table records it free again
    bus.probe(1, 2);
    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));

    bus.request(2);
    assert_eq!(bus.state(2), ClientState::Addressed(addr(3)));
    assert_eq!(bus.state(1), ClientState::Addressed(addr(2)));
    assert_eq!(bus.server.stats().in_use, 1);
}

#[test]
fn address_adopted_while_free_is_skipped_by_grants() {
    let mut bus = SimBus::with_devices(2);
    bus.probe(0, 2);
    assert_eq!(bus.state(0), ClientState::Addressed(addr(2)));

    bus.request(1);
    assert_eq!(bus.state(1), ClientState::Addressed(addr(3)));
    assert_eq!(
        bus.server.table().get(addr(2)),
        Some(AllocationState::Allocated)
    );
}

#[test]
fn group_synchronization_across_devices() {
    let mut configs = [DeviceConfig::in_group(GroupId(1)); 3];
    configs[2] = DeviceConfig::in_group(GroupId(2));
    let mut bus = SimBus::new((2, 0x7F), &configs);
    for i in 0..3 {
        bus.request(i);
    }

    bus.broadcast(Message::LedIncludeGroup {
        group: GroupId(1),
        phase: 100,
    });
    bus.deliver(Outbound::Send(
        Message::LedExcludeDevice.to_frame_at(addr(3)).unwrap(),
    ));
    bus.broadcast(Message::LedInclusiveSynchronize { phase: 10 });

    assert_eq!(bus.device(0).led().jumps, [100]);
    assert_eq!(bus.device(1).last_sync(), Some(SyncOutcome::Suppressed));
    assert!(bus.device(1).led().jumps.is_empty());
    assert_eq!(bus.device(2).led().jumps, [10]);

    // Device 1's include survived the suppressed event
    bus.broadcast(Message::LedExclusiveSynchronize);
    assert_eq!(bus.device(0).led().jumps, [100]);
    assert_eq!(bus.device(1).led().jumps, [100]);
    assert_eq!(bus.device(2).last_sync(), Some(SyncOutcome::Unaffected));
}

#[test]
fn replies_are_broadcast() {
    let mut bus = SimBus::with_devices(1);
    bus.request(0);
    assert_eq!(bus.log.len(), 2);
    assert!(bus.log[0].target().is_server());
    assert!(bus.log[1].is_broadcast());
}
