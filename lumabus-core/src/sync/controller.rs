//! Include/exclude/synchronize controller
//!
//! Rules applied on each synchronize event:
//!
//! - INCLUSIVE: a pending exclusion suppresses this one event and is
//!   consumed. Otherwise the device jumps to its override phase if one is
//!   set, else to the broadcast phase, and the override is cleared.
//! - EXCLUSIVE: only a device with an override jumps, to that override,
//!   which is then cleared. Exclusion plays no part.
//!
//! An include phase beats the broadcast phase; an exclusion beats an
//! include for exactly one inclusive event.

use lumabus_protocol::{GroupId, Phase};

use crate::config::SyncConfig;
use crate::traits::WaveformGenerator;

/// Per-device synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSyncState {
    /// Static group membership
    pub group: Option<GroupId>,
    /// Phase set by the last include, until a synchronize uses it
    pub override_phase: Option<Phase>,
    /// Skip the next inclusive synchronize
    pub excluded_next: bool,
}

/// What a synchronize event did to this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncOutcome {
    /// Waveform jumped to this phase
    Jumped(Phase),
    /// A pending exclusion absorbed the event
    Suppressed,
    /// Event did not apply to this device
    Unaffected,
}

/// Synchronization controller for one LED device
#[derive(Debug, Clone, Default)]
pub struct SyncController {
    state: DeviceSyncState,
}

impl SyncController {
    /// Create a controller with nothing pending
    pub fn new(config: SyncConfig) -> Self {
        Self {
            state: DeviceSyncState {
                group: config.group,
                ..DeviceSyncState::default()
            },
        }
    }

    /// Current state
    pub fn state(&self) -> &DeviceSyncState {
        &self.state
    }

    /// Configured group, if any
    pub fn group(&self) -> Option<GroupId> {
        self.state.group
    }

    fn in_group(&self, group: GroupId) -> bool {
        self.state.group == Some(group)
    }

    /// LED_INCLUDE_DEVICE: use `phase` at the next synchronize
    pub fn include(&mut self, phase: Phase) {
        debug!("included at phase {}", phase);
        self.state.override_phase = Some(phase);
    }

    /// LED_EXCLUDE_DEVICE: sit out the next inclusive synchronize
    pub fn exclude(&mut self) {
        debug!("excluded from next synchronize");
        self.state.excluded_next = true;
    }

    /// LED_INCLUDE_GROUP; returns whether this device is a member
    pub fn include_group(&mut self, group: GroupId, phase: Phase) -> bool {
        let member = self.in_group(group);
        if member {
            self.include(phase);
        }
        member
    }

    /// LED_EXCLUDE_GROUP; returns whether this device is a member
    pub fn exclude_group(&mut self, group: GroupId) -> bool {
        let member = self.in_group(group);
        if member {
            self.exclude();
        }
        member
    }

    /// LED_INCLUSIVE_SYNCHRONIZE(phase)
    pub fn inclusive_synchronize<W: WaveformGenerator>(
        &mut self,
        phase: Phase,
        waveform: &mut W,
    ) -> SyncOutcome {
        if self.state.excluded_next {
            self.state.excluded_next = false;
            trace!("inclusive synchronize suppressed");
            return SyncOutcome::Suppressed;
        }

        let target = self.state.override_phase.take().unwrap_or(phase);
        waveform.jump_to_phase(target);
        trace!("inclusive synchronize to {}", target);
        SyncOutcome::Jumped(target)
    }

    /// LED_EXCLUSIVE_SYNCHRONIZE
    pub fn exclusive_synchronize<W: WaveformGenerator>(&mut self, waveform: &mut W) -> SyncOutcome {
        match self.state.override_phase.take() {
            Some(target) => {
                waveform.jump_to_phase(target);
                trace!("exclusive synchronize to {}", target);
                SyncOutcome::Jumped(target)
            }
            None => SyncOutcome::Unaffected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockWaveform {
        jumps: Vec<Phase>,
    }

    impl WaveformGenerator for MockWaveform {
        fn jump_to_phase(&mut self, phase: Phase) {
            self.jumps.push(phase);
        }

        fn set_pattern(&mut self, _pattern: u8) {}
    }

    fn grouped(group: u8) -> SyncController {
        SyncController::new(SyncConfig {
            group: Some(GroupId(group)),
        })
    }

    #[test]
    fn test_broadcast_phase_without_override() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Jumped(3));
        assert_eq!(wave.jumps, [3]);
    }

    #[test]
    fn test_override_beats_broadcast_phase_once() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        sync.include(7);

        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Jumped(7));
        assert_eq!(sync.state().override_phase, None);
        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Jumped(3));
        assert_eq!(wave.jumps, [7, 3]);
    }

    #[test]
    fn test_exclusion_suppresses_exactly_one() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        sync.exclude();

        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Suppressed);
        assert!(!sync.state().excluded_next);
        assert_eq!(sync.inclusive_synchronize(4, &mut wave), SyncOutcome::Jumped(4));
        assert_eq!(wave.jumps, [4]);
    }

    #[test]
    fn test_exclusion_beats_inclusion() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        sync.include(9);
        sync.exclude();

        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Suppressed);
        assert!(wave.jumps.is_empty());
        // The include was not used by the suppressed event
        assert_eq!(sync.inclusive_synchronize(3, &mut wave), SyncOutcome::Jumped(9));
    }

    #[test]
    fn test_exclusive_needs_override() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Unaffected);
        assert!(wave.jumps.is_empty());

        sync.include(5);
        assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Jumped(5));
        assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Unaffected);
        assert_eq!(wave.jumps, [5]);
    }

    #[test]
    fn test_exclusive_ignores_exclusion() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        sync.include(5);
        sync.exclude();

        assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Jumped(5));
        // Exclusion still pending for the next inclusive event
        assert!(sync.state().excluded_next);
        assert_eq!(sync.inclusive_synchronize(1, &mut wave), SyncOutcome::Suppressed);
    }

    #[test]
    fn test_group_commands_match_membership() {
        let mut sync = grouped(4);
        let mut wave = MockWaveform::default();

        assert!(!sync.include_group(GroupId(5), 10));
        assert_eq!(sync.state().override_phase, None);
        assert!(sync.include_group(GroupId(4), 10));
        assert_eq!(sync.inclusive_synchronize(0, &mut wave), SyncOutcome::Jumped(10));

        assert!(!sync.exclude_group(GroupId(5)));
        assert!(sync.exclude_group(GroupId(4)));
        assert_eq!(sync.inclusive_synchronize(0, &mut wave), SyncOutcome::Suppressed);
    }

    #[test]
    fn test_ungrouped_device_ignores_group_commands() {
        let mut sync = SyncController::default();
        assert!(!sync.include_group(GroupId(0), 1));
        assert!(!sync.exclude_group(GroupId(0)));
        assert_eq!(sync.state(), &DeviceSyncState::default());
    }

    #[test]
    fn test_later_include_replaces_earlier() {
        let mut sync = SyncController::default();
        let mut wave = MockWaveform::default();
        sync.include(1);
        sync.include(2);
        assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Jumped(2));
    }

    proptest! {
        #[test]
        fn exclusive_never_moves_device_without_override(
            excluded in any::<bool>(),
            phases in proptest::collection::vec(any::<u8>(), 0..8),
        ) {
            let mut sync = SyncController::default();
            let mut wave = MockWaveform::default();
            if excluded {
                sync.exclude();
            }
            // Inclusive events consume any override they see
            for phase in phases {
                sync.inclusive_synchronize(phase, &mut wave);
            }
            let before = wave.jumps.len();
            prop_assert_eq!(sync.exclusive_synchronize(&mut wave), SyncOutcome::Unaffected);
            prop_assert_eq!(wave.jumps.len(), before);
        }
    }
}
