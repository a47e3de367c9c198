//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use focuslock_core::{Capability, EnforcementAction, LockState};

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};
use crate::sim_device::PlatformCall;

/// Nothing but `Allow` and `HideOverlay` is decided while unlocked.
pub struct EnforceOnlyWhenLocked;

impl Invariant for EnforceOnlyWhenLocked {
    fn kind(&self) -> InvariantKind {
        InvariantKind::EnforceOnlyWhenLocked
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.lock == LockState::Locked {
            return Ok(());
        }
        let offending = state.actions.iter().find(|action| {
            !matches!(action, EnforcementAction::Allow | EnforcementAction::HideOverlay)
        });
        match offending {
            Some(action) => Err(Violation {
                invariant: self.kind(),
                message: format!("{action} decided while unlocked: {:?}", state.actions),
            }),
            None => Ok(()),
        }
    }
}

/// Input is only consumed when interception is available.
pub struct ConsumeRequiresInterception;

impl Invariant for ConsumeRequiresInterception {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ConsumeRequiresInterception
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let consumed = state.actions.contains(&EnforcementAction::ConsumeInput);
        let available =
            state.capabilities.is_some_and(|caps| caps.has(Capability::InputInterception));
        if consumed && !available {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("input consumed with capabilities {:?}", state.capabilities),
            });
        }
        Ok(())
    }
}

/// The overlay is never requested while strict kiosk is active.
///
/// Kiosk mode already prevents escape; drawing over it would only hide the
/// guarded app from the user.
pub struct OverlayNeverUnderStrictKiosk;

impl Invariant for OverlayNeverUnderStrictKiosk {
    fn kind(&self) -> InvariantKind {
        InvariantKind::OverlayNeverUnderStrictKiosk
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let kiosk = state.capabilities.is_some_and(|caps| caps.has(Capability::StrictKiosk));
        if kiosk && state.actions.contains(&EnforcementAction::ShowOverlay) {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("ShowOverlay decided under strict kiosk: {:?}", state.actions),
            });
        }
        Ok(())
    }
}

/// No restore is issued before the dismissal it depends on.
pub struct DismissBeforeRestore;

impl Invariant for DismissBeforeRestore {
    fn kind(&self) -> InvariantKind {
        InvariantKind::DismissBeforeRestore
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let dismissals = state.call_positions(|call| matches!(call, PlatformCall::Dismiss));
        let restores = state.call_positions(|call| matches!(call, PlatformCall::Restore(_)));

        if let (Some(&first_restore), Some(&last_dismiss)) = (restores.first(), dismissals.last())
            && first_restore < last_dismiss
        {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("restore at call {first_restore} precedes dismiss at {last_dismiss}"),
            });
        }
        Ok(())
    }
}

/// The engine's overlay mirror matches what the device draws.
///
/// The mirror only moves on confirmed success, so a failed show or hide must
/// leave both sides unchanged.
pub struct OverlayMirrorConsistent;

impl Invariant for OverlayMirrorConsistent {
    fn kind(&self) -> InvariantKind {
        InvariantKind::OverlayMirrorConsistent
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.mirror.is_shown() != state.overlay_drawn {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "mirror {:?} but device overlay drawn = {}",
                    state.mirror, state.overlay_drawn
                ),
            });
        }
        Ok(())
    }
}

/// Any intent evaluated while unlocked leaves no overlay behind, unless the
/// hide itself failed.
pub struct UnlockedHidesOverlay;

impl Invariant for UnlockedHidesOverlay {
    fn kind(&self) -> InvariantKind {
        InvariantKind::UnlockedHidesOverlay
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.lock == LockState::Unlocked
            && state.intent.is_some()
            && !state.any_call_failed()
            && state.overlay_drawn
        {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("overlay still drawn after {:?} while unlocked", state.intent),
            });
        }
        Ok(())
    }
}
