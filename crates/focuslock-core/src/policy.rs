//! Enforcement decision table.
//!
//! Stateless: each intent is evaluated against the current lock state and
//! capability set. Rows are evaluated in order, first match wins:
//!
//! ```text
//! LockState  Intent                       Capability               Action
//! ---------  ---------------------------  -----------------------  ------------------
//! Unlocked   any                          -                        Allow
//! Locked     ForegroundChanged(self)      -                        Allow
//! Locked     ForegroundChanged(other)     -                        SuppressAndRestore
//! Locked     Back / Home / AppSwitch      InputInterception        ConsumeInput
//! Locked     Back / Home / AppSwitch      (absent)                 Allow
//! ```
//!
//! Without input interception a navigation key cannot be stopped; the
//! resulting foreground change is suppressed instead. The overlay axis is
//! stateful and lives in [`crate::Enforcer`].

use crate::{
    action::EnforcementAction,
    capability::{Capability, CapabilitySet},
    error::EngineError,
    intent::{AppId, NavigationIntent},
    lock::LockState,
};

/// Outcome of the decision table for one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Action chosen by the first matching row.
    pub action: EnforcementAction,
    /// Missing capability that forced a weaker row, if any.
    pub fallback: Option<EngineError>,
}

impl Decision {
    fn new(action: EnforcementAction) -> Self {
        Self { action, fallback: None }
    }
}

/// Evaluate the decision table.
pub fn decide(
    lock: LockState,
    capabilities: CapabilitySet,
    intent: &NavigationIntent,
    guarded_app: &AppId,
) -> Decision {
    match (lock, intent) {
        (LockState::Unlocked, _) => Decision::new(EnforcementAction::Allow),

        (LockState::Locked, NavigationIntent::ForegroundChanged { app }) if app == guarded_app => {
            Decision::new(EnforcementAction::Allow)
        },

        (LockState::Locked, NavigationIntent::ForegroundChanged { .. }) => {
            Decision::new(EnforcementAction::SuppressAndRestore)
        },

        (
            LockState::Locked,
            NavigationIntent::BackRequested
            | NavigationIntent::HomeRequested
            | NavigationIntent::AppSwitchRequested,
        ) => match require(capabilities, Capability::InputInterception) {
            Ok(()) => Decision::new(EnforcementAction::ConsumeInput),
            Err(missing) => {
                Decision { action: EnforcementAction::Allow, fallback: Some(missing) }
            },
        },
    }
}

/// Check that `capability` is available.
///
/// # Errors
///
/// - `EngineError::CapabilityUnavailable` if the capability is absent
pub fn require(capabilities: CapabilitySet, capability: Capability) -> Result<(), EngineError> {
    if capabilities.has(capability) {
        Ok(())
    } else {
        Err(EngineError::CapabilityUnavailable { capability })
    }
}
