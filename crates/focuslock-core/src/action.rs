//! Enforcement actions produced by the engine.
//!
//! Actions are pure data. The engine performs no side effects; an
//! [`crate::ActionExecutor`] turns each action into platform calls.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intent::{AppId, NavigationIntent};

/// Instruction for the action executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnforcementAction {
    /// Let the OS handle the event normally.
    Allow,

    /// Dismiss transient system surfaces, then bring the guarded app back.
    ///
    /// One idempotent action even though the platform needs two calls. See
    /// [`EnforcementStep`] for the fixed ordering.
    SuppressAndRestore,

    /// Swallow the input event before the OS default handler runs.
    ConsumeInput,

    /// Draw the full-screen overlay. Idempotent.
    ShowOverlay,

    /// Remove the overlay. Idempotent.
    HideOverlay,
}

impl EnforcementAction {
    /// True for anything other than [`EnforcementAction::Allow`].
    pub fn is_enforcing(self) -> bool {
        self != Self::Allow
    }

    /// True for the overlay axis actions.
    pub fn is_overlay(self) -> bool {
        matches!(self, Self::ShowOverlay | Self::HideOverlay)
    }
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allow => "allow",
            Self::SuppressAndRestore => "suppress_and_restore",
            Self::ConsumeInput => "consume_input",
            Self::ShowOverlay => "show_overlay",
            Self::HideOverlay => "hide_overlay",
        };
        f.write_str(name)
    }
}

/// Platform call making up [`EnforcementAction::SuppressAndRestore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnforcementStep {
    /// Close the notification shade, recents and system dialogs.
    DismissSystemSurfaces,
    /// Reorder the guarded app's task to the front.
    RestoreForeground,
}

const DISMISS_THEN_RESTORE: [EnforcementStep; 2] =
    [EnforcementStep::DismissSystemSurfaces, EnforcementStep::RestoreForeground];

const RESTORE_ONLY: [EnforcementStep; 1] = [EnforcementStep::RestoreForeground];

/// Context handed to the executor with every action.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// Application the lock keeps the user inside.
    pub guarded_app: &'a AppId,
    /// Intent that triggered the action.
    pub intent: Option<&'a NavigationIntent>,
    /// Whether the platform can dismiss system surfaces.
    pub dismiss_supported: bool,
}

impl ActionContext<'_> {
    /// Platform calls for [`EnforcementAction::SuppressAndRestore`], in order.
    ///
    /// Dismissal always precedes restoring: a restore issued while the shade
    /// is still open is immediately undone by it.
    pub fn suppress_steps(&self) -> &'static [EnforcementStep] {
        if self.dismiss_supported { &DISMISS_THEN_RESTORE } else { &RESTORE_ONLY }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismissal_precedes_restore() {
        let app = AppId::new("com.example.focuslock");
        let ctx = ActionContext { guarded_app: &app, intent: None, dismiss_supported: true };

        assert_eq!(ctx.suppress_steps(), &[
            EnforcementStep::DismissSystemSurfaces,
            EnforcementStep::RestoreForeground
        ]);
    }

    #[test]
    fn restore_alone_without_dismissal_support() {
        let app = AppId::new("com.example.focuslock");
        let ctx = ActionContext { guarded_app: &app, intent: None, dismiss_supported: false };

        assert_eq!(ctx.suppress_steps(), &[EnforcementStep::RestoreForeground]);
    }

    #[test]
    fn only_allow_is_not_enforcing() {
        assert!(!EnforcementAction::Allow.is_enforcing());
        assert!(EnforcementAction::HideOverlay.is_enforcing());
        assert!(EnforcementAction::ShowOverlay.is_overlay());
        assert!(!EnforcementAction::ConsumeInput.is_overlay());
    }
}
