//! Enforcement state machine.
//!
//! Wraps the stateless decision table in [`crate::policy`] with the overlay
//! sub-policy. The lock state itself is never stored here; it is passed in on
//! every call.
//!
//! # Overlay sub-policy
//!
//! ```text
//!             ForegroundChanged(other), overlay cover permitted
//!   ┌────────┐ ───────────────────────────────────────────────> ┌───────┐
//!   │ Hidden │                                                  │ Shown │
//!   └────────┘ <─────────────────────────────────────────────── └───────┘
//!               ForegroundChanged(self) | Unlocked | StrictKiosk
//! ```
//!
//! The cover is only used when [`CapabilitySet::overlay_cover_permitted`]
//! holds, and only while a restore is outstanding: a navigation key pressed
//! before the guarded app is seen again re-requests the cover if it is not
//! drawn. Wherever the overlay must be down, `HideOverlay` is requested
//! regardless of the mirror, since something outside the engine may have
//! drawn it. The executor treats a redundant hide as a no-op.
//!
//! The visibility mirror only changes once the executor confirms the show or
//! hide; a failed hide therefore leaves the mirror `Shown`.

use crate::{
    action::EnforcementAction,
    capability::CapabilitySet,
    error::EngineError,
    intent::{AppId, NavigationIntent},
    lock::LockState,
    policy,
};

/// Engine-side mirror of the overlay's drawn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayVisibility {
    /// No overlay is drawn (as far as the engine knows).
    #[default]
    Hidden,
    /// The executor confirmed the overlay is drawn.
    Shown,
}

impl OverlayVisibility {
    /// True if the overlay is believed to be drawn.
    pub fn is_shown(self) -> bool {
        self == Self::Shown
    }
}

/// Actions decided for one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Primary decision first, overlay axis after it.
    pub actions: Vec<EnforcementAction>,
    /// Missing capability that forced a weaker row, if any.
    pub fallback: Option<EngineError>,
}

/// Enforcement state machine.
///
/// Pure state machine that processes intents and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct Enforcer {
    /// Application the lock keeps the user inside.
    guarded_app: AppId,
    /// Overlay visibility as last confirmed by the executor.
    overlay: OverlayVisibility,
    /// A restore was issued and the guarded app has not been seen since.
    restore_pending: bool,
}

impl Enforcer {
    /// Create an enforcer guarding `guarded_app`.
    pub fn new(guarded_app: AppId) -> Self {
        Self { guarded_app, overlay: OverlayVisibility::Hidden, restore_pending: false }
    }

    /// Decide the actions for one intent.
    pub fn handle(
        &mut self,
        intent: &NavigationIntent,
        lock: LockState,
        capabilities: CapabilitySet,
    ) -> Verdict {
        let decision = policy::decide(lock, capabilities, intent, &self.guarded_app);
        let mut actions = vec![decision.action];

        match (lock, intent) {
            (LockState::Unlocked, _) => {
                self.restore_pending = false;
                actions.push(EnforcementAction::HideOverlay);
            },

            (LockState::Locked, NavigationIntent::ForegroundChanged { app })
                if *app == self.guarded_app =>
            {
                self.restore_pending = false;
                actions.push(EnforcementAction::HideOverlay);
            },

            (LockState::Locked, NavigationIntent::ForegroundChanged { .. }) => {
                self.restore_pending = true;
                if capabilities.overlay_cover_permitted() {
                    actions.push(EnforcementAction::ShowOverlay);
                } else {
                    actions.push(EnforcementAction::HideOverlay);
                }
            },

            (LockState::Locked, _) => {
                if self.restore_pending
                    && capabilities.overlay_cover_permitted()
                    && !self.overlay.is_shown()
                {
                    actions.push(EnforcementAction::ShowOverlay);
                }
            },
        }

        Verdict { actions, fallback: decision.fallback }
    }

    /// Record the executor's answer for an overlay action.
    pub fn record_outcome(&mut self, action: EnforcementAction, succeeded: bool) {
        if !succeeded {
            return;
        }
        match action {
            EnforcementAction::ShowOverlay => self.overlay = OverlayVisibility::Shown,
            EnforcementAction::HideOverlay => self.overlay = OverlayVisibility::Hidden,
            EnforcementAction::Allow
            | EnforcementAction::SuppressAndRestore
            | EnforcementAction::ConsumeInput => {},
        }
    }

    /// Application the lock keeps the user inside.
    pub fn guarded_app(&self) -> &AppId {
        &self.guarded_app
    }

    /// Overlay visibility as last confirmed by the executor.
    pub fn overlay(&self) -> OverlayVisibility {
        self.overlay
    }

    /// True if a restore was issued and not yet observed.
    pub fn restore_pending(&self) -> bool {
        self.restore_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;

    fn enforcer() -> Enforcer {
        Enforcer::new(AppId::new("com.example.focuslock"))
    }

    fn overlay_only() -> CapabilitySet {
        CapabilitySet::empty().with(Capability::OverlayDraw)
    }

    /// Apply the verdict as if every action succeeded.
    fn confirm(enforcer: &mut Enforcer, verdict: &Verdict) {
        for action in &verdict.actions {
            enforcer.record_outcome(*action, true);
        }
    }

    #[test]
    fn weak_enforcement_covers_restore_with_overlay() {
        let mut enforcer = enforcer();
        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            overlay_only(),
        );

        assert_eq!(verdict.actions, vec![
            EnforcementAction::SuppressAndRestore,
            EnforcementAction::ShowOverlay
        ]);
        assert!(enforcer.restore_pending());
        assert_eq!(enforcer.overlay(), OverlayVisibility::Hidden);

        confirm(&mut enforcer, &verdict);
        assert_eq!(enforcer.overlay(), OverlayVisibility::Shown);
    }

    #[test]
    fn observed_restore_hides_overlay() {
        let mut enforcer = enforcer();
        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            overlay_only(),
        );
        confirm(&mut enforcer, &verdict);

        let verdict = enforcer.handle(
            &NavigationIntent::foreground("com.example.focuslock"),
            LockState::Locked,
            overlay_only(),
        );
        assert_eq!(verdict.actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::HideOverlay
        ]);
        assert!(!enforcer.restore_pending());
    }

    #[test]
    fn strict_kiosk_never_shows_overlay() {
        let mut enforcer = enforcer();
        let caps = overlay_only().with(Capability::StrictKiosk);
        let verdict =
            enforcer.handle(&NavigationIntent::foreground("other.app"), LockState::Locked, caps);

        assert_eq!(verdict.actions, vec![
            EnforcementAction::SuppressAndRestore,
            EnforcementAction::HideOverlay
        ]);
    }

    #[test]
    fn kiosk_granted_mid_cover_removes_overlay() {
        let mut enforcer = enforcer();
        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            overlay_only(),
        );
        confirm(&mut enforcer, &verdict);

        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            overlay_only().with(Capability::StrictKiosk),
        );
        assert_eq!(verdict.actions, vec![
            EnforcementAction::SuppressAndRestore,
            EnforcementAction::HideOverlay
        ]);
    }

    #[test]
    fn unlock_hides_shown_overlay() {
        let mut enforcer = enforcer();
        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            overlay_only(),
        );
        confirm(&mut enforcer, &verdict);

        let verdict =
            enforcer.handle(&NavigationIntent::HomeRequested, LockState::Unlocked, overlay_only());
        assert_eq!(verdict.actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::HideOverlay
        ]);
        assert!(!enforcer.restore_pending());
    }

    #[test]
    fn unlock_hides_overlay_the_mirror_never_saw() {
        let mut enforcer = enforcer();
        assert_eq!(enforcer.overlay(), OverlayVisibility::Hidden);

        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Unlocked,
            CapabilitySet::all(),
        );
        assert_eq!(verdict.actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::HideOverlay
        ]);

        let verdict = enforcer.handle(
            &NavigationIntent::foreground("com.example.focuslock"),
            LockState::Locked,
            CapabilitySet::empty(),
        );
        assert_eq!(verdict.actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::HideOverlay
        ]);
    }

    #[test]
    fn failed_hide_keeps_mirror_shown() {
        let mut enforcer = enforcer();
        enforcer.record_outcome(EnforcementAction::ShowOverlay, true);
        enforcer.record_outcome(EnforcementAction::HideOverlay, false);
        assert_eq!(enforcer.overlay(), OverlayVisibility::Shown);

        let verdict =
            enforcer.handle(&NavigationIntent::BackRequested, LockState::Unlocked, overlay_only());
        assert!(verdict.actions.contains(&EnforcementAction::HideOverlay));
    }

    #[test]
    fn navigation_keys_leave_overlay_axis_alone() {
        let mut enforcer = enforcer();
        enforcer.record_outcome(EnforcementAction::ShowOverlay, true);

        let caps = overlay_only().with(Capability::InputInterception);
        let verdict = enforcer.handle(&NavigationIntent::AppSwitchRequested, LockState::Locked, caps);
        assert_eq!(verdict.actions, vec![EnforcementAction::ConsumeInput]);
        assert_eq!(enforcer.overlay(), OverlayVisibility::Shown);
    }

    #[test]
    fn cover_is_requested_again_while_restore_is_unconfirmed() {
        let mut enforcer = enforcer();
        let verdict = enforcer.handle(
            &NavigationIntent::foreground("other.app"),
            LockState::Locked,
            CapabilitySet::empty(),
        );
        confirm(&mut enforcer, &verdict);
        assert!(enforcer.restore_pending());

        // Overlay permission arrives before the restore is observed.
        let verdict =
            enforcer.handle(&NavigationIntent::HomeRequested, LockState::Locked, overlay_only());
        assert_eq!(verdict.actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::ShowOverlay
        ]);
        confirm(&mut enforcer, &verdict);

        let verdict =
            enforcer.handle(&NavigationIntent::HomeRequested, LockState::Locked, overlay_only());
        assert_eq!(verdict.actions, vec![EnforcementAction::Allow]);
    }

    #[test]
    fn no_cover_once_restore_is_observed() {
        let mut enforcer = enforcer();
        enforcer.handle(&NavigationIntent::foreground("other.app"), LockState::Locked, overlay_only());
        enforcer.handle(
            &NavigationIntent::foreground("com.example.focuslock"),
            LockState::Locked,
            overlay_only(),
        );

        let verdict =
            enforcer.handle(&NavigationIntent::BackRequested, LockState::Locked, overlay_only());
        assert_eq!(verdict.actions, vec![EnforcementAction::Allow]);
    }
}
