//! Model world - the reference implementation.
//!
//! A deliberately naive re-statement of the enforcement rules, written
//! without the engine's decision table or overlay state machine. It is the
//! oracle the real runtime is compared against.

use std::collections::BTreeSet;

use focuslock_core::EnforcementAction;

use super::operation::{ModelCapability, Operation};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Lock engaged.
    pub locked: bool,
    /// Foreground package.
    pub foreground: String,
    /// Overlay drawn.
    pub overlay_drawn: bool,
    /// Notification shade open.
    pub shade_open: bool,
}

/// Model world.
///
/// Assumes every platform call succeeds and that dismissal is supported.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    guarded: String,
    locked: bool,
    granted: BTreeSet<ModelCapability>,
    foreground: String,
    overlay_drawn: bool,
    shade_open: bool,
    restore_pending: bool,
    pending: Vec<String>,
}

impl ModelWorld {
    /// An unlocked device showing `guarded`, nothing granted.
    pub fn new(guarded: impl Into<String>) -> Self {
        let guarded = guarded.into();
        Self {
            foreground: guarded.clone(),
            guarded,
            locked: false,
            granted: BTreeSet::new(),
            overlay_drawn: false,
            shade_open: false,
            restore_pending: false,
            pending: Vec::new(),
        }
    }

    /// Apply an operation, returning the actions of every evaluation it
    /// triggered, in order.
    pub fn apply(&mut self, op: &Operation) -> Vec<Vec<EnforcementAction>> {
        match op {
            Operation::Lock => {
                self.locked = true;
                Vec::new()
            },
            Operation::Unlock => {
                self.locked = false;
                Vec::new()
            },
            Operation::Grant { capability } => {
                self.granted.insert(*capability);
                vec![vec![EnforcementAction::Allow]]
            },
            Operation::Revoke { capability } => {
                self.granted.remove(capability);
                vec![vec![EnforcementAction::Allow]]
            },
            Operation::Launch { app } => {
                let package = app.package(&self.guarded);
                self.foreground.clone_from(&package);
                vec![self.window_changed(&package)]
            },
            Operation::PressKey { key } => {
                if !key.is_navigation() {
                    return vec![vec![EnforcementAction::Allow]];
                }
                if self.locked {
                    let action = if self.has(ModelCapability::InputInterception) {
                        EnforcementAction::ConsumeInput
                    } else {
                        EnforcementAction::Allow
                    };
                    let mut actions = vec![action];
                    if self.restore_pending && self.cover_permitted() && !self.overlay_drawn {
                        self.overlay_drawn = true;
                        actions.push(EnforcementAction::ShowOverlay);
                    }
                    vec![actions]
                } else {
                    vec![self.allow_and_uncover()]
                }
            },
            Operation::OpenShade => {
                self.shade_open = true;
                Vec::new()
            },
            Operation::DeliverPending => {
                let pending = std::mem::take(&mut self.pending);
                pending.iter().map(|package| self.window_changed(package)).collect()
            },
            Operation::AdvanceTime { .. } => Vec::new(),
        }
    }

    fn has(&self, capability: ModelCapability) -> bool {
        self.granted.contains(&capability)
    }

    fn cover_permitted(&self) -> bool {
        self.has(ModelCapability::OverlayDraw) && !self.has(ModelCapability::StrictKiosk)
    }

    fn allow_and_uncover(&mut self) -> Vec<EnforcementAction> {
        self.restore_pending = false;
        self.overlay_drawn = false;
        vec![EnforcementAction::Allow, EnforcementAction::HideOverlay]
    }

    fn window_changed(&mut self, package: &str) -> Vec<EnforcementAction> {
        if !self.locked || package == self.guarded {
            return self.allow_and_uncover();
        }

        let mut actions = vec![EnforcementAction::SuppressAndRestore];
        self.restore_pending = true;
        self.shade_open = false;
        if self.foreground != self.guarded {
            self.foreground.clone_from(&self.guarded);
            self.pending.push(self.guarded.clone());
        }

        if self.cover_permitted() {
            self.overlay_drawn = true;
            actions.push(EnforcementAction::ShowOverlay);
        } else {
            self.overlay_drawn = false;
            actions.push(EnforcementAction::HideOverlay);
        }
        actions
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            locked: self.locked,
            foreground: self.foreground.clone(),
            overlay_drawn: self.overlay_drawn,
            shade_open: self.shade_open,
        }
    }

    /// Number of queued window events.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The guarded package.
    pub fn guarded(&self) -> &str {
        &self.guarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::{ModelApp, ModelKey};

    #[test]
    fn foreign_launch_while_locked_is_suppressed() {
        let mut world = ModelWorld::new("com.example.focuslock");
        world.apply(&Operation::Grant { capability: ModelCapability::OverlayDraw });
        world.apply(&Operation::Lock);

        let outcome = world.apply(&Operation::Launch { app: ModelApp::Browser });
        assert_eq!(outcome, vec![vec![
            EnforcementAction::SuppressAndRestore,
            EnforcementAction::ShowOverlay
        ]]);
        assert_eq!(world.observable_state().foreground, "com.example.focuslock");
        assert_eq!(world.pending_len(), 1);

        let outcome = world.apply(&Operation::DeliverPending);
        assert_eq!(outcome, vec![vec![EnforcementAction::Allow, EnforcementAction::HideOverlay]]);
    }

    #[test]
    fn keys_pass_through_without_interception() {
        let mut world = ModelWorld::new("com.example.focuslock");
        world.apply(&Operation::Lock);
        assert_eq!(world.apply(&Operation::PressKey { key: ModelKey::Home }), vec![vec![
            EnforcementAction::Allow
        ]]);
    }

    #[test]
    fn late_overlay_grant_covers_pending_restore() {
        let mut world = ModelWorld::new("com.example.focuslock");
        world.apply(&Operation::Lock);
        world.apply(&Operation::Launch { app: ModelApp::Settings });
        world.apply(&Operation::Grant { capability: ModelCapability::OverlayDraw });

        let outcome = world.apply(&Operation::PressKey { key: ModelKey::Back });
        assert_eq!(outcome, vec![vec![EnforcementAction::Allow, EnforcementAction::ShowOverlay]]);
        assert!(world.observable_state().overlay_drawn);
    }
}
