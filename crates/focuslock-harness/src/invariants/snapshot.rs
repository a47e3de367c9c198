//! Observable state snapshots for invariant checking.
//!
//! One snapshot is taken after every evaluation the world runs. It pairs the
//! engine's view (decided actions, overlay mirror) with the device's view
//! (calls made, overlay actually drawn) so invariants can compare the two.

use focuslock_core::{
    AppId, CapabilitySet, EnforcementAction, LockState, NavigationIntent, OverlayVisibility,
};

use crate::sim_device::{CallRecord, PlatformCall};

/// State after one evaluation.
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    /// Lock state the engine read.
    pub lock: LockState,
    /// Capabilities the engine probed, if it probed at all.
    pub capabilities: Option<CapabilitySet>,
    /// Classified intent, if any.
    pub intent: Option<NavigationIntent>,
    /// Decided actions, primary first.
    pub actions: Vec<EnforcementAction>,
    /// Engine-side overlay mirror after execution.
    pub mirror: OverlayVisibility,
    /// Whether the device actually draws the overlay.
    pub overlay_drawn: bool,
    /// Platform calls made while executing this evaluation.
    pub calls: Vec<CallRecord>,
    /// App in the foreground after execution.
    pub foreground: AppId,
    /// App the lock keeps the user inside.
    pub guarded_app: AppId,
}

impl SystemSnapshot {
    /// Snapshot of an idle, unlocked system.
    pub fn idle(guarded_app: AppId) -> Self {
        Self {
            lock: LockState::Unlocked,
            capabilities: None,
            intent: None,
            actions: vec![EnforcementAction::Allow],
            mirror: OverlayVisibility::Hidden,
            overlay_drawn: false,
            calls: Vec::new(),
            foreground: guarded_app.clone(),
            guarded_app,
        }
    }

    /// True if any platform call in this step failed.
    pub fn any_call_failed(&self) -> bool {
        self.calls.iter().any(|record| !record.ok)
    }

    /// Indices of calls matching `predicate`, in call order.
    pub fn call_positions(&self, predicate: impl Fn(&PlatformCall) -> bool) -> Vec<usize> {
        self.calls
            .iter()
            .enumerate()
            .filter(|(_, record)| predicate(&record.call))
            .map(|(i, _)| i)
            .collect()
    }
}
