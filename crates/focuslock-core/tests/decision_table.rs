//! Snapshot of the rendered decision table.
//!
//! Renders every (lock, intent) pair for the two capability sets that matter
//! to the key rows, so any change to the table shows up as a snapshot diff.

use std::fmt::Write;

use focuslock_core::{
    AppId, Capability, CapabilitySet, LockState, NavigationIntent, policy::decide,
};

fn render(caps: CapabilitySet) -> String {
    let guarded = AppId::new("com.example.focuslock");
    let intents = [
        ("fg(self)", NavigationIntent::foreground("com.example.focuslock")),
        ("fg(other)", NavigationIntent::foreground("other.app")),
        ("back", NavigationIntent::BackRequested),
        ("home", NavigationIntent::HomeRequested),
        ("switch", NavigationIntent::AppSwitchRequested),
    ];

    let mut out = String::new();
    for lock in [LockState::Unlocked, LockState::Locked] {
        for (label, intent) in &intents {
            let decision = decide(lock, caps, intent, &guarded);
            let _ = writeln!(out, "{lock:?} {label} -> {}", decision.action);
        }
    }
    out
}

#[test]
fn table_with_interception() {
    let caps = CapabilitySet::empty().with(Capability::InputInterception);
    insta::assert_snapshot!(render(caps), @r"
    Unlocked fg(self) -> allow
    Unlocked fg(other) -> allow
    Unlocked back -> allow
    Unlocked home -> allow
    Unlocked switch -> allow
    Locked fg(self) -> allow
    Locked fg(other) -> suppress_and_restore
    Locked back -> consume_input
    Locked home -> consume_input
    Locked switch -> consume_input
    ");
}

#[test]
fn table_without_capabilities() {
    insta::assert_snapshot!(render(CapabilitySet::empty()), @r"
    Unlocked fg(self) -> allow
    Unlocked fg(other) -> allow
    Unlocked back -> allow
    Unlocked home -> allow
    Unlocked switch -> allow
    Locked fg(self) -> allow
    Locked fg(other) -> suppress_and_restore
    Locked back -> allow
    Locked home -> allow
    Locked switch -> allow
    ");
}
