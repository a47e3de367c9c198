//! Fuzz target for the engine over long observation sequences
//!
//! Drives one `Engine` through arbitrary interleavings of lock changes,
//! capability changes, observations and executor failures.
//!
//! # Invariants
//!
//! - Nothing but `Allow` and `HideOverlay` is decided while unlocked
//! - `ConsumeInput` is only decided with input interception available
//! - `ShowOverlay` is never decided under strict kiosk
//! - The overlay mirror only moves on a confirmed show or hide

#![no_main]

use arbitrary::Arbitrary;
use focuslock_core::{
    observation::{KEYCODE_APP_SWITCH, KEYCODE_BACK, KEYCODE_HOME},
    ActionContext, ActionExecutor, Capability, CapabilityProbe, CapabilityReport, CapabilitySet,
    EnforcementAction, Engine, EngineConfig, ExecutionError, LockState, OverlayVisibility,
    RawObservation, SharedLockFlag,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Lock,
    Unlock,
    SetCapabilities(u8),
    Window(App),
    Key { key: Key, down: bool },
    PermissionsChanged,
    FailNext(u8),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum App {
    Guarded,
    Other(u8),
    Blank,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Key {
    Back,
    Home,
    AppSwitch,
    Raw(i16),
}

struct Probe(CapabilitySet);

impl CapabilityProbe for Probe {
    fn probe(&mut self) -> CapabilityReport {
        CapabilityReport::from_set(self.0)
    }
}

#[derive(Default)]
struct Executor {
    fail_next: u8,
    shown: bool,
}

impl ActionExecutor for Executor {
    fn execute(
        &mut self,
        action: EnforcementAction,
        _ctx: &ActionContext<'_>,
    ) -> Result<(), ExecutionError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(ExecutionError::Overlay("injected".to_string()));
        }
        match action {
            EnforcementAction::ShowOverlay => self.shown = true,
            EnforcementAction::HideOverlay => self.shown = false,
            _ => {}
        }
        Ok(())
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let guarded = focuslock_core::engine::DEFAULT_GUARDED_APP;
    let lock = SharedLockFlag::default();
    let mut engine =
        Engine::new(EngineConfig::default(), lock.clone(), Probe(CapabilitySet::empty()));
    let mut executor = Executor::default();

    for op in ops {
        let observation = match op {
            Op::Lock => {
                lock.lock();
                continue;
            }
            Op::Unlock => {
                lock.unlock();
                continue;
            }
            Op::SetCapabilities(bits) => {
                engine.probe_mut().0 = CapabilitySet::from_bits_truncate(bits);
                continue;
            }
            Op::FailNext(n) => {
                executor.fail_next = n % 4;
                continue;
            }
            Op::Window(App::Guarded) => RawObservation::window_changed(guarded),
            Op::Window(App::Other(n)) => RawObservation::window_changed(format!("app.other{n}")),
            Op::Window(App::Blank) => RawObservation::window_changed("  "),
            Op::Key { key, down } => {
                let key_code = match key {
                    Key::Back => KEYCODE_BACK,
                    Key::Home => KEYCODE_HOME,
                    Key::AppSwitch => KEYCODE_APP_SWITCH,
                    Key::Raw(raw) => i32::from(raw),
                };
                if down {
                    RawObservation::key_down(key_code)
                } else {
                    RawObservation::key_up(key_code)
                }
            }
            Op::PermissionsChanged => RawObservation::PermissionsChanged,
        };

        let evaluation = match engine.observe(&observation, &mut executor) {
            Ok(evaluation) => evaluation,
            Err(e) => match e.evaluation() {
                Some(evaluation) => evaluation.clone(),
                None => continue,
            },
        };

        let caps = evaluation.capabilities.unwrap_or_else(CapabilitySet::empty);
        if evaluation.lock == LockState::Unlocked {
            assert!(
                evaluation
                    .actions
                    .iter()
                    .all(|a| matches!(a, EnforcementAction::Allow | EnforcementAction::HideOverlay)),
                "enforced while unlocked: {:?}",
                evaluation.actions
            );
        }
        if evaluation.actions.contains(&EnforcementAction::ConsumeInput) {
            assert!(caps.has(Capability::InputInterception));
        }
        if caps.has(Capability::StrictKiosk) {
            assert!(!evaluation.actions.contains(&EnforcementAction::ShowOverlay));
        }
        assert_eq!(
            engine.enforcer().overlay() == OverlayVisibility::Shown,
            executor.shown,
            "mirror diverged after {observation:?}"
        );
    }
});
