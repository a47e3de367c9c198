//! Property tests over the full runtime with platform failures injected.
//!
//! The model comparison assumes a perfect platform. These properties drop
//! that assumption: platform calls fail at random, and the invariant registry
//! must stay clean anyway.

use std::time::Duration;

use focuslock_core::{AppId, Capability, EnforcementAction, LockState, OverlayVisibility};
use focuslock_harness::{ModelApp, ModelCapability, ModelKey, Operation, SimConfig, SimWorld};
use proptest::prelude::*;

const GUARDED: &str = "com.example.focuslock";

fn apply(world: &mut SimWorld, op: &Operation) {
    match op {
        Operation::Lock => world.lock(),
        Operation::Unlock => world.unlock(),
        Operation::Grant { capability } => {
            world.grant(capability.to_capability());
        },
        Operation::Revoke { capability } => {
            world.revoke(capability.to_capability());
        },
        Operation::Launch { app } => {
            world.launch(app.package(GUARDED));
        },
        Operation::PressKey { key } => {
            world.press(key.key_code());
        },
        Operation::OpenShade => world.open_shade(),
        Operation::DeliverPending => {
            world.deliver_pending();
        },
        Operation::AdvanceTime { millis } => world.advance(Duration::from_millis(u64::from(*millis))),
    }
}

fn capability_strategy() -> impl Strategy<Value = ModelCapability> {
    prop_oneof![
        Just(ModelCapability::StrictKiosk),
        Just(ModelCapability::InputInterception),
        Just(ModelCapability::OverlayDraw),
        Just(ModelCapability::DeviceAdmin),
    ]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    let app = prop_oneof![
        Just(ModelApp::Guarded),
        Just(ModelApp::Launcher),
        Just(ModelApp::Settings),
        Just(ModelApp::Browser),
    ];
    let key = prop_oneof![
        Just(ModelKey::Back),
        Just(ModelKey::Home),
        Just(ModelKey::AppSwitch),
        Just(ModelKey::VolumeUp),
    ];

    prop_oneof![
        2 => Just(Operation::Lock),
        1 => Just(Operation::Unlock),
        2 => capability_strategy().prop_map(|capability| Operation::Grant { capability }),
        1 => capability_strategy().prop_map(|capability| Operation::Revoke { capability }),
        4 => app.prop_map(|app| Operation::Launch { app }),
        3 => key.prop_map(|key| Operation::PressKey { key }),
        1 => Just(Operation::OpenShade),
        2 => Just(Operation::DeliverPending),
        1 => (0u16..5000).prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

fn chaotic_world(seed: u64, rate: f64, dismiss_supported: bool) -> SimWorld {
    let world = SimWorld::new(SimConfig { seed, dismiss_supported, ..Default::default() });
    world.set_chaos(rate);
    world
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// No invariant breaks, however unreliable the platform is.
    #[test]
    fn prop_invariants_hold_under_chaos(
        seed in any::<u64>(),
        rate in 0.0f64..0.6,
        dismiss_supported in any::<bool>(),
        ops in prop::collection::vec(operation_strategy(), 0..80),
    ) {
        let mut world = chaotic_world(seed, rate, dismiss_supported);
        for op in &ops {
            apply(&mut world, op);
        }
        prop_assert!(world.violations().is_empty(), "violations: {:?}", world.violations());
    }

    /// Once the platform recovers, a single escape attempt is undone and the
    /// overlay state converges.
    #[test]
    fn prop_recovers_after_chaos(
        seed in any::<u64>(),
        rate in 0.0f64..0.6,
        ops in prop::collection::vec(operation_strategy(), 0..60),
    ) {
        let mut world = chaotic_world(seed, rate, true);
        for op in &ops {
            apply(&mut world, op);
        }

        world.set_chaos(0.0);
        world.lock();
        world.launch("org.mozilla.firefox");
        world.deliver_pending();

        prop_assert_eq!(world.lock_state(), LockState::Locked);
        prop_assert_eq!(world.device().foreground(), AppId::new(GUARDED));
        prop_assert_eq!(world.overlay_mirror(), OverlayVisibility::Hidden);
        prop_assert!(!world.device().overlay_drawn());
        prop_assert!(world.violations().is_empty(), "violations: {:?}", world.violations());
    }

    /// The same seed and operations produce the same trace.
    #[test]
    fn prop_simulation_is_deterministic(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..40),
    ) {
        let mut first = chaotic_world(seed, 0.3, true);
        let mut second = chaotic_world(seed, 0.3, true);
        for op in &ops {
            apply(&mut first, op);
            apply(&mut second, op);
        }
        prop_assert_eq!(first.trace(), second.trace());
    }

    /// Key events are consumed exactly when locked with interception.
    #[test]
    fn prop_consumption_tracks_lock_and_interception(
        locked in any::<bool>(),
        interception in any::<bool>(),
        key in prop_oneof![Just(ModelKey::Back), Just(ModelKey::Home), Just(ModelKey::AppSwitch)],
    ) {
        let mut world = SimWorld::new(SimConfig::default());
        if interception {
            world.grant(Capability::InputInterception);
        }
        if locked {
            world.lock();
        }
        let entry = world.press(key.key_code());
        let consumed = entry.actions.contains(&EnforcementAction::ConsumeInput);
        prop_assert_eq!(consumed, locked && interception);
    }
}
