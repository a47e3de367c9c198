//! Fuzz target for the observation classifier
//!
//! Feeds arbitrary platform callbacks to `classify` and checks that it never
//! panics and only ever produces an intent the input can justify.
//!
//! # Invariants
//!
//! - Window state changes with a non-blank package classify to
//!   `ForegroundChanged` with the trimmed package
//! - Other accessibility events, key releases and notices carry no intent
//! - Negative key codes are rejected

#![no_main]

use arbitrary::Arbitrary;
use focuslock_core::{
    classify,
    error::ObservationError,
    observation::{ACTION_DOWN, TYPE_WINDOW_STATE_CHANGED},
    LockTaskMode, NavigationIntent, RawObservation,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Accessibility { event_type: u32, package: Option<String> },
    WindowChanged { package: Option<String> },
    Key { key_code: i32, action: i32 },
    KeyDown { key_code: i32 },
    Mode(u8),
    PermissionsChanged,
}

fn to_observation(input: Input) -> RawObservation {
    match input {
        Input::Accessibility { event_type, package } => {
            RawObservation::Accessibility { event_type, package }
        }
        Input::WindowChanged { package } => {
            RawObservation::Accessibility { event_type: TYPE_WINDOW_STATE_CHANGED, package }
        }
        Input::Key { key_code, action } => RawObservation::Key { key_code, action },
        Input::KeyDown { key_code } => RawObservation::Key { key_code, action: ACTION_DOWN },
        Input::Mode(raw) => RawObservation::LockTaskModeChanged {
            mode: LockTaskMode::from_raw(i32::from(raw % 4)).unwrap_or_default(),
        },
        Input::PermissionsChanged => RawObservation::PermissionsChanged,
    }
}

fuzz_target!(|input: Input| {
    let observation = to_observation(input);

    match (&observation, classify(&observation)) {
        (RawObservation::Accessibility { event_type, package }, result) => {
            if *event_type != TYPE_WINDOW_STATE_CHANGED {
                assert_eq!(result, Ok(None));
                return;
            }
            let trimmed = package.as_deref().map(str::trim).filter(|p| !p.is_empty());
            match (trimmed, result) {
                (Some(expected), Ok(Some(NavigationIntent::ForegroundChanged { app }))) => {
                    assert_eq!(app.as_str(), expected);
                }
                (None, Err(ObservationError::MissingPackage)) => {}
                (trimmed, result) => panic!("window change {trimmed:?} classified as {result:?}"),
            }
        }
        (RawObservation::Key { key_code, action }, result) => {
            if *key_code < 0 {
                assert_eq!(result, Err(ObservationError::InvalidKeyCode(*key_code)));
            } else if *action != ACTION_DOWN {
                assert!(!matches!(result, Ok(Some(_))), "non-down key classified: {result:?}");
            }
        }
        (_, result) => assert_eq!(result, Ok(None)),
    }
});
