//! Navigation event classifier.
//!
//! Maps a [`RawObservation`] onto a [`NavigationIntent`]. Pure: no I/O, no
//! state. Observations that carry no navigation meaning (key-up, unrelated
//! keys, content changes, mode notifications) classify to `None`.
//!
//! Navigation keys classify on key-down only. The matching key-up is ignored
//! so one press is never handled twice.

use crate::{
    error::ObservationError,
    intent::{AppId, NavigationIntent},
    observation::{
        ACTION_DOWN, ACTION_MULTIPLE, ACTION_UP, KEYCODE_APP_SWITCH, KEYCODE_BACK, KEYCODE_HOME,
        RawObservation, TYPE_WINDOW_STATE_CHANGED,
    },
};

/// Classify a raw observation.
///
/// # Errors
///
/// - `ObservationError::MissingPackage` for a window state change without a
///   package
/// - `ObservationError::UnknownKeyAction` for a key action outside
///   down/up/multiple
/// - `ObservationError::InvalidKeyCode` for a negative key code
pub fn classify(
    observation: &RawObservation,
) -> Result<Option<NavigationIntent>, ObservationError> {
    match observation {
        RawObservation::Accessibility { event_type, package } => {
            if *event_type != TYPE_WINDOW_STATE_CHANGED {
                return Ok(None);
            }

            let package = package
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or(ObservationError::MissingPackage)?;

            Ok(Some(NavigationIntent::ForegroundChanged { app: AppId::new(package) }))
        },

        RawObservation::Key { key_code, action } => classify_key(*key_code, *action),

        RawObservation::LockTaskModeChanged { .. } | RawObservation::PermissionsChanged => Ok(None),
    }
}

fn classify_key(key_code: i32, action: i32) -> Result<Option<NavigationIntent>, ObservationError> {
    if key_code < 0 {
        return Err(ObservationError::InvalidKeyCode(key_code));
    }

    match action {
        ACTION_DOWN => {},
        ACTION_UP | ACTION_MULTIPLE => return Ok(None),
        other => return Err(ObservationError::UnknownKeyAction(other)),
    }

    let intent = match key_code {
        KEYCODE_BACK => NavigationIntent::BackRequested,
        KEYCODE_HOME => NavigationIntent::HomeRequested,
        KEYCODE_APP_SWITCH => NavigationIntent::AppSwitchRequested,
        _ => return Ok(None),
    };

    Ok(Some(intent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::TYPE_WINDOW_CONTENT_CHANGED;

    #[test]
    fn navigation_keys_classify_on_key_down() {
        assert_eq!(
            classify(&RawObservation::key_down(KEYCODE_BACK)),
            Ok(Some(NavigationIntent::BackRequested))
        );
        assert_eq!(
            classify(&RawObservation::key_down(KEYCODE_HOME)),
            Ok(Some(NavigationIntent::HomeRequested))
        );
        assert_eq!(
            classify(&RawObservation::key_down(KEYCODE_APP_SWITCH)),
            Ok(Some(NavigationIntent::AppSwitchRequested))
        );
    }

    #[test]
    fn key_up_is_ignored() {
        for key in [KEYCODE_BACK, KEYCODE_HOME, KEYCODE_APP_SWITCH] {
            assert_eq!(classify(&RawObservation::key_up(key)), Ok(None));
            assert_eq!(
                classify(&RawObservation::Key { key_code: key, action: ACTION_MULTIPLE }),
                Ok(None)
            );
        }
    }

    #[test]
    fn unrelated_keys_pass_through() {
        // KEYCODE_VOLUME_UP
        assert_eq!(classify(&RawObservation::key_down(24)), Ok(None));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(
            classify(&RawObservation::Key { key_code: KEYCODE_BACK, action: 9 }),
            Err(ObservationError::UnknownKeyAction(9))
        );
        assert_eq!(
            classify(&RawObservation::key_down(-1)),
            Err(ObservationError::InvalidKeyCode(-1))
        );
    }

    #[test]
    fn window_state_change_carries_identity() {
        assert_eq!(
            classify(&RawObservation::window_changed("com.android.systemui")),
            Ok(Some(NavigationIntent::foreground("com.android.systemui")))
        );
    }

    #[test]
    fn window_state_change_without_package_is_invalid() {
        let missing =
            RawObservation::Accessibility { event_type: TYPE_WINDOW_STATE_CHANGED, package: None };
        assert_eq!(classify(&missing), Err(ObservationError::MissingPackage));
        assert_eq!(
            classify(&RawObservation::window_changed("  ")),
            Err(ObservationError::MissingPackage)
        );
    }

    #[test]
    fn other_accessibility_events_are_ignored() {
        let content = RawObservation::Accessibility {
            event_type: TYPE_WINDOW_CONTENT_CHANGED,
            package: None,
        };
        assert_eq!(classify(&content), Ok(None));
    }

    #[test]
    fn event_type_is_matched_exactly() {
        let combined = RawObservation::Accessibility {
            event_type: TYPE_WINDOW_STATE_CHANGED | TYPE_WINDOW_CONTENT_CHANGED,
            package: Some("other.app".into()),
        };
        assert_eq!(classify(&combined), Ok(None));
    }

    #[test]
    fn notifications_carry_no_intent() {
        assert_eq!(classify(&RawObservation::PermissionsChanged), Ok(None));
    }
}
