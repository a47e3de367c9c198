//! Raw platform observations.
//!
//! These mirror what the platform callbacks hand over: accessibility events
//! with a numeric type and an optional package, key events with raw key codes
//! and actions, and lock-task mode or permission notifications. Nothing here
//! is validated; that is the classifier's job.

use serde::{Deserialize, Serialize};

/// Accessibility event type for a window state change.
pub const TYPE_WINDOW_STATE_CHANGED: u32 = 0x0000_0020;

/// Accessibility event type for window content changes (not classified).
pub const TYPE_WINDOW_CONTENT_CHANGED: u32 = 0x0000_0800;

/// Home key.
pub const KEYCODE_HOME: i32 = 3;

/// Back key.
pub const KEYCODE_BACK: i32 = 4;

/// Recents / app switch key.
pub const KEYCODE_APP_SWITCH: i32 = 187;

/// Key pressed.
pub const ACTION_DOWN: i32 = 0;

/// Key released.
pub const ACTION_UP: i32 = 1;

/// Repeated key sequence.
pub const ACTION_MULTIPLE: i32 = 2;

/// Lock task (screen pinning) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LockTaskMode {
    /// Not in lock task mode.
    #[default]
    None,
    /// User-initiated screen pinning, escapable.
    Pinned,
    /// Device-owner lock task mode, not escapable.
    Locked,
}

impl LockTaskMode {
    /// Map the platform's raw mode constant.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Locked),
            2 => Some(Self::Pinned),
            _ => None,
        }
    }

    /// True if any lock task mode is active.
    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

/// An unprocessed observation from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawObservation {
    /// Accessibility callback.
    Accessibility {
        /// Platform event type; only an exact window-state-changed value counts.
        event_type: u32,
        /// Package that owns the event's window, if reported.
        package: Option<String>,
    },

    /// Key event callback.
    Key {
        /// Platform key code.
        key_code: i32,
        /// Platform key action.
        action: i32,
    },

    /// Result of a lock task mode query, or a mode change notification.
    LockTaskModeChanged {
        /// Current mode.
        mode: LockTaskMode,
    },

    /// A permission was granted or revoked outside the app.
    PermissionsChanged,
}

impl RawObservation {
    /// Window state change reported for `package`.
    pub fn window_changed(package: impl Into<String>) -> Self {
        Self::Accessibility {
            event_type: TYPE_WINDOW_STATE_CHANGED,
            package: Some(package.into()),
        }
    }

    /// Key pressed.
    pub fn key_down(key_code: i32) -> Self {
        Self::Key { key_code, action: ACTION_DOWN }
    }

    /// Key released.
    pub fn key_up(key_code: i32) -> Self {
        Self::Key { key_code, action: ACTION_UP }
    }

    /// True if this observation may mean the capability set changed.
    pub fn invalidates_capabilities(&self) -> bool {
        matches!(self, Self::LockTaskModeChanged { .. } | Self::PermissionsChanged)
    }
}
