//! Commands the UI layer sends to the host.
//!
//! Commands arrive as method names over the platform channel. Parsing an
//! unknown name yields [`CommandError::NotImplemented`] so the caller gets a
//! definite answer instead of silence.

use std::{fmt, str::FromStr};

use focuslock_core::EnforcementAction;
use serde::Serialize;

use crate::{error::CommandError, platform::ScreenSize};

/// A host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Enter lock task mode, whitelisting ourselves first if device owner.
    StartLockTask,
    /// Leave lock task mode.
    StopLockTask,
    /// Ask the user to activate device administration.
    EnableDeviceAdmin,
    /// Whether lock task mode is permitted for our package.
    IsLockTaskPermitted,
    /// Whether any lock task mode is active.
    IsInLockTaskMode,
    /// Reorder our task to the front.
    BringAppToForeground,
    /// Open the system accessibility settings.
    OpenAccessibilitySettings,
    /// Whether we are the device owner.
    IsDeviceOwner,
    /// Whether we run in multi-window or picture-in-picture mode.
    CheckMultiWindow,
    /// Exclude the screen edges from back gestures.
    SetBackGestureExclusion,
    /// Physical screen size in pixels.
    GetRealScreenSize,
    /// Draw the blocking overlay.
    ShowOverlay,
    /// Remove the blocking overlay.
    HideOverlay,
    /// Whether the overlay permission is granted.
    CheckOverlayPermission,
    /// Open the overlay permission settings.
    RequestOverlayPermission,
    /// Whether device administration is active.
    IsAdminActive,
    /// Whether our accessibility service is enabled.
    IsAccessibilityEnabled,
}

impl Command {
    /// Every command.
    pub const ALL: [Self; 17] = [
        Self::StartLockTask,
        Self::StopLockTask,
        Self::EnableDeviceAdmin,
        Self::IsLockTaskPermitted,
        Self::IsInLockTaskMode,
        Self::BringAppToForeground,
        Self::OpenAccessibilitySettings,
        Self::IsDeviceOwner,
        Self::CheckMultiWindow,
        Self::SetBackGestureExclusion,
        Self::GetRealScreenSize,
        Self::ShowOverlay,
        Self::HideOverlay,
        Self::CheckOverlayPermission,
        Self::RequestOverlayPermission,
        Self::IsAdminActive,
        Self::IsAccessibilityEnabled,
    ];

    /// Engine overlay action this command performs, if any.
    pub fn overlay_action(self) -> Option<EnforcementAction> {
        match self {
            Self::ShowOverlay => Some(EnforcementAction::ShowOverlay),
            Self::HideOverlay => Some(EnforcementAction::HideOverlay),
            _ => None,
        }
    }

    /// Channel method name.
    pub fn method(self) -> &'static str {
        match self {
            Self::StartLockTask => "startLockTask",
            Self::StopLockTask => "stopLockTask",
            Self::EnableDeviceAdmin => "enableDeviceAdmin",
            Self::IsLockTaskPermitted => "isLockTaskPermitted",
            Self::IsInLockTaskMode => "isInLockTaskMode",
            Self::BringAppToForeground => "bringAppToForeground",
            Self::OpenAccessibilitySettings => "openAccessibilitySettings",
            Self::IsDeviceOwner => "isDeviceOwner",
            Self::CheckMultiWindow => "checkMultiWindow",
            Self::SetBackGestureExclusion => "setBackGestureExclusion",
            Self::GetRealScreenSize => "getRealScreenSize",
            Self::ShowOverlay => "showOverlay",
            Self::HideOverlay => "hideOverlay",
            Self::CheckOverlayPermission => "checkOverlayPermission",
            Self::RequestOverlayPermission => "requestOverlayPermission",
            Self::IsAdminActive => "isAdminActive",
            Self::IsAccessibilityEnabled => "isAccessibilityEnabled",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.method() == s)
            .ok_or_else(|| CommandError::NotImplemented(s.to_string()))
    }
}

/// Successful command result.
///
/// Serializes the way the channel expects: `null`, a boolean, or a
/// `{width, height}` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// No value.
    Unit,
    /// Boolean answer.
    Bool(bool),
    /// Screen dimensions.
    ScreenSize(ScreenSize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for command in Command::ALL {
            assert_eq!(command.method().parse::<Command>(), Ok(command));
        }
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        assert_eq!(
            "setMaxVolume".parse::<Command>(),
            Err(CommandError::NotImplemented("setMaxVolume".to_string()))
        );
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert!("StartLockTask".parse::<Command>().is_err());
    }
}
