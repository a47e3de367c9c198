//! Operations for model-based testing.
//!
//! Operations represent everything the user or the OS can do to a locked
//! device. They are generated randomly and applied to both the model and the
//! real implementation.

use arbitrary::Arbitrary;
use focuslock_core::{
    Capability,
    observation::{KEYCODE_APP_SWITCH, KEYCODE_BACK, KEYCODE_HOME},
};

/// Volume-up key, a key the engine never classifies.
pub const KEYCODE_VOLUME_UP: i32 = 24;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Engage the lock.
    Lock,

    /// Release the lock.
    Unlock,

    /// The user grants a permission in system settings.
    Grant {
        /// Capability granted.
        capability: ModelCapability,
    },

    /// The user revokes a permission in system settings.
    Revoke {
        /// Capability revoked.
        capability: ModelCapability,
    },

    /// The user switches to an app.
    Launch {
        /// App brought to the front.
        app: ModelApp,
    },

    /// The user presses a key.
    PressKey {
        /// Key pressed.
        key: ModelKey,
    },

    /// The user pulls down the notification shade.
    OpenShade,

    /// Deliver the window events the device queued.
    DeliverPending,

    /// Advance simulation time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

/// Capability selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Arbitrary)]
pub enum ModelCapability {
    /// [`Capability::StrictKiosk`]
    StrictKiosk,
    /// [`Capability::InputInterception`]
    InputInterception,
    /// [`Capability::OverlayDraw`]
    OverlayDraw,
    /// [`Capability::DeviceAdmin`]
    DeviceAdmin,
}

impl ModelCapability {
    /// The real capability.
    pub fn to_capability(self) -> Capability {
        match self {
            Self::StrictKiosk => Capability::StrictKiosk,
            Self::InputInterception => Capability::InputInterception,
            Self::OverlayDraw => Capability::OverlayDraw,
            Self::DeviceAdmin => Capability::DeviceAdmin,
        }
    }
}

/// App selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum ModelApp {
    /// The guarded app itself.
    Guarded,
    /// The home screen.
    Launcher,
    /// System settings.
    Settings,
    /// Any third-party app.
    Browser,
}

impl ModelApp {
    /// Package name, given the guarded app's package.
    pub fn package(self, guarded: &str) -> String {
        match self {
            Self::Guarded => guarded.to_string(),
            Self::Launcher => crate::sim_device::LAUNCHER.to_string(),
            Self::Settings => "com.android.settings".to_string(),
            Self::Browser => "org.mozilla.firefox".to_string(),
        }
    }
}

/// Key selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
pub enum ModelKey {
    /// Back.
    Back,
    /// Home.
    Home,
    /// Recents.
    AppSwitch,
    /// A key the engine ignores.
    VolumeUp,
}

impl ModelKey {
    /// Platform key code.
    pub fn key_code(self) -> i32 {
        match self {
            Self::Back => KEYCODE_BACK,
            Self::Home => KEYCODE_HOME,
            Self::AppSwitch => KEYCODE_APP_SWITCH,
            Self::VolumeUp => KEYCODE_VOLUME_UP,
        }
    }

    /// True for back, home and recents.
    pub fn is_navigation(self) -> bool {
        !matches!(self, Self::VolumeUp)
    }
}
