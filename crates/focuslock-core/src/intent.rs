//! Abstract navigation intents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Application identity (package name or equivalent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(String);

impl AppId {
    /// Wrap an application identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AppId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What the user (or the system) is trying to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationIntent {
    /// A window of `app` came to the foreground.
    ForegroundChanged {
        /// New foreground application.
        app: AppId,
    },
    /// Back key or gesture.
    BackRequested,
    /// Home key or gesture.
    HomeRequested,
    /// Recents / task switcher.
    AppSwitchRequested,
}

impl NavigationIntent {
    /// Foreground change to `app`.
    pub fn foreground(app: impl Into<AppId>) -> Self {
        Self::ForegroundChanged { app: app.into() }
    }

    /// True for back, home and app-switch requests.
    pub fn is_navigation_key(&self) -> bool {
        matches!(self, Self::BackRequested | Self::HomeRequested | Self::AppSwitchRequested)
    }

    /// New foreground application, for foreground changes.
    pub fn foreground_app(&self) -> Option<&AppId> {
        match self {
            Self::ForegroundChanged { app } => Some(app),
            Self::BackRequested | Self::HomeRequested | Self::AppSwitchRequested => None,
        }
    }
}
