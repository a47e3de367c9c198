//! Host platform abstraction.
//!
//! The [`Platform`] trait is the single seam between FocusLock and the
//! operating system. The same host answers channel commands through
//! [`dispatch`], reports capabilities through [`PlatformProbe`] and carries
//! out enforcement through [`PlatformExecutor`].
//!
//! Queries return `Option<bool>`: `None` means the host could not tell, which
//! the probe reports as [`ProbeStatus::Unknown`] and commands answer as
//! `false`.

use focuslock_core::{
    ActionContext, ActionExecutor, AppId, Capability, CapabilityProbe, CapabilityReport,
    EnforcementAction, EnforcementStep, ExecutionError, LockTaskMode, ProbeStatus, policy,
};
use serde::Serialize;

use crate::{
    command::{Command, Reply},
    error::{CommandError, PlatformError},
};

/// Width of each screen edge excluded from back gestures, in pixels.
pub const EDGE_EXCLUSION_PX: u32 = 200;

/// Explanation shown on the device administrator activation screen.
pub const ADMIN_EXPLANATION: &str =
    "FocusLock needs to be a device administrator to enable lock task mode.";

/// Physical screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Axis-aligned rectangle in screen pixels. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Right edge.
    pub right: u32,
    /// Bottom edge.
    pub bottom: u32,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// Strips along the top, left, right and bottom edges, `inset` pixels wide.
pub fn gesture_exclusion_rects(size: ScreenSize, inset: u32) -> [Rect; 4] {
    let ScreenSize { width, height } = size;
    [
        Rect::new(0, 0, width, inset.min(height)),
        Rect::new(0, 0, inset.min(width), height),
        Rect::new(width.saturating_sub(inset), 0, width, height),
        Rect::new(0, height.saturating_sub(inset), width, height),
    ]
}

/// Operating system services FocusLock depends on.
pub trait Platform {
    /// Our own package.
    fn package_name(&self) -> AppId;

    /// Whether we are the device owner.
    fn is_device_owner(&self) -> Option<bool>;

    /// Whether device administration is active.
    fn is_admin_active(&self) -> Option<bool>;

    /// Whether lock task mode is permitted for our package.
    fn is_lock_task_permitted(&self) -> Option<bool>;

    /// Whether our accessibility service is enabled.
    fn is_accessibility_enabled(&self) -> Option<bool>;

    /// Whether we may draw over other apps.
    fn can_draw_overlays(&self) -> Option<bool>;

    /// Current lock task mode.
    fn lock_task_mode(&self) -> LockTaskMode;

    /// Whether we run in multi-window or picture-in-picture mode.
    fn is_multi_window(&self) -> bool;

    /// Physical screen size.
    fn screen_size(&self) -> ScreenSize;

    /// Whitelist packages for lock task mode. Device owner only.
    fn set_lock_task_packages(&mut self, packages: &[AppId]) -> Result<(), PlatformError>;

    /// Enter lock task mode.
    fn start_lock_task(&mut self) -> Result<(), PlatformError>;

    /// Leave lock task mode.
    fn stop_lock_task(&mut self) -> Result<(), PlatformError>;

    /// Open the device administrator activation screen.
    fn request_device_admin(&mut self, explanation: &str) -> Result<(), PlatformError>;

    /// Reorder `app`'s task to the front.
    fn bring_to_foreground(&mut self, app: &AppId) -> Result<(), PlatformError>;

    /// Close the notification shade, recents and system dialogs.
    fn dismiss_system_surfaces(&mut self) -> Result<(), PlatformError>;

    /// Open the accessibility settings screen.
    fn open_accessibility_settings(&mut self) -> Result<(), PlatformError>;

    /// Open the overlay permission screen, for `package` if given.
    fn open_overlay_settings(&mut self, package: Option<&AppId>) -> Result<(), PlatformError>;

    /// Exclude `rects` from system back gestures.
    fn set_gesture_exclusion(&mut self, rects: &[Rect]) -> Result<(), PlatformError>;

    /// Draw the blocking overlay. Idempotent.
    fn show_overlay(&mut self) -> Result<(), PlatformError>;

    /// Remove the blocking overlay. Idempotent.
    fn hide_overlay(&mut self) -> Result<(), PlatformError>;

    /// Status of every enforcement capability.
    ///
    /// Strict kiosk is granted if lock task is permitted or we are the
    /// device owner.
    fn capability_report(&self) -> CapabilityReport {
        let strict_kiosk = match (self.is_lock_task_permitted(), self.is_device_owner()) {
            (Some(true), _) | (_, Some(true)) => ProbeStatus::Granted,
            (Some(false), Some(false)) => ProbeStatus::Denied,
            _ => ProbeStatus::Unknown,
        };

        CapabilityReport {
            strict_kiosk,
            input_interception: status(self.is_accessibility_enabled()),
            overlay_draw: status(self.can_draw_overlays()),
            device_admin: status(self.is_admin_active()),
        }
    }
}

fn status(answer: Option<bool>) -> ProbeStatus {
    answer.map_or(ProbeStatus::Unknown, ProbeStatus::from_granted)
}

/// Run one command against the host.
///
/// # Errors
///
/// - `CommandError::LockFailed` / `UnlockFailed` if lock task mode could not
///   be entered or left
/// - `CommandError::PermissionDenied` if `showOverlay` lacks the overlay
///   permission
pub fn dispatch<T: Platform + ?Sized>(
    command: Command,
    platform: &mut T,
) -> Result<Reply, CommandError> {
    tracing::debug!(%command, "Dispatching command");

    let reply = match command {
        Command::StartLockTask => {
            if platform.is_device_owner() == Some(true) {
                let package = platform.package_name();
                platform
                    .set_lock_task_packages(std::slice::from_ref(&package))
                    .map_err(CommandError::LockFailed)?;
            }
            platform.start_lock_task().map_err(CommandError::LockFailed)?;
            tracing::info!("Lock task started");
            Reply::Unit
        },

        Command::StopLockTask => {
            platform.stop_lock_task().map_err(CommandError::UnlockFailed)?;
            tracing::info!("Lock task stopped");
            Reply::Unit
        },

        Command::EnableDeviceAdmin => {
            launch(command, platform.request_device_admin(ADMIN_EXPLANATION));
            Reply::Unit
        },

        Command::IsLockTaskPermitted => {
            Reply::Bool(platform.is_lock_task_permitted().unwrap_or(false))
        },

        Command::IsInLockTaskMode => Reply::Bool(platform.lock_task_mode().is_active()),

        Command::BringAppToForeground => {
            let package = platform.package_name();
            launch(command, platform.bring_to_foreground(&package));
            Reply::Unit
        },

        Command::OpenAccessibilitySettings => {
            launch(command, platform.open_accessibility_settings());
            Reply::Unit
        },

        Command::IsDeviceOwner => Reply::Bool(platform.is_device_owner().unwrap_or(false)),

        Command::CheckMultiWindow => Reply::Bool(platform.is_multi_window()),

        Command::SetBackGestureExclusion => {
            let rects = gesture_exclusion_rects(platform.screen_size(), EDGE_EXCLUSION_PX);
            match platform.set_gesture_exclusion(&rects) {
                Ok(()) => Reply::Bool(true),
                Err(e) => {
                    tracing::debug!(error = %e, "Gesture exclusion unavailable");
                    Reply::Bool(false)
                },
            }
        },

        Command::GetRealScreenSize => Reply::ScreenSize(platform.screen_size()),

        Command::ShowOverlay => {
            let capabilities = platform.capability_report().to_set();
            policy::require(capabilities, Capability::OverlayDraw)
                .map_err(|_| CommandError::PermissionDenied("Overlay permission not granted".into()))?;
            Reply::Bool(overlay(command, platform.show_overlay()))
        },

        Command::HideOverlay => Reply::Bool(overlay(command, platform.hide_overlay())),

        Command::CheckOverlayPermission => {
            Reply::Bool(platform.can_draw_overlays().unwrap_or(false))
        },

        Command::RequestOverlayPermission => {
            let package = platform.package_name();
            if let Err(specific) = platform.open_overlay_settings(Some(&package)) {
                tracing::debug!(error = %specific, "Falling back to generic overlay settings");
                if let Err(e) = platform.open_overlay_settings(None) {
                    tracing::error!(error = %e, "Failed to open overlay settings");
                }
            }
            Reply::Unit
        },

        Command::IsAdminActive => Reply::Bool(platform.is_admin_active().unwrap_or(false)),

        Command::IsAccessibilityEnabled => {
            Reply::Bool(platform.is_accessibility_enabled().unwrap_or(false))
        },
    };

    Ok(reply)
}

/// Screen launches are fire-and-forget: failures are logged, never returned.
fn launch(command: Command, result: Result<(), PlatformError>) {
    if let Err(e) = result {
        tracing::warn!(%command, error = %e, "Failed to launch screen");
    }
}

fn overlay(command: Command, result: Result<(), PlatformError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%command, error = %e, "Overlay call failed");
            false
        },
    }
}

/// [`CapabilityProbe`] backed by a [`Platform`].
#[derive(Debug, Clone)]
pub struct PlatformProbe<T> {
    platform: T,
}

impl<T: Platform> PlatformProbe<T> {
    /// Probe `platform`.
    pub fn new(platform: T) -> Self {
        Self { platform }
    }

    /// The host platform.
    pub fn platform(&self) -> &T {
        &self.platform
    }
}

impl<T: Platform> CapabilityProbe for PlatformProbe<T> {
    fn probe(&mut self) -> CapabilityReport {
        self.platform.capability_report()
    }
}

/// [`ActionExecutor`] backed by a [`Platform`].
#[derive(Debug, Clone)]
pub struct PlatformExecutor<T> {
    platform: T,
}

impl<T: Platform> PlatformExecutor<T> {
    /// Execute actions on `platform`.
    pub fn new(platform: T) -> Self {
        Self { platform }
    }

    /// The host platform.
    pub fn platform(&self) -> &T {
        &self.platform
    }

    /// Mutable access to the host platform.
    pub fn platform_mut(&mut self) -> &mut T {
        &mut self.platform
    }

    fn step(&mut self, step: EnforcementStep, guarded_app: &AppId) -> Result<(), ExecutionError> {
        let result = match step {
            EnforcementStep::DismissSystemSurfaces => self.platform.dismiss_system_surfaces(),
            EnforcementStep::RestoreForeground => self.platform.bring_to_foreground(guarded_app),
        };
        result.map_err(|e| ExecutionError::StepFailed { step, reason: e.to_string() })
    }
}

impl<T: Platform> ActionExecutor for PlatformExecutor<T> {
    fn execute(
        &mut self,
        action: EnforcementAction,
        ctx: &ActionContext<'_>,
    ) -> Result<(), ExecutionError> {
        let result = match action {
            EnforcementAction::Allow | EnforcementAction::ConsumeInput => Ok(()),
            EnforcementAction::SuppressAndRestore => {
                // A failed dismissal must not leave the foreign app in front.
                let mut first_failure = None;
                for &step in ctx.suppress_steps() {
                    if let Err(e) = self.step(step, ctx.guarded_app) {
                        tracing::warn!(?step, error = %e, "Enforcement step failed");
                        first_failure.get_or_insert(e);
                    }
                }
                return first_failure.map_or(Ok(()), Err);
            },
            EnforcementAction::ShowOverlay => self.platform.show_overlay(),
            EnforcementAction::HideOverlay => self.platform.hide_overlay(),
        };

        result.map_err(|e| match e {
            PlatformError::PermissionDenied(reason) => ExecutionError::Rejected { action, reason },
            other => ExecutionError::Overlay(other.to_string()),
        })
    }
}
