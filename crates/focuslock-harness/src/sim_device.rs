//! Simulated host device.
//!
//! `SimDevice` implements [`Platform`] over an in-memory phone: a foreground
//! app, a notification shade, an overlay window, capability statuses and a
//! lock task mode. It records every platform call and queues the
//! observations a real device would emit in response, so tests can deliver
//! them back into the engine when they choose.
//!
//! The shade models the race that makes dismissal order matter: a restore
//! issued while the shade is open has no effect.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use focuslock_app::{Platform, PlatformError, Rect, ScreenSize};
use focuslock_core::{
    AppId, Capability, CapabilityReport, LockTaskMode, ProbeStatus, RawObservation,
};
use serde::Serialize;

use crate::sim_env::SimEnv;

/// Package that hosts the home screen.
pub const LAUNCHER: &str = "com.android.launcher";

/// A platform call, as recorded by [`SimDevice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlatformCall {
    /// `dismiss_system_surfaces`
    Dismiss,
    /// `bring_to_foreground`
    Restore(String),
    /// `show_overlay`
    ShowOverlay,
    /// `hide_overlay`
    HideOverlay,
    /// `set_lock_task_packages`
    Whitelist(Vec<String>),
    /// `start_lock_task`
    StartLockTask,
    /// `stop_lock_task`
    StopLockTask,
    /// `request_device_admin`
    RequestDeviceAdmin,
    /// `open_accessibility_settings`
    OpenAccessibilitySettings,
    /// `open_overlay_settings`
    OpenOverlaySettings {
        /// Whether the package-specific screen was requested.
        specific: bool,
    },
    /// `set_gesture_exclusion`
    GestureExclusion(usize),
}

/// One recorded call and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    /// The call.
    pub call: PlatformCall,
    /// True if the device reported success.
    pub ok: bool,
}

#[derive(Debug)]
struct DeviceState {
    package: AppId,
    foreground: AppId,
    shade_open: bool,
    overlay_drawn: bool,
    report: CapabilityReport,
    device_owner: Option<bool>,
    lock_task_mode: LockTaskMode,
    whitelist: Vec<AppId>,
    multi_window: bool,
    screen: ScreenSize,
    gesture_rects: usize,
    dismiss_supported: bool,
    fail_next: u32,
    chaos: Option<(SimEnv, f64)>,
    calls: Vec<CallRecord>,
    pending: VecDeque<RawObservation>,
}

impl DeviceState {
    /// Consume one injected failure, if any is armed.
    fn injected_failure(&mut self) -> bool {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return true;
        }
        match &self.chaos {
            Some((env, rate)) => env.chance(*rate),
            None => false,
        }
    }

    fn record(&mut self, call: PlatformCall, result: Result<(), PlatformError>) -> Result<(), PlatformError> {
        self.calls.push(CallRecord { call, ok: result.is_ok() });
        result
    }

    fn attempt(&mut self, call: PlatformCall) -> Result<(), PlatformError> {
        let result = if self.injected_failure() {
            Err(PlatformError::Failed(format!("injected failure: {call:?}")))
        } else {
            Ok(())
        };
        self.record(call, result)
    }

    fn set_lock_task_mode(&mut self, mode: LockTaskMode) {
        if self.lock_task_mode != mode {
            self.lock_task_mode = mode;
            self.pending.push_back(RawObservation::LockTaskModeChanged { mode });
        }
    }
}

/// Handle to a simulated device. Clones share the same device.
#[derive(Debug, Clone)]
pub struct SimDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimDevice {
    /// A device running `package` in the foreground with no capabilities
    /// granted.
    pub fn new(package: impl Into<AppId>) -> Self {
        let package = package.into();
        let state = DeviceState {
            foreground: package.clone(),
            package,
            shade_open: false,
            overlay_drawn: false,
            report: CapabilityReport::from_set(focuslock_core::CapabilitySet::empty()),
            device_owner: Some(false),
            lock_task_mode: LockTaskMode::None,
            whitelist: Vec::new(),
            multi_window: false,
            screen: ScreenSize { width: 1080, height: 2400 },
            gesture_rects: 0,
            dismiss_supported: true,
            fail_next: 0,
            chaos: None,
            calls: Vec::new(),
            pending: VecDeque::new(),
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The user switches to `app`. Returns the resulting window event.
    pub fn launch(&self, app: impl Into<AppId>) -> RawObservation {
        let app = app.into();
        let mut state = self.state();
        state.foreground = app.clone();
        RawObservation::window_changed(app.as_str())
    }

    /// The user pulls down the notification shade.
    pub fn open_shade(&self) {
        self.state().shade_open = true;
    }

    /// Change one capability status. Returns the permission notification.
    pub fn set_status(&self, capability: Capability, status: ProbeStatus) -> RawObservation {
        self.state().report.set(capability, status);
        RawObservation::PermissionsChanged
    }

    /// Grant one capability.
    pub fn grant(&self, capability: Capability) -> RawObservation {
        self.set_status(capability, ProbeStatus::Granted)
    }

    /// Revoke one capability.
    pub fn revoke(&self, capability: Capability) -> RawObservation {
        self.set_status(capability, ProbeStatus::Denied)
    }

    /// Mark the device as owned by our package.
    pub fn set_device_owner(&self, owner: bool) {
        self.state().device_owner = Some(owner);
    }

    /// Whether the platform can dismiss system surfaces.
    pub fn set_dismiss_supported(&self, supported: bool) {
        self.state().dismiss_supported = supported;
    }

    /// Fail the next `n` fallible platform calls.
    pub fn fail_next(&self, n: u32) {
        self.state().fail_next = n;
    }

    /// Fail each fallible call with probability `rate`, drawn from `env`.
    pub fn set_chaos(&self, env: SimEnv, rate: f64) {
        self.state().chaos = Some((env, rate));
    }

    /// Drain the observations the device emitted since the last call.
    pub fn take_pending(&self) -> Vec<RawObservation> {
        self.state().pending.drain(..).collect()
    }

    /// Number of queued observations.
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// Drain the call log.
    pub fn take_calls(&self) -> Vec<CallRecord> {
        std::mem::take(&mut self.state().calls)
    }

    /// App currently in the foreground.
    pub fn foreground(&self) -> AppId {
        self.state().foreground.clone()
    }

    /// True if the overlay window is drawn.
    pub fn overlay_drawn(&self) -> bool {
        self.state().overlay_drawn
    }

    /// True if the notification shade is open.
    pub fn shade_open(&self) -> bool {
        self.state().shade_open
    }

    /// Current capability statuses.
    pub fn report(&self) -> CapabilityReport {
        self.state().report
    }

    /// Number of gesture exclusion rectangles installed.
    pub fn gesture_rects(&self) -> usize {
        self.state().gesture_rects
    }
}

fn answer(status: ProbeStatus) -> Option<bool> {
    match status {
        ProbeStatus::Granted => Some(true),
        ProbeStatus::Denied => Some(false),
        ProbeStatus::Unknown => None,
    }
}

impl Platform for SimDevice {
    fn package_name(&self) -> AppId {
        self.state().package.clone()
    }

    fn is_device_owner(&self) -> Option<bool> {
        self.state().device_owner
    }

    fn is_admin_active(&self) -> Option<bool> {
        answer(self.state().report.device_admin)
    }

    fn is_lock_task_permitted(&self) -> Option<bool> {
        answer(self.state().report.strict_kiosk)
    }

    fn is_accessibility_enabled(&self) -> Option<bool> {
        answer(self.state().report.input_interception)
    }

    fn can_draw_overlays(&self) -> Option<bool> {
        answer(self.state().report.overlay_draw)
    }

    fn lock_task_mode(&self) -> LockTaskMode {
        self.state().lock_task_mode
    }

    fn is_multi_window(&self) -> bool {
        self.state().multi_window
    }

    fn screen_size(&self) -> ScreenSize {
        self.state().screen
    }

    fn set_lock_task_packages(&mut self, packages: &[AppId]) -> Result<(), PlatformError> {
        let mut state = self.state();
        let call = PlatformCall::Whitelist(packages.iter().map(|p| p.as_str().to_string()).collect());
        if state.device_owner != Some(true) {
            return state.record(call, Err(PlatformError::PermissionDenied("not device owner".into())));
        }
        state.attempt(call)?;
        state.whitelist = packages.to_vec();
        Ok(())
    }

    fn start_lock_task(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.attempt(PlatformCall::StartLockTask)?;
        let package = state.package.clone();
        let mode = if state.whitelist.contains(&package) {
            LockTaskMode::Locked
        } else {
            LockTaskMode::Pinned
        };
        state.set_lock_task_mode(mode);
        Ok(())
    }

    fn stop_lock_task(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.attempt(PlatformCall::StopLockTask)?;
        state.set_lock_task_mode(LockTaskMode::None);
        Ok(())
    }

    fn request_device_admin(&mut self, _explanation: &str) -> Result<(), PlatformError> {
        self.state().record(PlatformCall::RequestDeviceAdmin, Ok(()))
    }

    fn bring_to_foreground(&mut self, app: &AppId) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.attempt(PlatformCall::Restore(app.as_str().to_string()))?;

        // The open shade swallows the task reorder.
        if state.shade_open {
            tracing::debug!(%app, "Restore swallowed by open shade");
            return Ok(());
        }
        if state.foreground != *app {
            state.foreground = app.clone();
            state.pending.push_back(RawObservation::window_changed(app.as_str()));
        }
        Ok(())
    }

    fn dismiss_system_surfaces(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state();
        if !state.dismiss_supported {
            return state.record(
                PlatformCall::Dismiss,
                Err(PlatformError::Unsupported("system dialog dismissal".into())),
            );
        }
        state.attempt(PlatformCall::Dismiss)?;
        state.shade_open = false;
        Ok(())
    }

    fn open_accessibility_settings(&mut self) -> Result<(), PlatformError> {
        self.state().record(PlatformCall::OpenAccessibilitySettings, Ok(()))
    }

    fn open_overlay_settings(&mut self, package: Option<&AppId>) -> Result<(), PlatformError> {
        self.state().record(PlatformCall::OpenOverlaySettings { specific: package.is_some() }, Ok(()))
    }

    fn set_gesture_exclusion(&mut self, rects: &[Rect]) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.gesture_rects = rects.len();
        state.record(PlatformCall::GestureExclusion(rects.len()), Ok(()))
    }

    fn show_overlay(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state();
        if !state.report.overlay_draw.is_granted() {
            return state.record(
                PlatformCall::ShowOverlay,
                Err(PlatformError::PermissionDenied("overlay permission revoked".into())),
            );
        }
        state.attempt(PlatformCall::ShowOverlay)?;
        state.overlay_drawn = true;
        Ok(())
    }

    fn hide_overlay(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.attempt(PlatformCall::HideOverlay)?;
        state.overlay_drawn = false;
        Ok(())
    }
}
