//! Simulation world: the production runtime wired to a simulated device.
//!
//! The world runs the real [`Runtime`] synchronously over a [`SimDevice`], so
//! the exact engine, probe cache and executor code that ships is what the
//! tests exercise. After every evaluation it snapshots engine and device state
//! and runs the invariant registry.

use std::time::Duration;

use focuslock_app::{
    Command, CommandError, PlatformExecutor, PlatformProbe, Reply, Runtime, RuntimeConfig,
    RuntimeStats,
};
use focuslock_core::{
    AppId, CachedProbe, Capability, CapabilitySet, EnforcementAction, Engine, EngineConfig,
    Evaluation, LockState, LockStateStore, NavigationIntent, OverlayVisibility, ProbeCacheConfig,
    ProbeStatus, RawObservation, SharedLockFlag, engine::DEFAULT_GUARDED_APP,
};
use serde::Serialize;

use crate::{
    invariants::{InvariantRegistry, SystemSnapshot, Violation},
    sim_device::SimDevice,
    sim_env::SimEnv,
};

/// Upper bound on feedback rounds in [`SimWorld::deliver_pending`].
const MAX_DELIVERY_ROUNDS: usize = 16;

/// Simulation configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// App the lock keeps the user inside.
    pub guarded_app: AppId,
    /// Whether the device can dismiss system surfaces.
    pub dismiss_supported: bool,
    /// Capability cache lifetime.
    pub probe_ttl: Duration,
    /// Seed for the environment RNG.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            guarded_app: AppId::new(DEFAULT_GUARDED_APP),
            dismiss_supported: true,
            probe_ttl: ProbeCacheConfig::default().ttl,
            seed: 0,
        }
    }
}

/// Runtime type the simulation drives.
pub type SimRuntime = Runtime<
    SharedLockFlag,
    CachedProbe<PlatformProbe<SimDevice>, SimEnv>,
    PlatformExecutor<SimDevice>,
>;

/// One evaluation, as recorded in the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Observation fed to the engine.
    pub observation: RawObservation,
    /// Lock state the engine read.
    pub lock: LockState,
    /// Decided actions, primary first.
    pub actions: Vec<EnforcementAction>,
    /// Execution error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
    /// Foreground app afterwards.
    pub foreground: String,
    /// Whether the overlay is drawn afterwards.
    pub overlay_drawn: bool,
}

struct Decided {
    lock: LockState,
    intent: Option<NavigationIntent>,
    capabilities: Option<CapabilitySet>,
    actions: Vec<EnforcementAction>,
}

impl From<&Evaluation> for Decided {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            lock: evaluation.lock,
            intent: evaluation.intent.clone(),
            capabilities: evaluation.capabilities,
            actions: evaluation.actions.clone(),
        }
    }
}

/// Production runtime over a simulated device.
pub struct SimWorld {
    runtime: SimRuntime,
    device: SimDevice,
    lock: SharedLockFlag,
    env: SimEnv,
    guarded_app: AppId,
    registry: InvariantRegistry,
    trace: Vec<TraceEntry>,
    violations: Vec<Violation>,
}

impl SimWorld {
    /// Build a world from `config`, unlocked and with nothing granted.
    pub fn new(config: SimConfig) -> Self {
        let env = SimEnv::with_seed(config.seed);
        let device = SimDevice::new(config.guarded_app.clone());
        device.set_dismiss_supported(config.dismiss_supported);

        let lock = SharedLockFlag::default();
        let probe = CachedProbe::new(
            PlatformProbe::new(device.clone()),
            env.clone(),
            ProbeCacheConfig { ttl: config.probe_ttl },
        );
        let engine = Engine::new(
            EngineConfig {
                guarded_app: config.guarded_app.clone(),
                dismiss_supported: config.dismiss_supported,
            },
            lock.clone(),
            probe,
        );
        // Driven synchronously through `process`; the queue handle is unused.
        let (runtime, _sender) =
            Runtime::new(engine, PlatformExecutor::new(device.clone()), &RuntimeConfig::default());

        Self {
            runtime,
            device,
            lock,
            env,
            guarded_app: config.guarded_app,
            registry: InvariantRegistry::standard(),
            trace: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Feed one observation through the runtime and check invariants.
    pub fn observe(&mut self, observation: RawObservation) -> TraceEntry {
        // Calls made outside the engine (commands) are not attributed to it.
        self.device.take_calls();

        let result = self.runtime.process(&observation);
        let (decided, failed) = match &result {
            Ok(evaluation) => (Decided::from(evaluation), None),
            Err(e) => {
                let decided = e.evaluation().map_or_else(
                    || Decided {
                        lock: self.lock.read_lock_state(),
                        intent: None,
                        capabilities: None,
                        actions: Vec::new(),
                    },
                    Decided::from,
                );
                (decided, Some(e.to_string()))
            },
        };

        let snapshot = SystemSnapshot {
            lock: decided.lock,
            capabilities: decided.capabilities,
            intent: decided.intent,
            actions: decided.actions.clone(),
            mirror: self.overlay_mirror(),
            overlay_drawn: self.device.overlay_drawn(),
            calls: self.device.take_calls(),
            foreground: self.device.foreground(),
            guarded_app: self.guarded_app.clone(),
        };
        if let Err(violations) = self.registry.check_all(&snapshot) {
            for violation in &violations {
                tracing::error!(%violation, ?observation, "Invariant violated");
            }
            self.violations.extend(violations);
        }

        let entry = TraceEntry {
            observation,
            lock: decided.lock,
            actions: decided.actions,
            failed,
            foreground: snapshot.foreground.as_str().to_string(),
            overlay_drawn: snapshot.overlay_drawn,
        };
        self.trace.push(entry.clone());
        entry
    }

    /// Deliver everything the device queued, including anything queued
    /// while delivering.
    pub fn deliver_pending(&mut self) -> Vec<TraceEntry> {
        let mut delivered = Vec::new();
        for _ in 0..MAX_DELIVERY_ROUNDS {
            let pending = self.device.take_pending();
            if pending.is_empty() {
                break;
            }
            for observation in pending {
                delivered.push(self.observe(observation));
            }
        }
        delivered
    }

    /// Run a host command against the device through the runtime.
    pub fn command(&mut self, command: Command) -> Result<Reply, CommandError> {
        self.runtime.command(command)
    }

    /// Engage the lock. Takes effect on the next evaluation.
    pub fn lock(&self) {
        self.lock.lock();
    }

    /// Release the lock. Takes effect on the next evaluation.
    pub fn unlock(&self) {
        self.lock.unlock();
    }

    /// Change a capability status and deliver the permission notification.
    pub fn set_status(&mut self, capability: Capability, status: ProbeStatus) -> TraceEntry {
        let observation = self.device.set_status(capability, status);
        self.observe(observation)
    }

    /// Grant a capability.
    pub fn grant(&mut self, capability: Capability) -> TraceEntry {
        self.set_status(capability, ProbeStatus::Granted)
    }

    /// Revoke a capability.
    pub fn revoke(&mut self, capability: Capability) -> TraceEntry {
        self.set_status(capability, ProbeStatus::Denied)
    }

    /// The user switches to `app`.
    pub fn launch(&mut self, app: impl Into<AppId>) -> TraceEntry {
        let observation = self.device.launch(app);
        self.observe(observation)
    }

    /// The user presses a key.
    pub fn press(&mut self, key_code: i32) -> TraceEntry {
        self.observe(RawObservation::key_down(key_code))
    }

    /// The user pulls down the notification shade.
    pub fn open_shade(&self) {
        self.device.open_shade();
    }

    /// Fail the next `n` platform calls.
    pub fn fail_next(&self, n: u32) {
        self.device.fail_next(n);
    }

    /// Fail each platform call with probability `rate`.
    pub fn set_chaos(&self, rate: f64) {
        self.device.set_chaos(self.env.clone(), rate);
    }

    /// Move virtual time forward.
    pub fn advance(&self, duration: Duration) {
        self.env.advance(duration);
    }

    /// The simulated device.
    pub fn device(&self) -> &SimDevice {
        &self.device
    }

    /// Current value of the lock flag.
    pub fn lock_state(&self) -> LockState {
        self.lock.read_lock_state()
    }

    /// Engine-side overlay mirror.
    pub fn overlay_mirror(&self) -> OverlayVisibility {
        self.runtime.engine().enforcer().overlay()
    }

    /// Every evaluation so far.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Every invariant violation so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Runtime counters.
    pub fn stats(&self) -> RuntimeStats {
        self.runtime.stats()
    }
}

#[cfg(test)]
mod tests {
    use focuslock_core::observation::KEYCODE_BACK;

    use super::*;

    const GUARDED: &str = "com.example.focuslock";

    #[test]
    fn restore_feedback_hides_overlay() {
        let mut world = SimWorld::new(SimConfig::default());
        world.grant(Capability::OverlayDraw);
        world.lock();

        let entry = world.launch("com.android.settings");
        assert_eq!(entry.actions, vec![
            EnforcementAction::SuppressAndRestore,
            EnforcementAction::ShowOverlay
        ]);
        assert!(entry.overlay_drawn);
        assert_eq!(world.device().foreground(), AppId::new(GUARDED));

        let delivered = world.deliver_pending();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].actions, vec![
            EnforcementAction::Allow,
            EnforcementAction::HideOverlay
        ]);
        assert!(!world.device().overlay_drawn());
        assert!(world.violations().is_empty());
    }

    #[test]
    fn stale_cache_is_refreshed_by_permission_notice() {
        let mut world = SimWorld::new(SimConfig { probe_ttl: Duration::from_secs(60), ..Default::default() });
        world.lock();
        assert_eq!(world.press(KEYCODE_BACK).actions, vec![EnforcementAction::Allow]);

        world.grant(Capability::InputInterception);
        assert_eq!(world.press(KEYCODE_BACK).actions, vec![EnforcementAction::ConsumeInput]);
    }

    #[test]
    fn failed_hide_is_retried_on_next_event() {
        let mut world = SimWorld::new(SimConfig::default());
        world.grant(Capability::OverlayDraw);
        world.lock();
        world.launch("other.app");

        world.unlock();
        world.fail_next(1);
        let entry = world.press(KEYCODE_BACK);
        assert!(entry.failed.is_some());
        assert!(world.device().overlay_drawn());
        assert_eq!(world.overlay_mirror(), OverlayVisibility::Shown);

        let entry = world.press(KEYCODE_BACK);
        assert_eq!(entry.actions, vec![EnforcementAction::Allow, EnforcementAction::HideOverlay]);
        assert!(!entry.overlay_drawn);
        assert!(world.violations().is_empty());
    }

    #[test]
    fn host_drawn_overlay_is_mirrored_and_lifted() {
        let mut world = SimWorld::new(SimConfig::default());
        world.grant(Capability::OverlayDraw);

        assert_eq!(world.command(Command::ShowOverlay), Ok(Reply::Bool(true)));
        assert_eq!(world.overlay_mirror(), OverlayVisibility::Shown);

        let entry = world.press(focuslock_core::observation::KEYCODE_HOME);
        assert_eq!(entry.actions, vec![EnforcementAction::Allow, EnforcementAction::HideOverlay]);
        assert!(!world.device().overlay_drawn());
        assert_eq!(world.overlay_mirror(), OverlayVisibility::Hidden);

        world.command(Command::ShowOverlay).unwrap();
        let entry = world.launch(GUARDED);
        assert_eq!(entry.actions, vec![EnforcementAction::Allow, EnforcementAction::HideOverlay]);
        assert!(!world.device().overlay_drawn());
        assert!(world.violations().is_empty());
    }
}
