//! Fluent scenario builder.
//!
//! Scenarios describe a short story (lock, grant, switch apps, press keys)
//! and run it against a fresh [`SimWorld`]:
//!
//! ```ignore
//! let outcome = Scenario::new()
//!     .grant(Capability::OverlayDraw)
//!     .locked()
//!     .launch("other.app")
//!     .run();
//! assert!(outcome.overlay_drawn);
//! ```

use std::time::Duration;

use focuslock_app::{Command, CommandError, Reply, RuntimeStats};
use focuslock_core::{AppId, Capability, ProbeStatus, RawObservation, observation::ACTION_DOWN};

use crate::{
    invariants::Violation,
    sim_world::{SimConfig, SimWorld, TraceEntry},
};

/// One scenario step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Engage the lock.
    Lock,
    /// Release the lock.
    Unlock,
    /// Set a capability status and deliver the notification.
    Status(Capability, ProbeStatus),
    /// The user switches to an app.
    Launch(AppId),
    /// A key event.
    Key {
        /// Platform key code.
        key_code: i32,
        /// Platform key action.
        action: i32,
    },
    /// Any raw observation.
    Observe(RawObservation),
    /// The user opens the notification shade.
    OpenShade,
    /// Fail the next n platform calls.
    FailNext(u32),
    /// Move virtual time forward.
    Advance(Duration),
    /// Deliver observations the device queued.
    DeliverPending,
    /// Run a host command.
    Command(Command),
}

/// Result of running a scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Every evaluation, in order.
    pub trace: Vec<TraceEntry>,
    /// Invariant violations seen along the way.
    pub violations: Vec<Violation>,
    /// Replies to command steps, in order.
    pub replies: Vec<Result<Reply, CommandError>>,
    /// Foreground app at the end.
    pub foreground: AppId,
    /// Whether the overlay is drawn at the end.
    pub overlay_drawn: bool,
    /// Runtime counters.
    pub stats: RuntimeStats,
}

impl ScenarioOutcome {
    /// True if no invariant was violated.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// The last evaluation, if any.
    pub fn last(&self) -> Option<&TraceEntry> {
        self.trace.last()
    }
}

/// Scenario builder.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    config: SimConfig,
    steps: Vec<Step>,
}

impl Scenario {
    /// Empty scenario with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the environment RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Simulate a platform without system dialog dismissal.
    pub fn without_dismissal(mut self) -> Self {
        self.config.dismiss_supported = false;
        self
    }

    /// Append an arbitrary step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Engage the lock.
    pub fn locked(self) -> Self {
        self.step(Step::Lock)
    }

    /// Release the lock.
    pub fn unlocked(self) -> Self {
        self.step(Step::Unlock)
    }

    /// Grant a capability.
    pub fn grant(self, capability: Capability) -> Self {
        self.step(Step::Status(capability, ProbeStatus::Granted))
    }

    /// Revoke a capability.
    pub fn revoke(self, capability: Capability) -> Self {
        self.step(Step::Status(capability, ProbeStatus::Denied))
    }

    /// Make a capability's status undeterminable.
    pub fn unknown(self, capability: Capability) -> Self {
        self.step(Step::Status(capability, ProbeStatus::Unknown))
    }

    /// The user switches to `app`.
    pub fn launch(self, app: impl Into<AppId>) -> Self {
        self.step(Step::Launch(app.into()))
    }

    /// The user presses `key_code`.
    pub fn press(self, key_code: i32) -> Self {
        self.step(Step::Key { key_code, action: ACTION_DOWN })
    }

    /// Feed a raw observation.
    pub fn observe(self, observation: RawObservation) -> Self {
        self.step(Step::Observe(observation))
    }

    /// The user opens the notification shade.
    pub fn open_shade(self) -> Self {
        self.step(Step::OpenShade)
    }

    /// Fail the next `n` platform calls.
    pub fn fail_next(self, n: u32) -> Self {
        self.step(Step::FailNext(n))
    }

    /// Move virtual time forward.
    pub fn advance(self, duration: Duration) -> Self {
        self.step(Step::Advance(duration))
    }

    /// Deliver observations the device queued.
    pub fn deliver_pending(self) -> Self {
        self.step(Step::DeliverPending)
    }

    /// Run a host command.
    pub fn command(self, command: Command) -> Self {
        self.step(Step::Command(command))
    }

    /// Run every step against a fresh world.
    pub fn run(self) -> ScenarioOutcome {
        let mut world = SimWorld::new(self.config);
        let mut replies = Vec::new();

        for step in self.steps {
            apply(&mut world, step, &mut replies);
        }

        ScenarioOutcome {
            trace: world.trace().to_vec(),
            violations: world.violations().to_vec(),
            replies,
            foreground: world.device().foreground(),
            overlay_drawn: world.device().overlay_drawn(),
            stats: world.stats(),
        }
    }
}

fn apply(world: &mut SimWorld, step: Step, replies: &mut Vec<Result<Reply, CommandError>>) {
    match step {
        Step::Lock => world.lock(),
        Step::Unlock => world.unlock(),
        Step::Status(capability, status) => {
            world.set_status(capability, status);
        },
        Step::Launch(app) => {
            world.launch(app);
        },
        Step::Key { key_code, action } => {
            world.observe(RawObservation::Key { key_code, action });
        },
        Step::Observe(observation) => {
            world.observe(observation);
        },
        Step::OpenShade => world.open_shade(),
        Step::FailNext(n) => world.fail_next(n),
        Step::Advance(duration) => world.advance(duration),
        Step::DeliverPending => {
            world.deliver_pending();
        },
        Step::Command(command) => replies.push(world.command(command)),
    }
}
