//! Engine entry point.
//!
//! [`Engine::observe`] is the single entry point platform adapters call for
//! every observation. It classifies, reads the lock store and capability
//! probe exactly once, decides through the [`Enforcer`], and hands each
//! non-`Allow` action to the executor.
//!
//! The engine never panics across this boundary and never retries. Every
//! call returns a definite [`Evaluation`] or an explicit [`EngineError`].

use serde::Serialize;

use crate::{
    action::{ActionContext, EnforcementAction},
    capability::{CapabilityProbe, CapabilitySet},
    classifier::classify,
    enforcer::Enforcer,
    error::EngineError,
    executor::ActionExecutor,
    intent::{AppId, NavigationIntent},
    lock::{LockState, LockStateStore},
    observation::RawObservation,
};

/// Package of the stock FocusLock application.
pub const DEFAULT_GUARDED_APP: &str = "com.example.focuslock";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Application the lock keeps the user inside.
    pub guarded_app: AppId,
    /// Whether the platform can dismiss the notification shade and dialogs.
    pub dismiss_supported: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { guarded_app: AppId::new(DEFAULT_GUARDED_APP), dismiss_supported: true }
    }
}

/// Result of evaluating one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Classified intent. `None` if the observation carried no intent.
    pub intent: Option<NavigationIntent>,
    /// Lock state read for this evaluation.
    pub lock: LockState,
    /// Capabilities probed for this evaluation. `None` if no intent.
    #[serde(skip)]
    pub capabilities: Option<CapabilitySet>,
    /// Decided actions, primary decision first.
    pub actions: Vec<EnforcementAction>,
    /// Non-fatal condition met while deciding (fallback tier or rejected
    /// observation).
    #[serde(skip)]
    pub notice: Option<EngineError>,
}

impl Evaluation {
    fn passthrough(lock: LockState, notice: Option<EngineError>) -> Self {
        Self {
            intent: None,
            lock,
            capabilities: None,
            actions: vec![EnforcementAction::Allow],
            notice,
        }
    }

    /// Primary decision.
    pub fn primary(&self) -> EnforcementAction {
        self.actions.first().copied().unwrap_or(EnforcementAction::Allow)
    }

    /// True if the input event must be swallowed.
    pub fn consumes_input(&self) -> bool {
        self.actions.contains(&EnforcementAction::ConsumeInput)
    }

    /// True if the primary decision is anything other than `Allow`.
    ///
    /// Overlay housekeeping alone does not count.
    pub fn is_enforcing(&self) -> bool {
        self.primary().is_enforcing()
    }
}

/// Lock enforcement engine.
///
/// Generic over the lock store and capability probe so the same engine runs
/// on a device and in simulation.
pub struct Engine<S, P> {
    enforcer: Enforcer,
    store: S,
    probe: P,
    dismiss_supported: bool,
}

impl<S, P> Engine<S, P>
where
    S: LockStateStore,
    P: CapabilityProbe,
{
    /// Create an engine reading `store` and `probe`.
    pub fn new(config: EngineConfig, store: S, probe: P) -> Self {
        Self {
            enforcer: Enforcer::new(config.guarded_app),
            store,
            probe,
            dismiss_supported: config.dismiss_supported,
        }
    }

    /// Decide the actions for one observation without executing them.
    ///
    /// Capability-changing notifications invalidate the probe cache first.
    /// Invalid observations are logged and evaluate to `Allow`.
    pub fn evaluate(&mut self, observation: &RawObservation) -> Evaluation {
        if observation.invalidates_capabilities() {
            self.probe.invalidate();
        }

        let lock = self.store.read_lock_state();

        let intent = match classify(observation) {
            Ok(Some(intent)) => intent,
            Ok(None) => return Evaluation::passthrough(lock, None),
            Err(e) => {
                let notice = EngineError::from(e);
                tracing::warn!(?observation, error = %notice, "Ignoring invalid observation");
                return Evaluation::passthrough(lock, Some(notice));
            },
        };

        let capabilities = self.probe.current_capabilities();
        let verdict = self.enforcer.handle(&intent, lock, capabilities);

        if let Some(fallback) = &verdict.fallback {
            tracing::debug!(?intent, reason = %fallback, "Falling back to foreground suppression");
        }
        tracing::debug!(
            ?intent,
            ?lock,
            ?capabilities,
            tier = ?capabilities.tier(),
            actions = ?verdict.actions,
            "Evaluated"
        );

        Evaluation {
            intent: Some(intent),
            lock,
            capabilities: Some(capabilities),
            actions: verdict.actions,
            notice: verdict.fallback,
        }
    }

    /// Evaluate an observation and execute the decided actions.
    ///
    /// Every decided action is attempted even if an earlier one fails, so an
    /// overlay can still cover a failed restore.
    ///
    /// # Errors
    ///
    /// - `EngineError::ExecutionFailed` for the first action the executor
    ///   could not perform. Later failures are logged.
    pub fn observe<X>(
        &mut self,
        observation: &RawObservation,
        executor: &mut X,
    ) -> Result<Evaluation, EngineError>
    where
        X: ActionExecutor + ?Sized,
    {
        let evaluation = self.evaluate(observation);
        self.execute(evaluation, executor)
    }

    fn execute<X>(
        &mut self,
        evaluation: Evaluation,
        executor: &mut X,
    ) -> Result<Evaluation, EngineError>
    where
        X: ActionExecutor + ?Sized,
    {
        let guarded_app = self.enforcer.guarded_app().clone();
        let ctx = ActionContext {
            guarded_app: &guarded_app,
            intent: evaluation.intent.as_ref(),
            dismiss_supported: self.dismiss_supported,
        };

        let mut first_failure = None;
        for &action in evaluation.actions.iter().filter(|a| a.is_enforcing()) {
            let result = executor.execute(action, &ctx);
            self.enforcer.record_outcome(action, result.is_ok());

            if let Err(e) = result {
                tracing::warn!(%action, error = %e, "Executor failed");
                if first_failure.is_none() {
                    first_failure = Some((action, e));
                }
            }
        }

        match first_failure {
            None => Ok(evaluation),
            Some((action, source)) => Err(EngineError::ExecutionFailed {
                action,
                source,
                evaluation: Box::new(evaluation),
            }),
        }
    }

    /// Record an overlay show or hide performed outside [`Engine::observe`],
    /// such as a host command, so the mirror keeps tracking the device.
    pub fn confirm_overlay(&mut self, action: EnforcementAction, succeeded: bool) {
        if action.is_overlay() {
            self.enforcer.record_outcome(action, succeeded);
        }
    }

    /// Drop any cached capability answer.
    pub fn invalidate_capabilities(&mut self) {
        self.probe.invalidate();
    }

    /// The enforcement state machine.
    pub fn enforcer(&self) -> &Enforcer {
        &self.enforcer
    }

    /// The lock store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The capability probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Mutable access to the capability probe.
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }
}
