//! Serialized observation runtime.
//!
//! Platform callbacks arrive on several threads (accessibility, key events,
//! permission broadcasts), but the engine must see them one at a time. The
//! [`Runtime`] owns the [`Engine`] and the executor and drains a bounded
//! queue; producers hold cloneable [`ObservationSender`]s.
//!
//! Every submission may carry a oneshot reply. Key callbacks use it to learn
//! whether the event was consumed before returning to the OS.

use focuslock_core::{
    ActionExecutor, CapabilityProbe, Engine, EngineError, Evaluation, LockStateStore,
    RawObservation,
};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use crate::{
    command::{Command, Reply},
    error::{CommandError, RuntimeError},
    platform::{Platform, PlatformExecutor, dispatch},
};

/// Default number of queued submissions before producers wait.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bounded queue capacity. Clamped to at least one.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { queue_capacity: DEFAULT_QUEUE_CAPACITY }
    }
}

/// Outcome delivered to a waiting submitter.
pub type ObserveResult = Result<Evaluation, EngineError>;

#[derive(Debug)]
enum Submission {
    Observe { observation: RawObservation, reply: Option<oneshot::Sender<ObserveResult>> },
    Shutdown,
}

/// Counters collected while the runtime runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Observations evaluated.
    pub observations: u64,
    /// Evaluations that decided at least one non-`Allow` action.
    pub enforced: u64,
    /// Evaluations whose execution failed.
    pub failures: u64,
    /// Observations the classifier rejected.
    pub invalid: u64,
}

impl RuntimeStats {
    fn record(&mut self, result: &ObserveResult) {
        self.observations += 1;
        match result {
            Ok(evaluation) => {
                if evaluation.is_enforcing() {
                    self.enforced += 1;
                }
                if matches!(evaluation.notice, Some(EngineError::InvalidObservation(_))) {
                    self.invalid += 1;
                }
            },
            Err(e) => {
                if e.evaluation().is_none_or(Evaluation::is_enforcing) {
                    self.enforced += 1;
                }
                self.failures += 1;
            },
        }
    }
}

/// Producer handle for the runtime queue.
#[derive(Debug, Clone)]
pub struct ObservationSender {
    tx: mpsc::Sender<Submission>,
}

impl ObservationSender {
    /// Submit an observation and wait for its evaluation.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Closed` if the runtime has stopped
    /// - `RuntimeError::ReplyDropped` if the runtime stopped before answering
    /// - `RuntimeError::Engine` if execution failed. The decided evaluation
    ///   is still available through [`EngineError::evaluation`].
    pub async fn observe(&self, observation: RawObservation) -> Result<Evaluation, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Submission::Observe { observation, reply: Some(reply) })
            .await
            .map_err(|_| RuntimeError::Closed)?;

        let result = rx.await.map_err(|_| RuntimeError::ReplyDropped)?;
        Ok(result?)
    }

    /// Blocking variant of [`ObservationSender::observe`] for platform
    /// callback threads.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_observe(&self, observation: RawObservation) -> Result<Evaluation, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .blocking_send(Submission::Observe { observation, reply: Some(reply) })
            .map_err(|_| RuntimeError::Closed)?;

        let result = rx.blocking_recv().map_err(|_| RuntimeError::ReplyDropped)?;
        Ok(result?)
    }

    /// Submit an observation without waiting for its evaluation.
    pub async fn notify(&self, observation: RawObservation) -> Result<(), RuntimeError> {
        self.tx
            .send(Submission::Observe { observation, reply: None })
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    /// Submit an observation if there is room, without waiting at all.
    pub fn try_notify(&self, observation: RawObservation) -> Result<(), RuntimeError> {
        match self.tx.try_send(Submission::Observe { observation, reply: None }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RuntimeError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(RuntimeError::Closed),
        }
    }

    /// Ask the runtime to stop after the submissions already queued.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.tx.send(Submission::Shutdown).await.map_err(|_| RuntimeError::Closed)
    }

    /// True once the runtime has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Queue-serialized driver for the [`Engine`].
///
/// # Type Parameters
///
/// - `S`: lock state store
/// - `P`: capability probe
/// - `X`: action executor
pub struct Runtime<S, P, X> {
    engine: Engine<S, P>,
    executor: X,
    rx: mpsc::Receiver<Submission>,
    stats: RuntimeStats,
}

impl<S, P, X> Runtime<S, P, X>
where
    S: LockStateStore,
    P: CapabilityProbe,
    X: ActionExecutor,
{
    /// Create a runtime and the first producer handle.
    pub fn new(
        engine: Engine<S, P>,
        executor: X,
        config: &RuntimeConfig,
    ) -> (Self, ObservationSender) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let runtime = Self { engine, executor, rx, stats: RuntimeStats::default() };
        (runtime, ObservationSender { tx })
    }

    /// Drain the queue until shutdown or until every sender is dropped.
    pub async fn run(mut self) -> RuntimeStats {
        tracing::info!("Enforcement runtime started");

        while let Some(submission) = self.rx.recv().await {
            match submission {
                Submission::Observe { observation, reply } => {
                    let result = self.process(&observation);
                    if let Some(reply) = reply
                        && reply.send(result).is_err()
                    {
                        tracing::debug!("Submitter went away before the reply");
                    }
                },
                Submission::Shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                },
            }
        }

        self.rx.close();
        let stats = self.stats;
        tracing::info!(
            observations = stats.observations,
            enforced = stats.enforced,
            failures = stats.failures,
            invalid = stats.invalid,
            "Enforcement runtime stopped"
        );
        stats
    }

    /// Evaluate and execute one observation on the caller's thread.
    pub fn process(&mut self, observation: &RawObservation) -> ObserveResult {
        let result = self.engine.observe(observation, &mut self.executor);
        self.stats.record(&result);
        result
    }

    /// The engine.
    pub fn engine(&self) -> &Engine<S, P> {
        &self.engine
    }

    /// The executor.
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Counters so far.
    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }
}

impl<S, P, T> Runtime<S, P, PlatformExecutor<T>>
where
    S: LockStateStore,
    P: CapabilityProbe,
    T: Platform,
{
    /// Run a host command against the executor's platform.
    ///
    /// Overlay commands are reported to the engine so its mirror keeps
    /// matching what the platform draws.
    pub fn command(&mut self, command: Command) -> Result<Reply, CommandError> {
        let reply = dispatch(command, self.executor.platform_mut());
        if let Some(action) = command.overlay_action() {
            let succeeded = matches!(reply, Ok(Reply::Bool(true)));
            self.engine.confirm_overlay(action, succeeded);
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use focuslock_core::{
        ActionContext, CapabilityReport, CapabilitySet, EnforcementAction, EngineConfig,
        ExecutionError, LockState, SharedLockFlag, observation::KEYCODE_BACK,
    };

    use super::*;

    struct AllGranted;

    impl CapabilityProbe for AllGranted {
        fn probe(&mut self) -> CapabilityReport {
            CapabilityReport::from_set(CapabilitySet::all())
        }
    }

    struct Noop;

    impl ActionExecutor for Noop {
        fn execute(
            &mut self,
            _action: EnforcementAction,
            _ctx: &ActionContext<'_>,
        ) -> Result<(), ExecutionError> {
            Ok(())
        }
    }

    #[test]
    fn process_records_stats() {
        let engine = Engine::new(
            EngineConfig::default(),
            SharedLockFlag::new(LockState::Locked),
            AllGranted,
        );
        let (mut runtime, _tx) = Runtime::new(engine, Noop, &RuntimeConfig::default());

        runtime.process(&RawObservation::key_down(KEYCODE_BACK)).unwrap();
        runtime.process(&RawObservation::Key { key_code: KEYCODE_BACK, action: 9 }).unwrap();

        assert_eq!(runtime.stats(), RuntimeStats {
            observations: 2,
            enforced: 1,
            failures: 0,
            invalid: 1
        });
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let engine = Engine::new(
            EngineConfig::default(),
            SharedLockFlag::default(),
            AllGranted,
        );
        let (_runtime, tx) = Runtime::new(engine, Noop, &RuntimeConfig { queue_capacity: 0 });
        assert!(tx.try_notify(RawObservation::PermissionsChanged).is_ok());
        assert_eq!(tx.try_notify(RawObservation::PermissionsChanged), Err(RuntimeError::QueueFull));
    }
}
