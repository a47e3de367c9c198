//! Script driver.
//!
//! Spawns the enforcement [`Runtime`] on the tokio executor and feeds it a
//! parsed script through an [`ObservationSender`], the same way platform
//! callbacks would. Window events the simulated device emits in response to
//! enforcement are fed back after every directive.

use std::time::Duration;

use focuslock_app::{
    ObservationSender, PlatformExecutor, PlatformProbe, Runtime, RuntimeConfig, RuntimeError,
    RuntimeStats, SystemEnv, dispatch,
};
use focuslock_core::{
    AppId, CachedProbe, Engine, EngineConfig, ProbeCacheConfig, RawObservation, SharedLockFlag,
};
use focuslock_harness::SimDevice;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::script::{Directive, Line};

/// Upper bound on feedback rounds after one directive.
const MAX_FEEDBACK_ROUNDS: usize = 16;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// App the lock keeps the user inside.
    pub guarded_app: AppId,
    /// Whether the device can dismiss system surfaces.
    pub dismiss_supported: bool,
    /// Capability cache lifetime.
    pub probe_ttl: Duration,
    /// Runtime queue capacity.
    pub queue_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            guarded_app: AppId::new(focuslock_core::engine::DEFAULT_GUARDED_APP),
            dismiss_supported: true,
            probe_ttl: ProbeCacheConfig::default().ttl,
            queue_capacity: RuntimeConfig::default().queue_capacity,
        }
    }
}

/// Errors that stop a script run.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The runtime stopped accepting observations.
    #[error("runtime unavailable: {0}")]
    Runtime(#[from] RuntimeError),

    /// The runtime task panicked or was cancelled.
    #[error("runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Drives a runtime over a simulated device.
pub struct Driver {
    device: SimDevice,
    lock: SharedLockFlag,
    sender: ObservationSender,
    task: JoinHandle<RuntimeStats>,
}

impl Driver {
    /// Build the runtime over `device` and spawn it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &DriverConfig, device: SimDevice) -> Self {
        device.set_dismiss_supported(config.dismiss_supported);

        let lock = SharedLockFlag::default();
        let probe = CachedProbe::new(
            PlatformProbe::new(device.clone()),
            SystemEnv::new(),
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
        let (runtime, sender) = Runtime::new(
            engine,
            PlatformExecutor::new(device.clone()),
            &RuntimeConfig { queue_capacity: config.queue_capacity },
        );
        let task = tokio::spawn(runtime.run());

        Self { device, lock, sender, task }
    }

    /// The lock flag the engine reads.
    pub fn lock_flag(&self) -> &SharedLockFlag {
        &self.lock
    }

    /// The simulated device.
    pub fn device(&self) -> &SimDevice {
        &self.device
    }

    /// Run every line in order.
    pub async fn run(&mut self, lines: &[Line]) -> Result<(), DriverError> {
        for line in lines {
            self.apply(line).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, line: &Line) -> Result<(), DriverError> {
        let number = line.number;
        match &line.directive {
            Directive::Lock => {
                self.lock.lock();
                tracing::info!(line = number, "Lock engaged");
            },
            Directive::Unlock => {
                self.lock.unlock();
                tracing::info!(line = number, "Lock released");
            },
            Directive::Status(capability, status) => {
                let observation = self.device.set_status(*capability, *status);
                tracing::info!(line = number, %capability, ?status, "Capability changed");
                self.submit(number, observation).await?;
            },
            Directive::Launch(package) => {
                let observation = self.device.launch(package.as_str());
                self.submit(number, observation).await?;
            },
            Directive::Observe(observation) => self.submit(number, observation.clone()).await?,
            Directive::Shade => self.device.open_shade(),
            Directive::Fail(n) => self.device.fail_next(*n),
            Directive::Command(command) => {
                let mut device = self.device.clone();
                match dispatch(*command, &mut device) {
                    Ok(reply) => tracing::info!(line = number, %command, ?reply, "Command completed"),
                    Err(e) => tracing::warn!(
                        line = number,
                        %command,
                        code = e.code(),
                        error = %e,
                        "Command failed"
                    ),
                }
            },
        }

        self.feed_back(number).await
    }

    async fn feed_back(&mut self, number: usize) -> Result<(), DriverError> {
        for _ in 0..MAX_FEEDBACK_ROUNDS {
            let pending = self.device.take_pending();
            if pending.is_empty() {
                return Ok(());
            }
            for observation in pending {
                self.submit(number, observation).await?;
            }
        }
        tracing::warn!(line = number, "Device still emitting events, giving up on feedback");
        Ok(())
    }

    async fn submit(&self, number: usize, observation: RawObservation) -> Result<(), DriverError> {
        match self.sender.observe(observation).await {
            Ok(evaluation) => {
                tracing::info!(
                    line = number,
                    lock = ?evaluation.lock,
                    actions = ?evaluation.actions,
                    foreground = %self.device.foreground(),
                    overlay = self.device.overlay_drawn(),
                    "Evaluated"
                );
                if let Some(notice) = &evaluation.notice {
                    tracing::debug!(line = number, %notice, "Evaluation notice");
                }
                Ok(())
            },
            Err(RuntimeError::Engine(e)) => {
                tracing::warn!(
                    line = number,
                    error = %e,
                    transient = e.is_transient(),
                    actions = ?e.evaluation().map(|evaluation| &evaluation.actions),
                    "Enforcement failed"
                );
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Stop the runtime and collect its counters.
    pub async fn finish(self) -> Result<RuntimeStats, DriverError> {
        self.sender.shutdown().await?;
        Ok(self.task.await?)
    }
}
