//! Error types for the enforcement engine.
//!
//! Three layers: malformed platform input ([`ObservationError`]), executor
//! failures ([`ExecutionError`]) and the engine boundary ([`EngineError`]).
//! None of them is fatal to the engine. A failed evaluation is retried
//! implicitly by the next observed event.

use thiserror::Error;

use crate::{
    action::{EnforcementAction, EnforcementStep},
    capability::Capability,
    engine::Evaluation,
};

/// A raw observation the classifier cannot interpret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    /// Window state change without a package identity.
    #[error("window state change without a package name")]
    MissingPackage,

    /// Key event with an action that is neither down, up nor multiple.
    #[error("unknown key action {0}")]
    UnknownKeyAction(i32),

    /// Negative key code.
    #[error("invalid key code {0}")]
    InvalidKeyCode(i32),
}

/// The executor could not perform an action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// One step of a composite action could not be delivered.
    #[error("could not deliver {step:?}: {reason}")]
    StepFailed {
        /// Step that failed
        step: EnforcementStep,
        /// Platform-provided reason
        reason: String,
    },

    /// The overlay could not be drawn or removed.
    #[error("overlay unavailable: {0}")]
    Overlay(String),

    /// The platform refused the action outright.
    #[error("platform rejected {action:?}: {reason}")]
    Rejected {
        /// Action that was refused
        action: EnforcementAction,
        /// Platform-provided reason
        reason: String,
    },
}

impl ExecutionError {
    /// Returns true if the same action may succeed on the next event.
    ///
    /// Delivery failures are usually races with the system UI. A refusal
    /// means the platform will keep refusing until permissions change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StepFailed { .. } | Self::Overlay(_))
    }
}

/// Errors surfaced across the engine boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A required mechanism is absent. Selects the fallback tier.
    #[error("capability unavailable: {capability}")]
    CapabilityUnavailable {
        /// Missing capability
        capability: Capability,
    },

    /// The executor failed to perform a decided action.
    #[error("executor failed to perform {action:?}: {source}")]
    ExecutionFailed {
        /// First action that failed
        action: EnforcementAction,
        /// Executor error
        source: ExecutionError,
        /// The evaluation that produced the action
        evaluation: Box<Evaluation>,
    },

    /// The classifier rejected the raw observation.
    #[error("invalid observation: {0}")]
    InvalidObservation(#[from] ObservationError),
}

impl EngineError {
    /// Returns true if the condition may clear without user intervention.
    ///
    /// Missing capabilities need the user to grant a permission, so they are
    /// never transient. Execution failures defer to the executor's verdict.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ExecutionFailed { source, .. } => source.is_transient(),
            Self::CapabilityUnavailable { .. } | Self::InvalidObservation(_) => false,
        }
    }

    /// The decided evaluation, if the error happened after the decision.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::ExecutionFailed { evaluation, .. } => Some(evaluation),
            Self::CapabilityUnavailable { .. } | Self::InvalidObservation(_) => None,
        }
    }
}

/// Unrecognised capability name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown capability: {0}")]
pub struct ParseCapabilityError(pub String);
