//! Error types for the application layer.

use focuslock_core::EngineError;
use thiserror::Error;

/// A host platform call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The host refused the call for lack of a permission.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The host has no handler for the requested screen or activity.
    #[error("no activity found for {0}")]
    ActivityNotFound(String),

    /// The host feature does not exist on this device.
    #[error("unsupported on this device: {0}")]
    Unsupported(String),

    /// Any other host failure.
    #[error("{0}")]
    Failed(String),
}

/// A command could not be completed.
///
/// Each variant maps to the error code the caller sees via
/// [`CommandError::code`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Entering lock task mode failed.
    #[error("Failed to start lock task: {0}")]
    LockFailed(PlatformError),

    /// Leaving lock task mode failed.
    #[error("Failed to stop lock task: {0}")]
    UnlockFailed(PlatformError),

    /// A permission required by the command is missing.
    #[error("{0}")]
    PermissionDenied(String),

    /// No command with this method name exists.
    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

impl CommandError {
    /// Stable error code reported to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockFailed(_) => "LOCK_FAILED",
            Self::UnlockFailed(_) => "UNLOCK_FAILED",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }
}

/// Errors from submitting observations to the [`crate::Runtime`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime has shut down and no longer accepts submissions.
    #[error("runtime queue closed")]
    Closed,

    /// The bounded queue is full. Only returned by non-waiting submissions.
    #[error("runtime queue full")]
    QueueFull,

    /// The runtime dropped the submission without answering.
    #[error("runtime dropped the reply")]
    ReplyDropped,

    /// The engine evaluated the observation but reported an error.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RuntimeError {
    /// Returns true if resubmitting later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueFull => true,
            Self::Engine(e) => e.is_transient(),
            Self::Closed | Self::ReplyDropped => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_codes() {
        let failed = PlatformError::Failed("not permitted".to_string());
        assert_eq!(CommandError::LockFailed(failed.clone()).code(), "LOCK_FAILED");
        assert_eq!(CommandError::UnlockFailed(failed).code(), "UNLOCK_FAILED");
        assert_eq!(CommandError::PermissionDenied(String::new()).code(), "PERMISSION_DENIED");
        assert_eq!(CommandError::NotImplemented("setMaxVolume".into()).code(), "NOT_IMPLEMENTED");
    }

    #[test]
    fn lock_failure_message_carries_reason() {
        let err = CommandError::LockFailed(PlatformError::Failed("not whitelisted".to_string()));
        assert_eq!(err.to_string(), "Failed to start lock task: not whitelisted");
    }

    #[test]
    fn full_queue_is_transient() {
        assert!(RuntimeError::QueueFull.is_transient());
        assert!(!RuntimeError::Closed.is_transient());
    }
}
