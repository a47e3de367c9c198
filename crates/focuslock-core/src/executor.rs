//! Action executor contract.

use crate::{
    action::{ActionContext, EnforcementAction},
    error::ExecutionError,
};

/// Translates enforcement actions into platform calls.
///
/// The engine treats the executor as a black box satisfying this contract:
///
/// - `ShowOverlay`, `HideOverlay` and `ConsumeInput` are idempotent
/// - `SuppressAndRestore` performs [`ActionContext::suppress_steps`] in order
/// - every call reports success or failure; the engine does not retry
///
/// The engine never passes [`EnforcementAction::Allow`] to the executor.
pub trait ActionExecutor {
    /// Perform one action.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform could not perform the action.
    fn execute(
        &mut self,
        action: EnforcementAction,
        ctx: &ActionContext<'_>,
    ) -> Result<(), ExecutionError>;
}

impl<X: ActionExecutor + ?Sized> ActionExecutor for &mut X {
    fn execute(
        &mut self,
        action: EnforcementAction,
        ctx: &ActionContext<'_>,
    ) -> Result<(), ExecutionError> {
        (**self).execute(action, ctx)
    }
}
