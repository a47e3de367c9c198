//! Environment abstraction for deterministic testing.
//!
//! Decouples enforcement logic from the system clock. Production uses real
//! monotonic time; simulation uses a virtual clock that only moves when the
//! test advances it.

use std::time::Duration;

/// Abstract environment providing time.
///
/// Only the capability cache consults the clock. The decision table itself is
/// time-independent.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - This method MUST return values that never decrease within a single
    ///   execution context.
    fn now(&self) -> Self::Instant;
}
