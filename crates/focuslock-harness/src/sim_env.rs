//! Deterministic simulation environment.
//!
//! Virtual time only moves when the test advances it, and randomness comes
//! from a seeded ChaCha RNG, so a failing seed replays exactly.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use focuslock_core::Environment;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug)]
struct SimEnvState {
    now: Duration,
    rng: ChaCha8Rng,
}

/// Simulation environment with a virtual clock and a seeded RNG.
///
/// Clones share the same clock and RNG.
#[derive(Debug, Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimEnvState>>,
}

impl SimEnv {
    /// Create an environment whose RNG is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let state = SimEnvState { now: Duration::ZERO, rng: ChaCha8Rng::seed_from_u64(seed) };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, SimEnvState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state();
        state.now = state.now.saturating_add(duration);
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state().now
    }

    /// True with probability `p`, clamped to `[0, 1]`.
    pub fn chance(&self, p: f64) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.state().rng.gen_bool(p)
    }

    /// Uniform value below `bound`. Returns zero for a zero bound.
    pub fn below(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.state().rng.gen_range(0..bound)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Self::Instant {
        self.state().now
    }
}
