//! Lock state and the externally owned store it is read from.
//!
//! The engine never caches the lock flag. Every evaluation reads the store
//! once, so a toggle from the settings surface takes effect on the next
//! evaluation (level-triggered enforcement).

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

/// Focus lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// No enforcement; every intent is allowed.
    Unlocked,
    /// The user must stay inside the guarded application.
    Locked,
}

impl LockState {
    /// Convert the external boolean flag.
    pub fn from_flag(locked: bool) -> Self {
        if locked { Self::Locked } else { Self::Unlocked }
    }

    /// True if enforcement is active.
    pub fn is_locked(self) -> bool {
        self == Self::Locked
    }
}

/// Read-only view of the externally owned lock flag.
pub trait LockStateStore {
    /// Current lock state. Called exactly once per evaluation.
    fn read_lock_state(&self) -> LockState;
}

/// Lock flag shared between the settings surface and the engine.
///
/// Clones share the same flag. Writers may run on any thread.
#[derive(Debug, Clone, Default)]
pub struct SharedLockFlag {
    flag: Arc<AtomicBool>,
}

impl SharedLockFlag {
    /// Create a flag with the given initial state.
    pub fn new(state: LockState) -> Self {
        Self { flag: Arc::new(AtomicBool::new(state.is_locked())) }
    }

    /// Overwrite the flag.
    pub fn set(&self, state: LockState) {
        self.flag.store(state.is_locked(), Ordering::Release);
    }

    /// Engage the lock.
    pub fn lock(&self) {
        self.set(LockState::Locked);
    }

    /// Release the lock.
    pub fn unlock(&self) {
        self.set(LockState::Unlocked);
    }
}

impl LockStateStore for SharedLockFlag {
    fn read_lock_state(&self) -> LockState {
        LockState::from_flag(self.flag.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flag_is_unlocked() {
        let flag = SharedLockFlag::default();
        assert_eq!(flag.read_lock_state(), LockState::Unlocked);
    }

    #[test]
    fn clones_observe_writes() {
        let settings = SharedLockFlag::new(LockState::Unlocked);
        let engine_view = settings.clone();

        settings.lock();
        assert_eq!(engine_view.read_lock_state(), LockState::Locked);

        settings.unlock();
        assert_eq!(engine_view.read_lock_state(), LockState::Unlocked);
    }

    #[test]
    fn from_flag_maps_both_values() {
        assert_eq!(LockState::from_flag(true), LockState::Locked);
        assert_eq!(LockState::from_flag(false), LockState::Unlocked);
        assert!(LockState::Locked.is_locked());
        assert!(!LockState::Unlocked.is_locked());
    }
}
