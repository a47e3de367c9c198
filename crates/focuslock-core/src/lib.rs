//! Lock enforcement engine for FocusLock
//!
//! Pure decision logic that keeps a device inside a guarded application while
//! a focus lock is active. The crate never touches the platform: observations
//! come in, [`EnforcementAction`]s go out, and an external [`ActionExecutor`]
//! turns actions into platform calls.
//!
//! # Components
//!
//! - [`classify`]: maps a [`RawObservation`] to a [`NavigationIntent`]
//! - [`policy`]: the first-match decision table
//! - [`Enforcer`]: the decision table plus the overlay sub-policy and the
//!   overlay visibility mirror
//! - [`Engine`]: the `observe(event)` entry point wiring the lock store, the
//!   capability probe and the executor together
//!
//! # Data flow
//!
//! ```text
//! RawObservation ─> classify ─> Enforcer ─> [EnforcementAction] ─> ActionExecutor
//!                                  ^   ^
//!                     LockStateStore   CapabilityProbe
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod action;
pub mod capability;
pub mod classifier;
pub mod engine;
pub mod enforcer;
pub mod env;
pub mod error;
pub mod executor;
pub mod intent;
pub mod lock;
pub mod observation;
pub mod policy;

pub use action::{ActionContext, EnforcementAction, EnforcementStep};
pub use capability::{
    CachedProbe, Capability, CapabilityProbe, CapabilityReport, CapabilitySet, EnforcementTier,
    ProbeCacheConfig, ProbeStatus,
};
pub use classifier::classify;
pub use engine::{Engine, EngineConfig, Evaluation};
pub use enforcer::{Enforcer, OverlayVisibility, Verdict};
pub use env::Environment;
pub use error::{EngineError, ExecutionError, ObservationError};
pub use executor::ActionExecutor;
pub use intent::{AppId, NavigationIntent};
pub use lock::{LockState, LockStateStore, SharedLockFlag};
pub use observation::{LockTaskMode, RawObservation};
