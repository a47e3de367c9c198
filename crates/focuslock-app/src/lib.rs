//! Application layer for FocusLock
//!
//! Glue between the pure enforcement engine and a host platform: the command
//! surface the UI calls, the adapters that turn a [`Platform`] into a
//! capability probe and an action executor, and the queue-serialized
//! [`Runtime`] that feeds the engine.
//!
//! # Components
//!
//! - [`Command`] / [`dispatch`]: channel commands answered by the host
//! - [`Platform`]: trait every host implements
//! - [`PlatformProbe`] / [`PlatformExecutor`]: engine adapters over a host
//! - [`Runtime`]: bounded-queue driver with oneshot replies
//! - [`SystemEnv`]: wall-clock [`focuslock_core::Environment`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod error;
mod platform;
mod runtime;
mod system_env;

pub use command::{Command, Reply};
pub use error::{CommandError, PlatformError, RuntimeError};
pub use platform::{
    ADMIN_EXPLANATION, EDGE_EXCLUSION_PX, Platform, PlatformExecutor, PlatformProbe, Rect,
    ScreenSize, dispatch, gesture_exclusion_rects,
};
pub use runtime::{
    DEFAULT_QUEUE_CAPACITY, ObservationSender, ObserveResult, Runtime, RuntimeConfig,
    RuntimeStats,
};
pub use system_env::SystemEnv;
