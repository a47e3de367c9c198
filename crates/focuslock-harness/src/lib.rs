//! Deterministic simulation harness for FocusLock enforcement testing.
//!
//! Runs the production runtime against a simulated device with a virtual
//! clock and seeded failure injection, so every run is reproducible.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and real implementation,
//! and their observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. [`SimWorld`] runs [`InvariantRegistry::standard()`]
//! after every evaluation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod scenario;
pub mod sim_device;
pub mod sim_env;
pub mod sim_world;

pub use invariants::{
    ConsumeRequiresInterception, DismissBeforeRestore, EnforceOnlyWhenLocked, Invariant,
    InvariantKind, InvariantRegistry, InvariantResult, OverlayMirrorConsistent,
    OverlayNeverUnderStrictKiosk, SystemSnapshot, UnlockedHidesOverlay, Violation,
};
pub use model::{ModelApp, ModelCapability, ModelKey, ModelWorld, ObservableState, Operation};
pub use scenario::{Scenario, ScenarioOutcome, Step};
pub use sim_device::{CallRecord, PlatformCall, SimDevice};
pub use sim_env::SimEnv;
pub use sim_world::{SimConfig, SimRuntime, SimWorld, TraceEntry};
