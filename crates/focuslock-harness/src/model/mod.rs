//! Model-based testing for the enforcement runtime.
//!
//! The model is a simplified reference implementation that captures the
//! essential semantics of lock enforcement. Operations are applied to both
//! the model and the real runtime, and their observable states and decided
//! actions are compared.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │   ModelWorld    │     │    SimWorld     │
//! │  (naive rules)  │     │ (real runtime)  │
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!          └─────────┬─────────────┘
//!                    ▼
//!           Compare actions and
//!            observable state
//! ```

mod operation;
mod world;

pub use operation::{KEYCODE_VOLUME_UP, ModelApp, ModelCapability, ModelKey, Operation};
pub use world::{ModelWorld, ObservableState};
