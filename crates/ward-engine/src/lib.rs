//! The Blockward protection engine.
//!
//! Ties the other crates together: the [`AccessEvaluator`] answers "may
//! this actor do this here" against locks, claim systems, and the operator
//! override list; the [`LifecycleManager`] runs every state transition a
//! lock can go through under striped per-location mutexes; the [`Warden`]
//! facade wires store, registry, claim directory, evaluator, and lifecycle
//! into one object and receives [`WorldEvent`]s from the host runtime.
//!
//! # Design Rules
//!
//! - Access checks fail closed: a storage failure denies.
//! - Lifecycle transitions re-read fresh state under a stripe mutex and
//!   write with a versioned compare-and-swap; the store is the arbiter of
//!   races.
//! - Every successful transition invalidates the registry before it
//!   returns, so no caller observes a stale lock afterwards.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod lifecycle;
pub mod warden;

pub use config::WardenConfig;
pub use error::{WardError, WardResult};
pub use evaluator::AccessEvaluator;
pub use events::WorldEvent;
pub use lifecycle::{LifecycleManager, SignOutcome, SweepReport};
pub use warden::Warden;
