//! In-memory lock cache for Blockward.
//!
//! Per-interaction access checks cannot afford a store round-trip, so the
//! registry memoizes store lookups per block position, including "no lock
//! here", which gets a shorter TTL since absence can become presence at any
//! moment. Entries are grouped by chunk so a world chunk-unload evicts its
//! whole column at once, and a least-recently-accessed chunk policy bounds
//! memory.
//!
//! The registry is write-through in spirit: it holds no dirty state of its
//! own. Every lifecycle mutation invalidates the affected positions
//! synchronously before returning, so no caller observes a stale lock after
//! a successful transition.

pub mod registry;

pub use registry::{LockRegistry, Lookup, RegistryConfig};
