//! Durable lock storage for Blockward.
//!
//! This crate implements the protection store: a keyed mapping from block
//! positions to [`Lock`](ward_types::Lock) records with optimistic-concurrency
//! writes. A multi-location lock's record and its location index always move
//! together — a write either lands completely or not at all.
//!
//! # Storage Backends
//!
//! All backends implement the [`ProtectionStore`] trait:
//!
//! - [`MemoryProtectionStore`] — `HashMap`-based store for tests and embedding
//! - [`FileProtectionStore`] — one JSON file per lock under a data directory,
//!   with the location index rebuilt on open
//!
//! # Design Rules
//!
//! 1. Every write carries the version the caller last read; a mismatch is
//!    a [`StoreError::VersionConflict`], never a silent overwrite.
//! 2. A position belongs to at most one lock; violating writes fail with
//!    [`StoreError::LocationOccupied`].
//! 3. A lock never persists with an empty location set.
//! 4. I/O errors are propagated, never silently ignored. Callers degrade
//!    to deny-by-default on storage failure.
//! 5. Corrupt records are skipped with a warning on open, not fatal.

pub mod error;
pub mod file;
mod index;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileProtectionStore;
pub use memory::MemoryProtectionStore;
pub use traits::{ProtectionStore, Scan};
