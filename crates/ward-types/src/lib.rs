//! Foundation types for Blockward.
//!
//! This crate provides the core position, principal, and lock-record types
//! used throughout the Blockward system. Every other ward crate depends on
//! `ward-types`.
//!
//! # Key Types
//!
//! - [`BlockPos`] — A block coordinate in a named world
//! - [`ChunkPos`] — The 16×16 column a block belongs to (cache eviction unit)
//! - [`Principal`] — Player, group, group leader, or everyone
//! - [`PermissionLevel`] / [`Action`] — Ordered access levels and the
//!   interactions that require them
//! - [`Lock`] — A protected block group: owner, ACL, type, version
//! - [`Decision`] / [`Verdict`] — Final allow/deny vs. adapter
//!   allow/deny/abstain

pub mod decision;
pub mod error;
pub mod lock;
pub mod permission;
pub mod position;
pub mod principal;

pub use decision::{Decision, Verdict};
pub use error::TypeError;
pub use lock::{AclEntry, Lock, LockId, LockType};
pub use permission::{Action, PermissionLevel};
pub use position::{AreaBounds, BlockPos, ChunkPos};
pub use principal::{GroupId, Player, PlayerId, Principal};
