//! Land-claim adapters for Blockward.
//!
//! Several independently-evolving claim systems can govern the same world:
//! towns, factions, guilds, clans, plain permission groups. Each is wrapped
//! behind the one [`ClaimAdapter`] capability interface — `owner_of`,
//! `permits`, `groups_of` — and combined by a [`ClaimDirectory`] that
//! consults adapters in a fixed priority order. Adapters abstain whenever
//! the underlying system has no opinion; a timed-out or panicking adapter is
//! treated as abstaining, never as a hard failure.
//!
//! New claim systems are added by implementing the trait, never by
//! subclassing some base integration.

pub mod adapter;
pub mod adapters;
pub mod directory;
pub mod error;

pub use adapter::{AdapterConfig, ClaimAdapter};
pub use adapters::town::{Plot, TownBuildPolicy};
pub use adapters::{ClanAdapter, FactionAdapter, GuildAdapter, StaticGroupAdapter, TownAdapter};
pub use directory::ClaimDirectory;
pub use error::ClaimError;
