//! Concrete claim adapters.
//!
//! Each adapter models one external system's semantics behind the
//! [`ClaimAdapter`](crate::ClaimAdapter) interface. The wire protocols of
//! the real plugins are out of scope; every adapter here is backed by an
//! in-process directory of that system's state, which is also what the
//! tests drive.

pub mod clan;
pub mod faction;
pub mod guild;
pub mod statics;
pub mod town;

pub use clan::ClanAdapter;
pub use faction::FactionAdapter;
pub use guild::GuildAdapter;
pub use statics::StaticGroupAdapter;
pub use town::TownAdapter;
