//! Sign-text ACL parsing for Blockward.
//!
//! Players configure protections by writing sign text: a header line naming
//! the lock type, followed by principal entries. This crate turns that text
//! into typed ACL entries, completely decoupled from the lifecycle state
//! machine so the grammar is independently testable.
//!
//! # Grammar
//!
//! ```text
//! sign      := header NEWLINE entry*
//! header    := "[" type-word "]"        Private | Public | Donation | Display
//!            | "[More Users]"           continuation sign, adds entries only
//! entry     := principal (":" level)?
//! principal := "[" group "]"            every group member
//!            | "+" group "+"            group leaders only
//!            | name ("#" uuid)?         a player, by name or pinned id
//! level     := "view" | "use" | "manage" | "none"   (default: use)
//! ```
//!
//! Parsing is recoverable: an entry that does not resolve is dropped with a
//! warning, the rest of the sign stays valid. Only a missing or unrecognized
//! header is a hard error (the sign is simply not a protection sign).

pub mod error;
pub mod parse;

pub use error::{ParseError, ParseWarning};
pub use parse::{parse_entry, parse_sign, NameResolver, NoResolver, ParsedSign, SignHeader};
