use tracing::debug;
use uuid::Uuid;
use ward_types::{AclEntry, LockType, PermissionLevel, PlayerId, Principal};

use crate::error::{ParseError, ParseWarning};

/// Resolves player display names to stable ids.
///
/// Sign entries written as a bare name need a lookup against the server's
/// known players. Entries written as `name#uuid` carry their id and bypass
/// the resolver.
pub trait NameResolver {
    /// The id for a display name, or `None` if no such player is known.
    fn resolve(&self, name: &str) -> Option<PlayerId>;
}

/// A resolver that knows nobody. Bare-name entries all drop with warnings.
pub struct NoResolver;

impl NameResolver for NoResolver {
    fn resolve(&self, _name: &str) -> Option<PlayerId> {
        None
    }
}

/// The header line of a protection sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignHeader {
    /// The main sign: declares the lock type.
    Main(LockType),
    /// A continuation sign: contributes entries to an existing lock
    /// without changing its type.
    MoreUsers,
}

impl SignHeader {
    /// The lock type, for main signs.
    pub fn lock_type(&self) -> Option<LockType> {
        match self {
            SignHeader::Main(t) => Some(*t),
            SignHeader::MoreUsers => None,
        }
    }
}

/// The outcome of parsing one sign: header, surviving entries, and the
/// warnings for everything that was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSign {
    pub header: SignHeader,
    pub entries: Vec<AclEntry>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse the header line. Headers are bracketed words, matched
/// case-insensitively: `[Private]`, `[public]`, `[More Users]`.
fn parse_header(line: &str) -> Result<SignHeader, ParseError> {
    let trimmed = line.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::UnrecognizedHeader(trimmed.to_string()))?;

    if inner.trim().eq_ignore_ascii_case("more users") {
        return Ok(SignHeader::MoreUsers);
    }
    LockType::from_header_word(inner)
        .map(SignHeader::Main)
        .map_err(|_| ParseError::UnrecognizedHeader(trimmed.to_string()))
}

/// Parse a full sign: the first line is the header, every following
/// non-empty line is an entry. Entries that fail to parse or resolve are
/// dropped into `warnings`, never fatal.
pub fn parse_sign(lines: &[String], resolver: &dyn NameResolver) -> Result<ParsedSign, ParseError> {
    let header_line = lines.first().ok_or(ParseError::MissingHeader)?;
    let header = parse_header(header_line)?;

    let mut entries: Vec<AclEntry> = Vec::new();
    let mut warnings = Vec::new();
    for (line_no, line) in lines.iter().enumerate().skip(1) {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match parse_entry(text, resolver) {
            Ok(entry) => {
                // Last write wins on duplicate principals within one sign.
                let key = entry.principal.key();
                entries.retain(|e| e.principal.key() != key);
                entries.push(entry);
            }
            Err(reason) => {
                debug!(line = line_no, text, %reason, "dropping unparseable sign entry");
                warnings.push(ParseWarning {
                    line: line_no,
                    text: text.to_string(),
                    reason,
                });
            }
        }
    }

    Ok(ParsedSign {
        header,
        entries,
        warnings,
    })
}

/// Parse a single entry line into an ACL entry.
///
/// The optional `:level` suffix is split off first; the remainder is the
/// principal token. Errors are plain strings since they only ever end up in
/// [`ParseWarning`]s.
pub fn parse_entry(text: &str, resolver: &dyn NameResolver) -> Result<AclEntry, String> {
    let text = text.trim();
    let (token, level) = split_level_suffix(text);
    let principal = parse_principal(token, resolver)?;
    Ok(AclEntry::new(principal, level))
}

/// Split a trailing `:level` suffix. Anything after the last colon that
/// parses as a level is the level; otherwise the colon belongs to the token.
fn split_level_suffix(text: &str) -> (&str, PermissionLevel) {
    if let Some((head, tail)) = text.rsplit_once(':') {
        if let Ok(level) = tail.parse::<PermissionLevel>() {
            return (head.trim(), level);
        }
    }
    (text, PermissionLevel::Use)
}

fn parse_principal(token: &str, resolver: &dyn NameResolver) -> Result<Principal, String> {
    if token.is_empty() {
        return Err("empty principal".to_string());
    }

    // [Everyone] and [GroupName]
    if let Some(inner) = token
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        let inner = inner.trim();
        if inner.is_empty() {
            return Err("empty group name".to_string());
        }
        if inner.eq_ignore_ascii_case("everyone") {
            return Ok(Principal::Everyone);
        }
        return Ok(Principal::group(inner));
    }

    // +GroupName+
    if token.len() > 2 {
        if let Some(inner) = token
            .strip_prefix('+')
            .and_then(|rest| rest.strip_suffix('+'))
        {
            let inner = inner.trim();
            if inner.is_empty() {
                return Err("empty group name".to_string());
            }
            return Ok(Principal::group_leader(inner));
        }
    }

    // name#uuid pins the identity, skipping the resolver.
    if let Some((name, id_text)) = token.split_once('#') {
        let name = name.trim();
        if name.is_empty() {
            return Err("empty player name".to_string());
        }
        return match Uuid::parse_str(id_text.trim()) {
            Ok(id) => Ok(Principal::player(PlayerId(id), name)),
            Err(_) => Err(format!("invalid player id: {:?}", id_text.trim())),
        };
    }

    // Bare player name: must resolve to a known player.
    match resolver.resolve(token) {
        Some(id) => Ok(Principal::player(id, token)),
        None => Err(format!("unknown player: {token:?}")),
    }
}
