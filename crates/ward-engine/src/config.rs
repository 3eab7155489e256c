use std::collections::BTreeSet;

use ward_registry::RegistryConfig;
use ward_types::PlayerId;

/// Server-level settings for the protection engine.
#[derive(Clone, Debug)]
pub struct WardenConfig {
    /// Block kinds that accept locks ("chest", "door", ...). Kind names
    /// come from the host world, lowercased.
    pub lockable_kinds: BTreeSet<String>,
    /// Operators who bypass every access check and may run any lifecycle
    /// operation on any lock.
    pub overrides: BTreeSet<PlayerId>,
    /// Days after creation before a lock becomes eligible for the expiry
    /// sweeper. `None` disables automatic expiry.
    pub retention_days: Option<u32>,
    pub registry: RegistryConfig,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            lockable_kinds: ["chest", "barrel", "furnace", "door", "trapdoor", "hopper"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            overrides: BTreeSet::new(),
            retention_days: None,
            registry: RegistryConfig::default(),
        }
    }
}

impl WardenConfig {
    /// Whether this kind of block accepts locks. Matching is
    /// case-insensitive since kind names arrive from the host world.
    pub fn is_lockable(&self, kind: &str) -> bool {
        self.lockable_kinds.contains(&kind.to_ascii_lowercase())
    }

    pub fn is_override(&self, actor: PlayerId) -> bool {
        self.overrides.contains(&actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_check_is_case_insensitive() {
        let config = WardenConfig::default();
        assert!(config.is_lockable("chest"));
        assert!(config.is_lockable("Chest"));
        assert!(!config.is_lockable("dirt"));
    }

    #[test]
    fn overrides_default_empty() {
        let config = WardenConfig::default();
        assert!(!config.is_override(PlayerId::random()));
    }
}
