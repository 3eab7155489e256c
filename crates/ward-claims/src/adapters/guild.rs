use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::ClaimAdapter;

#[derive(Debug)]
struct Guild {
    master: PlayerId,
    members: BTreeSet<PlayerId>,
}

/// Membership-only guilds. Guilds hold no land, so every location query
/// abstains; the adapter only contributes group membership and leadership.
pub struct GuildAdapter {
    guilds: RwLock<HashMap<String, Guild>>,
}

impl GuildAdapter {
    pub fn new() -> Self {
        Self {
            guilds: RwLock::new(HashMap::new()),
        }
    }

    /// Create a guild. The guild master is automatically a member.
    pub fn create_guild(&self, name: &str, master: PlayerId) {
        let mut guilds = self.guilds.write().expect("lock poisoned");
        let mut members = BTreeSet::new();
        members.insert(master);
        guilds.insert(name.to_string(), Guild { master, members });
    }

    pub fn add_member(&self, guild: &str, player: PlayerId) {
        let mut guilds = self.guilds.write().expect("lock poisoned");
        if let Some(guild) = guilds.get_mut(guild) {
            guild.members.insert(player);
        }
    }
}

impl Default for GuildAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimAdapter for GuildAdapter {
    fn name(&self) -> &str {
        "guilds"
    }

    fn owner_of(&self, _pos: &BlockPos) -> Option<Principal> {
        None
    }

    fn permits(&self, _actor: PlayerId, _pos: &BlockPos, _action: Action) -> Verdict {
        Verdict::Abstain
    }

    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let guilds = self.guilds.read().expect("lock poisoned");
        guilds
            .iter()
            .filter(|(_, guild)| guild.members.contains(&actor))
            .map(|(name, _)| GroupId::new(name.clone()))
            .collect()
    }

    fn is_leader_of(&self, actor: PlayerId, group: &GroupId) -> bool {
        let guilds = self.guilds.read().expect("lock poisoned");
        guilds.iter().any(|(name, guild)| {
            guild.master == actor && group.matches(&GroupId::new(name.clone()))
        })
    }
}

impl std::fmt::Debug for GuildAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.guilds.read().expect("lock poisoned").len();
        f.debug_struct("GuildAdapter")
            .field("guilds", &count)
            .finish()
    }
}
