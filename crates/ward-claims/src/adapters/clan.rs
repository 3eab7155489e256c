use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::ClaimAdapter;

#[derive(Debug)]
struct Clan {
    name: String,
    leaders: BTreeSet<PlayerId>,
    members: BTreeSet<PlayerId>,
}

/// Membership-only clans, keyed by a short tag. Sign entries may use either
/// the tag or the full clan name; both resolve to the same clan. Clans hold
/// no land, so location queries abstain.
pub struct ClanAdapter {
    clans: RwLock<HashMap<String, Clan>>,
}

impl ClanAdapter {
    pub fn new() -> Self {
        Self {
            clans: RwLock::new(HashMap::new()),
        }
    }

    /// Create a clan with a tag ("IP") and a full name ("Iron Pact").
    pub fn create_clan(&self, tag: &str, name: &str, leader: PlayerId) {
        let mut clans = self.clans.write().expect("lock poisoned");
        let mut leaders = BTreeSet::new();
        leaders.insert(leader);
        let mut members = BTreeSet::new();
        members.insert(leader);
        clans.insert(
            tag.to_string(),
            Clan {
                name: name.to_string(),
                leaders,
                members,
            },
        );
    }

    pub fn add_member(&self, tag: &str, player: PlayerId) {
        let mut clans = self.clans.write().expect("lock poisoned");
        if let Some(clan) = clans.get_mut(tag) {
            clan.members.insert(player);
        }
    }

    /// Promote a member to clan leader. Unknown clans are ignored.
    pub fn promote(&self, tag: &str, player: PlayerId) {
        let mut clans = self.clans.write().expect("lock poisoned");
        if let Some(clan) = clans.get_mut(tag) {
            if clan.members.contains(&player) {
                clan.leaders.insert(player);
            }
        }
    }

    /// A group id matches a clan by tag or by full name.
    fn matches(tag: &str, clan: &Clan, group: &GroupId) -> bool {
        group.matches(&GroupId::new(tag)) || group.matches(&GroupId::new(clan.name.clone()))
    }
}

impl Default for ClanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimAdapter for ClanAdapter {
    fn name(&self) -> &str {
        "clans"
    }

    fn owner_of(&self, _pos: &BlockPos) -> Option<Principal> {
        None
    }

    fn permits(&self, _actor: PlayerId, _pos: &BlockPos, _action: Action) -> Verdict {
        Verdict::Abstain
    }

    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let clans = self.clans.read().expect("lock poisoned");
        let mut groups = BTreeSet::new();
        for (tag, clan) in clans.iter() {
            if clan.members.contains(&actor) {
                groups.insert(GroupId::new(tag.clone()));
                groups.insert(GroupId::new(clan.name.clone()));
            }
        }
        groups
    }

    fn is_leader_of(&self, actor: PlayerId, group: &GroupId) -> bool {
        let clans = self.clans.read().expect("lock poisoned");
        clans.iter().any(|(tag, clan)| {
            clan.leaders.contains(&actor) && Self::matches(tag, clan, group)
        })
    }
}

impl std::fmt::Debug for ClanAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.clans.read().expect("lock poisoned").len();
        f.debug_struct("ClanAdapter").field("clans", &count).finish()
    }
}
