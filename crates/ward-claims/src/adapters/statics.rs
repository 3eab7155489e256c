use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::ClaimAdapter;

/// Fixed group assignments from server configuration ("vip", "builders").
///
/// The simplest possible group source: no land, no leaders, just a static
/// member table the server operator maintains.
pub struct StaticGroupAdapter {
    groups: RwLock<HashMap<String, BTreeSet<PlayerId>>>,
}

impl StaticGroupAdapter {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    pub fn assign(&self, group: &str, player: PlayerId) {
        let mut groups = self.groups.write().expect("lock poisoned");
        groups.entry(group.to_string()).or_default().insert(player);
    }

    pub fn unassign(&self, group: &str, player: PlayerId) {
        let mut groups = self.groups.write().expect("lock poisoned");
        if let Some(members) = groups.get_mut(group) {
            members.remove(&player);
        }
    }
}

impl Default for StaticGroupAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimAdapter for StaticGroupAdapter {
    fn name(&self) -> &str {
        "static-groups"
    }

    fn owner_of(&self, _pos: &BlockPos) -> Option<Principal> {
        None
    }

    fn permits(&self, _actor: PlayerId, _pos: &BlockPos, _action: Action) -> Verdict {
        Verdict::Abstain
    }

    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let groups = self.groups.read().expect("lock poisoned");
        groups
            .iter()
            .filter(|(_, members)| members.contains(&actor))
            .map(|(name, _)| GroupId::new(name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for StaticGroupAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.groups.read().expect("lock poisoned").len();
        f.debug_struct("StaticGroupAdapter")
            .field("groups", &count)
            .finish()
    }
}
