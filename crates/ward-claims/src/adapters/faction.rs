use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ward_types::{Action, BlockPos, ChunkPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::ClaimAdapter;

#[derive(Debug)]
struct Faction {
    leader: PlayerId,
    members: BTreeSet<PlayerId>,
    territory: BTreeSet<ChunkPos>,
}

/// Chunk-based faction claims: a faction holds whole 16×16 chunk columns.
/// Members may act in their own territory, everyone else is denied there;
/// unclaimed chunks abstain.
pub struct FactionAdapter {
    factions: RwLock<HashMap<String, Faction>>,
}

impl FactionAdapter {
    pub fn new() -> Self {
        Self {
            factions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a faction. The leader is automatically a member.
    pub fn create_faction(&self, name: &str, leader: PlayerId) {
        let mut factions = self.factions.write().expect("lock poisoned");
        let mut members = BTreeSet::new();
        members.insert(leader);
        factions.insert(
            name.to_string(),
            Faction {
                leader,
                members,
                territory: BTreeSet::new(),
            },
        );
    }

    /// Claim the chunk containing `pos` for a faction.
    pub fn claim_chunk(&self, faction: &str, pos: &BlockPos) {
        let mut factions = self.factions.write().expect("lock poisoned");
        if let Some(faction) = factions.get_mut(faction) {
            faction.territory.insert(pos.chunk());
        }
    }

    pub fn add_member(&self, faction: &str, player: PlayerId) {
        let mut factions = self.factions.write().expect("lock poisoned");
        if let Some(faction) = factions.get_mut(faction) {
            faction.members.insert(player);
        }
    }

    fn faction_at<'a>(
        factions: &'a HashMap<String, Faction>,
        pos: &BlockPos,
    ) -> Option<(&'a String, &'a Faction)> {
        let chunk = pos.chunk();
        factions
            .iter()
            .find(|(_, faction)| faction.territory.contains(&chunk))
    }
}

impl Default for FactionAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimAdapter for FactionAdapter {
    fn name(&self) -> &str {
        "factions"
    }

    fn owner_of(&self, pos: &BlockPos) -> Option<Principal> {
        let factions = self.factions.read().expect("lock poisoned");
        Self::faction_at(&factions, pos).map(|(name, _)| Principal::group(name.clone()))
    }

    fn permits(&self, actor: PlayerId, pos: &BlockPos, _action: Action) -> Verdict {
        let factions = self.factions.read().expect("lock poisoned");
        match Self::faction_at(&factions, pos) {
            Some((name, faction)) => {
                if faction.members.contains(&actor) {
                    Verdict::Allow
                } else {
                    Verdict::deny(format!("this land belongs to {name}"))
                }
            }
            None => Verdict::Abstain,
        }
    }

    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let factions = self.factions.read().expect("lock poisoned");
        factions
            .iter()
            .filter(|(_, faction)| faction.members.contains(&actor))
            .map(|(name, _)| GroupId::new(name.clone()))
            .collect()
    }

    fn is_leader_of(&self, actor: PlayerId, group: &GroupId) -> bool {
        let factions = self.factions.read().expect("lock poisoned");
        factions.iter().any(|(name, faction)| {
            faction.leader == actor && group.matches(&GroupId::new(name.clone()))
        })
    }
}

impl std::fmt::Debug for FactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.factions.read().expect("lock poisoned").len();
        f.debug_struct("FactionAdapter")
            .field("factions", &count)
            .finish()
    }
}
