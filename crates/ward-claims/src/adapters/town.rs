use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::ClaimAdapter;

/// Build rule inside a town's plots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TownBuildPolicy {
    /// Only residents may interact inside the town.
    ResidentsOnly,
    /// Anyone may interact; the town claim only marks ownership.
    Open,
}

/// An axis-aligned plot of land, full height, in one world.
#[derive(Clone, Debug)]
pub struct Plot {
    pub world: String,
    /// Inclusive `[x, z]` minimum corner.
    pub min: [i32; 2],
    /// Inclusive `[x, z]` maximum corner.
    pub max: [i32; 2],
}

impl Plot {
    fn contains(&self, pos: &BlockPos) -> bool {
        pos.world == self.world
            && pos.x >= self.min[0]
            && pos.x <= self.max[0]
            && pos.z >= self.min[1]
            && pos.z <= self.max[1]
    }
}

#[derive(Debug)]
struct Town {
    mayor: PlayerId,
    residents: BTreeSet<PlayerId>,
    plots: Vec<Plot>,
    policy: TownBuildPolicy,
}

/// Plot-based town claims: named towns own rectangular plots, residents get
/// access, the mayor leads. Locations outside every plot are wilderness and
/// the adapter abstains there.
pub struct TownAdapter {
    towns: RwLock<HashMap<String, Town>>,
}

impl TownAdapter {
    pub fn new() -> Self {
        Self {
            towns: RwLock::new(HashMap::new()),
        }
    }

    /// Found a town. The mayor is automatically a resident.
    pub fn found_town(&self, name: &str, mayor: PlayerId, policy: TownBuildPolicy) {
        let mut towns = self.towns.write().expect("lock poisoned");
        let mut residents = BTreeSet::new();
        residents.insert(mayor);
        towns.insert(
            name.to_string(),
            Town {
                mayor,
                residents,
                plots: Vec::new(),
                policy,
            },
        );
    }

    /// Claim a plot for an existing town. Unknown towns are ignored.
    pub fn claim_plot(&self, town: &str, plot: Plot) {
        let mut towns = self.towns.write().expect("lock poisoned");
        if let Some(town) = towns.get_mut(town) {
            town.plots.push(plot);
        }
    }

    /// Add a resident to a town. Unknown towns are ignored.
    pub fn add_resident(&self, town: &str, player: PlayerId) {
        let mut towns = self.towns.write().expect("lock poisoned");
        if let Some(town) = towns.get_mut(town) {
            town.residents.insert(player);
        }
    }

    fn town_at<'a>(
        towns: &'a HashMap<String, Town>,
        pos: &BlockPos,
    ) -> Option<(&'a String, &'a Town)> {
        towns
            .iter()
            .find(|(_, town)| town.plots.iter().any(|plot| plot.contains(pos)))
    }
}

impl Default for TownAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimAdapter for TownAdapter {
    fn name(&self) -> &str {
        "towns"
    }

    fn owner_of(&self, pos: &BlockPos) -> Option<Principal> {
        let towns = self.towns.read().expect("lock poisoned");
        Self::town_at(&towns, pos).map(|(name, _)| Principal::group(name.clone()))
    }

    fn permits(&self, actor: PlayerId, pos: &BlockPos, _action: Action) -> Verdict {
        let towns = self.towns.read().expect("lock poisoned");
        match Self::town_at(&towns, pos) {
            Some((name, town)) => match town.policy {
                TownBuildPolicy::Open => Verdict::Allow,
                TownBuildPolicy::ResidentsOnly => {
                    if town.residents.contains(&actor) {
                        Verdict::Allow
                    } else {
                        Verdict::deny(format!("only residents of {name} may act here"))
                    }
                }
            },
            None => Verdict::Abstain, // wilderness
        }
    }

    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let towns = self.towns.read().expect("lock poisoned");
        towns
            .iter()
            .filter(|(_, town)| town.residents.contains(&actor))
            .map(|(name, _)| GroupId::new(name.clone()))
            .collect()
    }

    fn is_leader_of(&self, actor: PlayerId, group: &GroupId) -> bool {
        let towns = self.towns.read().expect("lock poisoned");
        towns
            .iter()
            .any(|(name, town)| town.mayor == actor && group.matches(&GroupId::new(name.clone())))
    }
}

impl std::fmt::Debug for TownAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.towns.read().expect("lock poisoned").len();
        f.debug_struct("TownAdapter").field("towns", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inside() -> BlockPos {
        BlockPos::new("world", 5, 64, 5)
    }

    fn outside() -> BlockPos {
        BlockPos::new("world", 500, 64, 500)
    }

    fn hometown(policy: TownBuildPolicy) -> (TownAdapter, PlayerId) {
        let adapter = TownAdapter::new();
        let mayor = PlayerId::random();
        adapter.found_town("Hometown", mayor, policy);
        adapter.claim_plot(
            "Hometown",
            Plot {
                world: "world".into(),
                min: [0, 0],
                max: [15, 15],
            },
        );
        (adapter, mayor)
    }

    #[test]
    fn wilderness_abstains() {
        let (adapter, mayor) = hometown(TownBuildPolicy::ResidentsOnly);
        assert!(adapter.permits(mayor, &outside(), Action::Use).is_abstain());
        assert!(adapter.owner_of(&outside()).is_none());
    }

    #[test]
    fn residents_only_denies_outsiders() {
        let (adapter, mayor) = hometown(TownBuildPolicy::ResidentsOnly);
        let stranger = PlayerId::random();
        assert_eq!(adapter.permits(mayor, &inside(), Action::Use), Verdict::Allow);
        match adapter.permits(stranger, &inside(), Action::Use) {
            Verdict::Deny { reason } => assert!(reason.contains("Hometown")),
            other => panic!("expected deny, got {other:?}"),
        }
    }

    #[test]
    fn open_towns_allow_anyone() {
        let (adapter, _) = hometown(TownBuildPolicy::Open);
        assert_eq!(
            adapter.permits(PlayerId::random(), &inside(), Action::Use),
            Verdict::Allow
        );
    }

    #[test]
    fn town_is_the_claim_owner() {
        let (adapter, _) = hometown(TownBuildPolicy::ResidentsOnly);
        assert_eq!(
            adapter.owner_of(&inside()),
            Some(Principal::group("Hometown"))
        );
    }

    #[test]
    fn residents_are_town_members_mayor_is_leader() {
        let (adapter, mayor) = hometown(TownBuildPolicy::ResidentsOnly);
        let resident = PlayerId::random();
        adapter.add_resident("Hometown", resident);

        let groups = adapter.groups_of(resident);
        assert!(groups.contains(&GroupId::new("Hometown")));
        assert!(adapter.is_leader_of(mayor, &GroupId::new("hometown")));
        assert!(!adapter.is_leader_of(resident, &GroupId::new("Hometown")));
    }
}
