use std::fmt;

use serde::{Deserialize, Serialize};

/// A block coordinate in a named world.
///
/// Positions are the primary key of the protection model: every lock owns a
/// set of positions, and every position belongs to at most one lock.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// Name of the world this block is in.
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The chunk column containing this block.
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos {
            world: self.world.clone(),
            x: self.x >> 4,
            z: self.z >> 4,
        }
    }

    /// Returns `true` if `other` is an axis-aligned neighbor of this block
    /// in the same world. Diagonals do not count: a double chest or a door
    /// half is always a face neighbor.
    pub fn is_adjacent(&self, other: &BlockPos) -> bool {
        if self.world != other.world {
            return false;
        }
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        let dz = (self.z - other.z).abs();
        dx + dy + dz == 1
    }

    /// Neighbor offset by the given deltas, staying in the same world.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> BlockPos {
        BlockPos {
            world: self.world.clone(),
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl fmt::Debug for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockPos({} {},{},{})", self.world, self.x, self.y, self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

/// A 16×16 chunk column. The registry evicts cache entries chunk-at-a-time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub world: String,
    pub x: i32,
    pub z: i32,
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[{},{}]", self.world, self.x, self.z)
    }
}

/// A finite region of the world used for store scans.
///
/// Both the world filter and the coordinate box are optional; an empty
/// bounds matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBounds {
    /// Restrict to this world, if set.
    pub world: Option<String>,
    /// Inclusive minimum corner `[x, y, z]`, if set.
    pub min: Option<[i32; 3]>,
    /// Inclusive maximum corner `[x, y, z]`, if set.
    pub max: Option<[i32; 3]>,
}

impl AreaBounds {
    /// Bounds that match every position.
    pub fn everywhere() -> Self {
        Self::default()
    }

    /// Bounds restricted to a single world.
    pub fn world(name: impl Into<String>) -> Self {
        Self {
            world: Some(name.into()),
            min: None,
            max: None,
        }
    }

    /// Bounds restricted to an inclusive coordinate box in one world.
    pub fn boxed(world: impl Into<String>, min: [i32; 3], max: [i32; 3]) -> Self {
        Self {
            world: Some(world.into()),
            min: Some(min),
            max: Some(max),
        }
    }

    /// Whether the given position falls inside these bounds.
    pub fn contains(&self, pos: &BlockPos) -> bool {
        if let Some(world) = &self.world {
            if *world != pos.world {
                return false;
            }
        }
        if let Some(min) = self.min {
            if pos.x < min[0] || pos.y < min[1] || pos.z < min[2] {
                return false;
            }
        }
        if let Some(max) = self.max {
            if pos.x > max[0] || pos.y > max[1] || pos.z > max[2] {
                return false;
            }
        }
        true
    }
}
