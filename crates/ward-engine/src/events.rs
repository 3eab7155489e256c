use ward_types::{BlockPos, ChunkPos, Player};

/// World-state notifications pushed into the engine by the host runtime.
///
/// The core never polls world state: everything it knows about blocks,
/// signs, and chunks arrives through these events.
#[derive(Clone, Debug)]
pub enum WorldEvent {
    /// A block appeared. If it extends an adjacent protected block of the
    /// same kind (the second half of a double chest), its lock grows.
    BlockPlaced {
        actor: Player,
        pos: BlockPos,
        kind: String,
    },
    /// A block was removed. Its lock shrinks, or is destroyed if this was
    /// the last covered position.
    BlockBroken { pos: BlockPos },
    /// A block was pushed or pulled to a new position.
    BlockMoved { from: BlockPos, to: BlockPos },
    /// The sign governing a block was written or edited. Creates a lock
    /// when none exists, reparses the existing one otherwise.
    SignChanged {
        actor: Player,
        pos: BlockPos,
        kind: String,
        lines: Vec<String>,
    },
    /// A chunk left memory on the host side; cached protection data for it
    /// can be dropped.
    ChunkUnloaded { chunk: ChunkPos },
}
