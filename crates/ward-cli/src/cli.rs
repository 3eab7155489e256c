use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ward",
    about = "Blockward — block protection data tooling",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the lock records.
    #[arg(long, global = true, default_value = "./ward-data")]
    pub data_dir: String,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a lock at a position
    Attach(AttachArgs),
    /// Destroy a lock
    Detach(DetachArgs),
    /// Hand a lock to a new owner
    Transfer(TransferArgs),
    /// List locks, optionally filtered by world
    List(ListArgs),
    /// Evaluate an access check
    Decide(DecideArgs),
    /// Destroy every lock whose expiry has passed
    Sweep(SweepArgs),
}

#[derive(Args)]
pub struct AttachArgs {
    /// Position as world:x,y,z
    pub pos: String,
    /// Owner as name#uuid
    #[arg(long)]
    pub owner: String,
    /// Lock type: private, public, donation, or display
    #[arg(long, default_value = "private")]
    pub lock_type: String,
    /// Block kind at the position
    #[arg(long, default_value = "chest")]
    pub kind: String,
    /// Extra sign lines (ACL entries), repeatable
    #[arg(long = "line")]
    pub lines: Vec<String>,
}

#[derive(Args)]
pub struct DetachArgs {
    /// Position as world:x,y,z
    pub pos: String,
    /// Acting player as name#uuid
    #[arg(long)]
    pub actor: String,
    /// Act as an operator override
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct TransferArgs {
    /// Position as world:x,y,z
    pub pos: String,
    /// Acting player as name#uuid
    #[arg(long)]
    pub actor: String,
    /// New owner as name#uuid
    #[arg(long)]
    pub to: String,
    /// Act as an operator override
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Restrict to one world
    #[arg(long)]
    pub world: Option<String>,
}

#[derive(Args)]
pub struct DecideArgs {
    /// Position as world:x,y,z
    pub pos: String,
    /// Acting player as name#uuid
    #[arg(long)]
    pub actor: String,
    /// Action: view, use, or manage
    #[arg(long, default_value = "use")]
    pub action: String,
}

#[derive(Args)]
pub struct SweepArgs {
    /// Restrict to one world
    #[arg(long)]
    pub world: Option<String>,
}
