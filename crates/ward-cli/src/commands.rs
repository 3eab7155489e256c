use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use colored::Colorize;
use uuid::Uuid;
use ward_acl::NoResolver;
use ward_claims::ClaimDirectory;
use ward_engine::{Warden, WardenConfig};
use ward_store::FileProtectionStore;
use ward_types::{Action, AreaBounds, BlockPos, Lock, LockType, Player, PlayerId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let warden = open_warden(&cli)?;
    match cli.command {
        Command::Attach(ref args) => cmd_attach(&warden, &cli, args),
        Command::Detach(ref args) => cmd_detach(&warden, args),
        Command::Transfer(ref args) => cmd_transfer(&warden, &cli, args),
        Command::List(ref args) => cmd_list(&warden, &cli, args),
        Command::Decide(ref args) => cmd_decide(&warden, &cli, args),
        Command::Sweep(ref args) => cmd_sweep(&warden, args),
    }
}

fn open_warden(cli: &Cli) -> anyhow::Result<Warden> {
    let store = FileProtectionStore::open(Path::new(&cli.data_dir))
        .with_context(|| format!("opening protection data in {}", cli.data_dir))?;
    let mut config = WardenConfig::default();
    // The CLI edits arbitrary kinds of blocks; kind gating belongs to the
    // live server, not the admin tool.
    if let Command::Attach(args) = &cli.command {
        config.lockable_kinds.insert(args.kind.to_ascii_lowercase());
    }
    if let Command::Detach(DetachArgs { actor, force: true, .. })
    | Command::Transfer(TransferArgs { actor, force: true, .. }) = &cli.command
    {
        config.overrides.insert(parse_player(actor)?.id);
    }
    Ok(Warden::new(
        Arc::new(store),
        ClaimDirectory::new(),
        Arc::new(NoResolver),
        config,
    ))
}

/// Parse `world:x,y,z`.
fn parse_pos(text: &str) -> anyhow::Result<BlockPos> {
    let (world, coords) = text
        .split_once(':')
        .context("position must be world:x,y,z")?;
    let parts: Vec<&str> = coords.split(',').collect();
    if parts.len() != 3 || world.is_empty() {
        bail!("position must be world:x,y,z, got {text:?}");
    }
    let mut xyz = [0i32; 3];
    for (slot, part) in xyz.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .with_context(|| format!("bad coordinate {part:?}"))?;
    }
    Ok(BlockPos::new(world, xyz[0], xyz[1], xyz[2]))
}

/// Parse `name#uuid`.
fn parse_player(text: &str) -> anyhow::Result<Player> {
    let (name, id) = text
        .split_once('#')
        .context("player must be name#uuid")?;
    if name.is_empty() {
        bail!("player name is empty in {text:?}");
    }
    let id = Uuid::parse_str(id.trim()).with_context(|| format!("bad player id in {text:?}"))?;
    Ok(Player::new(PlayerId(id), name))
}

fn bounds_for(world: &Option<String>) -> AreaBounds {
    match world {
        Some(world) => AreaBounds::world(world.clone()),
        None => AreaBounds::everywhere(),
    }
}

fn print_lock(cli: &Cli, lock: &Lock) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(lock)?),
        OutputFormat::Text => {
            println!(
                "{}  {}  owner {}",
                lock.id.to_string().yellow(),
                lock.lock_type.to_string().cyan(),
                lock.owner.to_string().bold()
            );
            for pos in &lock.locations {
                println!("  at {pos}");
            }
            for entry in &lock.acl {
                println!("  grants {} {}", entry.principal, entry.level.to_string().cyan());
            }
            if let Some(expires) = lock.expires_at {
                println!("  expires {expires}");
            }
        }
    }
    Ok(())
}

fn cmd_attach(warden: &Warden, cli: &Cli, args: &AttachArgs) -> anyhow::Result<()> {
    let pos = parse_pos(&args.pos)?;
    let owner = parse_player(&args.owner)?;
    let lock_type = LockType::from_header_word(&args.lock_type)
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let outcome = warden.attach(&owner, pos, &args.kind, lock_type, &args.lines)?;
    for warning in &outcome.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
    if matches!(cli.format, OutputFormat::Text) {
        println!("{} attached", "✓".green().bold());
    }
    print_lock(cli, &outcome.lock)
}

fn cmd_detach(warden: &Warden, args: &DetachArgs) -> anyhow::Result<()> {
    let pos = parse_pos(&args.pos)?;
    let actor = parse_player(&args.actor)?;
    warden.detach(actor.id, &pos)?;
    println!("{} detached lock at {}", "✓".green().bold(), pos);
    Ok(())
}

fn cmd_transfer(warden: &Warden, cli: &Cli, args: &TransferArgs) -> anyhow::Result<()> {
    let pos = parse_pos(&args.pos)?;
    let actor = parse_player(&args.actor)?;
    let new_owner = parse_player(&args.to)?;
    let lock = warden.transfer(actor.id, &pos, new_owner.principal())?;
    if matches!(cli.format, OutputFormat::Text) {
        println!("{} transferred", "✓".green().bold());
    }
    print_lock(cli, &lock)
}

fn cmd_list(warden: &Warden, cli: &Cli, args: &ListArgs) -> anyhow::Result<()> {
    let locks = warden.scan(&bounds_for(&args.world))?;
    let mut count = 0usize;
    for lock in locks {
        print_lock(cli, &lock)?;
        count += 1;
    }
    if matches!(cli.format, OutputFormat::Text) {
        println!("{count} lock(s)");
    }
    Ok(())
}

fn cmd_decide(warden: &Warden, cli: &Cli, args: &DecideArgs) -> anyhow::Result<()> {
    let pos = parse_pos(&args.pos)?;
    let actor = parse_player(&args.actor)?;
    let action = Action::from_str(&args.action).map_err(|err| anyhow::anyhow!("{err}"))?;

    let decision = warden.decide(actor.id, &pos, action);
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
        OutputFormat::Text => match decision.reason() {
            None => println!("{} {} may {} at {}", "✓".green().bold(), actor.name, action, pos),
            Some(reason) => println!("{} {}", "✗".red().bold(), reason),
        },
    }
    Ok(())
}

fn cmd_sweep(warden: &Warden, args: &SweepArgs) -> anyhow::Result<()> {
    let report = warden.sweep_expired(Utc::now(), &bounds_for(&args.world))?;
    println!(
        "{} examined {}, expired {}",
        "✓".green().bold(),
        report.examined,
        report.expired
    );
    Ok(())
}
