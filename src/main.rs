// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins unless --verbose was given
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let layout = commands::load_layout(&cli.root, cli.config.as_deref())?;

    match command {
        Commands::Setup {
            world,
            existing,
            all_packs,
            dry_run,
        } => commands::cmd_setup(&layout, world, existing, all_packs, dry_run),
        Commands::Check { world } => commands::cmd_check(&layout, world),
        Commands::Packs => commands::cmd_packs(&layout),
        Commands::Worlds => commands::cmd_worlds(&layout),
        Commands::Backup => commands::cmd_backup(&layout),
        Commands::Backups => commands::cmd_backups(&layout),
        Commands::Restore { backup } => commands::cmd_restore(&layout, &backup),
    }
}
