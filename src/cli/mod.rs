// src/cli/mod.rs
//! CLI definitions for worldpack
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations live in the `commands` module.
//!
//! - `setup` - Select a world, resolve its packs and deploy them
//! - `check` - Resolve a world's packs without changing anything
//! - `packs` / `worlds` - Inspect the pack pool and staged worlds
//! - `backup` / `backups` / `restore` - World snapshots

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "worldpack")]
#[command(version)]
#[command(about = "Deploy add-on packs into a Bedrock world and keep dated backups", long_about = None)]
pub struct Cli {
    /// Server root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Layout file (default: <root>/worldpack.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a world, resolve its required packs and deploy them
    Setup {
        /// Import staged world N (as numbered by `worlds`)
        #[arg(long, conflicts_with = "existing")]
        world: Option<usize>,

        /// Keep the world already in the live directory
        #[arg(long)]
        existing: bool,

        /// Deploy every pack in the pool, not only the ones the world lists
        #[arg(long)]
        all_packs: bool,

        /// Show what would change without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the pool satisfies a world's pack requirements
    Check {
        /// Check staged world N instead of the live world
        #[arg(long)]
        world: Option<usize>,
    },

    /// List the packs available in the pool
    Packs,

    /// List staged worlds available for import
    Worlds,

    /// Back up the live world
    Backup,

    /// List existing backups, newest first
    Backups,

    /// Replace the live world with a backup (stop the server first)
    Restore {
        /// Backup file name in the backup directory, or a path
        backup: String,
    },
}
