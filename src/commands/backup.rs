// src/commands/backup.rs
//! Backup, listing and restore commands

use super::format_bytes;
use super::progress;
use anyhow::{Context, Result};
use worldpack::{BackupManager, RunLock, ServerLayout};

/// Snapshot the live world, then show the listing
pub fn cmd_backup(layout: &ServerLayout) -> Result<()> {
    let _lock = RunLock::try_acquire(&layout.backup_dir).context("Cannot start backup")?;
    let manager = BackupManager::from_layout(layout);

    let progress = progress::tracker("Backing up");
    let backup = manager
        .create(&layout.live_world, progress.as_ref())
        .with_context(|| format!("Failed to back up {}", layout.live_world.display()))?;

    println!(
        "Created {} ({} files, {})",
        backup.path.display(),
        backup.files,
        format_bytes(backup.size)
    );
    println!();
    cmd_backups(layout)
}

/// List backups, newest first
pub fn cmd_backups(layout: &ServerLayout) -> Result<()> {
    let manager = BackupManager::from_layout(layout);
    let entries = manager.list()?;

    println!("Backups in {}:", manager.backup_dir().display());
    if entries.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "  {}  {:>10}  {}",
            entry.modified.format("%Y-%m-%d %H:%M"),
            format_bytes(entry.size),
            entry.file_name
        );
    }
    Ok(())
}

/// Replace the live world with a backup
pub fn cmd_restore(layout: &ServerLayout, backup: &str) -> Result<()> {
    let _lock = RunLock::try_acquire(&layout.backup_dir).context("Cannot start restore")?;
    let manager = BackupManager::from_layout(layout);
    let path = manager.locate(backup)?;

    println!("Make sure the server is stopped before restoring.");
    let progress = progress::tracker("Restoring");
    let swap = manager
        .restore(&path, &layout.live_world, progress.as_ref())
        .with_context(|| format!("Failed to restore {}; live world unchanged", path.display()))?;

    if let Some(safety) = &swap.safety_backup {
        println!("Previous world saved as {}", safety.path.display());
    }
    println!(
        "Restored {} files from {} into {}",
        swap.files,
        path.display(),
        layout.live_world.display()
    );
    Ok(())
}
