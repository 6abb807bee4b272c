// src/backup/mod.rs

//! World backups
//!
//! A backup is a single container holding the flattened world directory,
//! named by [`naming::BackupName`]. Backups are written atomically: a failed
//! attempt leaves no file at the final path.

pub mod naming;

pub use naming::BackupName;

use crate::archive;
use crate::config::ServerLayout;
use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_filename;
use crate::progress::ProgressTracker;
use crate::world::{read_level_name, replace_live_world, WorldSwap};
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fresh names tried when the chosen one is taken mid-write
const MAX_NAME_ATTEMPTS: u32 = 8;

/// One completed backup
#[derive(Debug, Clone, PartialEq)]
pub struct BackupArchive {
    pub name: BackupName,
    pub path: PathBuf,
    /// Files packaged
    pub files: u64,
    pub size: u64,
}

impl BackupArchive {
    pub fn file_name(&self) -> String {
        self.name.file_name()
    }
}

/// A backup file found in the backup directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// Creates, lists and restores backups in one directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
    extension: String,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_layout(layout: &ServerLayout) -> Self {
        Self::new(&layout.backup_dir, &layout.world_extension)
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshot `world_dir` under today's date
    pub fn create(&self, world_dir: &Path, progress: &dyn ProgressTracker) -> Result<BackupArchive> {
        self.create_on(world_dir, Local::now().date_naive(), progress)
    }

    /// Snapshot `world_dir` under an explicit date
    pub fn create_on(
        &self,
        world_dir: &Path,
        date: NaiveDate,
        progress: &dyn ProgressTracker,
    ) -> Result<BackupArchive> {
        if !world_dir.is_dir() {
            return Err(Error::WorldNotFound(world_dir.to_path_buf()));
        }
        let level_name = read_level_name(world_dir);
        progress.set_message(&format!("Backing up {}", level_name));

        let mut attempts = 0;
        let (name, path, summary) = loop {
            let name = BackupName::next_in(&self.backup_dir, &level_name, date, &self.extension)?;
            let path = name.path_in(&self.backup_dir);
            match archive::write_dir(world_dir, &path, progress) {
                Ok(summary) => break (name, path, summary),
                // Someone else took the name after it was chosen
                Err(Error::ArchiveExists(taken)) if attempts < MAX_NAME_ATTEMPTS => {
                    warn!("{} appeared while backing up, trying the next name", taken.display());
                    attempts += 1;
                }
                Err(e) => {
                    progress.finish_with_error(&e.to_string());
                    return Err(e);
                }
            }
        };
        progress.finish_with_message(&format!("Created {}", name.file_name()));
        if !summary.skipped.is_empty() {
            warn!(
                "Backup {} leaves out {} entries that are not regular files",
                name.file_name(),
                summary.skipped.len()
            );
        }
        info!(
            "Backed up '{}' to {} ({:.1}% compression)",
            level_name,
            path.display(),
            summary.compression_ratio()
        );

        Ok(BackupArchive {
            name,
            path,
            files: summary.files,
            size: summary.archive_bytes,
        })
    }

    /// Existing backups, newest first
    ///
    /// Ties on modification time fall back to reverse name order, which for
    /// one level on one day is reverse suffix order.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        if !self.backup_dir.is_dir() {
            return Ok(entries);
        }

        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_backup = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
            if !is_backup || !entry.file_type()?.is_file() {
                continue;
            }
            let metadata = entry.metadata()?;
            entries.push(BackupEntry {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: metadata.modified()?.into(),
                path,
            });
        }

        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(entries)
    }

    /// Resolve a user-supplied backup reference
    ///
    /// Bare file names are looked up in the backup directory; anything with
    /// a directory component is taken as a path.
    pub fn locate(&self, reference: &str) -> Result<PathBuf> {
        let as_path = Path::new(reference);
        let path = if as_path.components().count() > 1 || as_path.is_absolute() {
            as_path.to_path_buf()
        } else {
            self.backup_dir.join(sanitize_filename(reference)?)
        };
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::WorldNotFound(path))
        }
    }

    /// Replace the live world with a backup
    ///
    /// The hosting process must already be stopped. The current live world
    /// is snapshotted first unless it is empty or absent; an unreadable
    /// backup leaves the live world untouched.
    pub fn restore(
        &self,
        backup: &Path,
        live_world: &Path,
        progress: &dyn ProgressTracker,
    ) -> Result<WorldSwap> {
        info!("Restoring {} into {}", backup.display(), live_world.display());
        replace_live_world(backup, live_world, self, progress)
    }
}
