// src/world/mod.rs

//! Worlds: pack requirements, candidate selection and live-world swaps

pub mod requirements;
mod selector;

pub use requirements::{PackReference, WorldRequirement};
pub use selector::{Activation, WorldCandidate, WorldChoice, WorldSelector};

use crate::archive;
use crate::backup::{BackupArchive, BackupManager};
use crate::error::{Error, Result};
use crate::filesystem::{is_missing_or_empty, swap_dir};
use crate::hash::to_slash_path;
use crate::progress::ProgressTracker;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// File holding a world's display name
pub const LEVEL_NAME_FILE: &str = "levelname.txt";

/// Name used when a world carries no readable level name
pub const DEFAULT_LEVEL_NAME: &str = "World";

const WORLD_DB_DIR: &str = "db";

/// Display name of an on-disk world
pub fn read_level_name(world_dir: &Path) -> String {
    let path = world_dir.join(LEVEL_NAME_FILE);
    match fs::read(&path) {
        Ok(content) => clean_level_name(&content).unwrap_or_else(|| DEFAULT_LEVEL_NAME.to_string()),
        Err(e) => {
            if path.exists() {
                warn!("Could not read level name from {}: {}", path.display(), e);
            }
            DEFAULT_LEVEL_NAME.to_string()
        }
    }
}

/// Display name stored inside a packaged world, if any
pub fn level_name_from_archive(world_archive: &Path) -> Option<String> {
    let mut files = read_world_files(world_archive, &[LEVEL_NAME_FILE]).ok()?;
    files
        .remove(LEVEL_NAME_FILE)
        .and_then(|content| clean_level_name(&content))
}

/// Files at the world root of a packaged world, keyed by file name
///
/// Only names in `names` are read. The world root is found with
/// [`wrapper_folder`], the same rule `replace_live_world` applies when
/// importing.
pub(crate) fn read_world_files(
    world_archive: &Path,
    names: &[&str],
) -> Result<HashMap<String, Vec<u8>>> {
    let mut paths = Vec::new();
    let entries = archive::read_entries_matching(world_archive, |p| {
        paths.push(p.to_string());
        p.rsplit('/').next().is_some_and(|name| names.contains(&name))
    })?;
    let prefix = wrapper_folder(paths.iter().map(String::as_str))
        .map(|folder| format!("{}/", folder))
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let name = entry.path.strip_prefix(prefix.as_str())?;
            (!name.contains('/')).then(|| (name.to_string(), entry.content))
        })
        .collect())
}

/// Folder a packaged world is wrapped in, if any
///
/// `paths` are the container's files, '/'-separated and relative to its
/// root. The world sits at the container root unless every file lives
/// under one top-level folder other than the world's own `db`.
pub(crate) fn wrapper_folder<'a>(paths: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut wrapper = None;
    for path in paths {
        let (first, _) = path.split_once('/')?;
        match wrapper {
            None => wrapper = Some(first),
            Some(seen) if seen == first => {}
            Some(_) => return None,
        }
    }
    wrapper.filter(|folder| *folder != WORLD_DB_DIR)
}

fn clean_level_name(content: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(content).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Result of replacing the live world from a container
#[derive(Debug)]
pub struct WorldSwap {
    pub files: u64,
    /// Snapshot of the previous live world, if there was one
    pub safety_backup: Option<BackupArchive>,
}

/// Replace the live world with the contents of `world_archive`
///
/// The container is fully extracted into a staging directory next to the
/// live world first; an extraction failure returns before anything live is
/// touched. A safety backup of the previous world is taken next (skipped
/// when the live directory is empty or absent), and only then is the staged
/// tree swapped into place.
pub fn replace_live_world(
    world_archive: &Path,
    live_world: &Path,
    backups: &BackupManager,
    progress: &dyn ProgressTracker,
) -> Result<WorldSwap> {
    let parent = live_world
        .parent()
        .ok_or_else(|| Error::InvalidPath(live_world.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".worldpack-import-")
        .tempdir_in(parent)?;
    let files = archive::extract_to(world_archive, staging.path())?;
    let staged_root = world_root(staging.path())?;

    let safety_backup = if is_missing_or_empty(live_world)? {
        None
    } else {
        Some(backups.create(live_world, progress)?)
    };

    swap_dir(&staged_root, live_world)?;
    info!(
        "Installed {} as live world {}",
        world_archive.display(),
        live_world.display()
    );

    Ok(WorldSwap {
        files,
        safety_backup,
    })
}

/// Locate the world root inside an extracted container
fn world_root(extracted: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(extracted).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(to_slash_path(
                entry.path().strip_prefix(extracted).unwrap_or(entry.path()),
            ));
        }
    }
    Ok(match wrapper_folder(files.iter().map(String::as_str)) {
        Some(folder) => extracted.join(folder),
        None => extracted.to_path_buf(),
    })
}
