// src/filesystem/mod.rs

//! Filesystem helpers shared by deployment, world selection and backups
//!
//! - `path`: sanitisation of untrusted archive entry names
//! - atomic single-file writes (temp file + rename)
//! - directory swaps

pub mod path;

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// True when `path` does not exist or is a directory with no entries
pub fn is_missing_or_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write `content` to `target` via a sibling temp file and rename
///
/// Readers never observe a half-written file.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Replace `target` with the fully prepared directory `staged`
///
/// The old tree is moved aside first and deleted only after the new one is
/// in place, so a failed rename leaves the original contents recoverable.
pub fn swap_dir(staged: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let retired = retired_path(target);
    let had_previous = target.exists();
    if had_previous {
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        fs::rename(target, &retired)?;
    }

    if let Err(e) = fs::rename(staged, target) {
        if had_previous {
            fs::rename(&retired, target)?;
        }
        return Err(e.into());
    }

    if had_previous {
        fs::remove_dir_all(&retired)?;
    }
    debug!("Swapped {} into {}", staged.display(), target.display());
    Ok(())
}

fn retired_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.retired", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_missing_or_empty(&dir.path().join("nope")).unwrap());
        assert!(is_missing_or_empty(dir.path()).unwrap());
        fs::write(dir.path().join("level.dat"), b"x").unwrap();
        assert!(!is_missing_or_empty(dir.path()).unwrap());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/world_behavior_packs.json");
        write_atomic(&target, b"[]").unwrap();
        write_atomic(&target, b"[1]").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"[1]");
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_swap_dir_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live");
        let staged = dir.path().join("staged");
        fs::create_dir_all(&live).unwrap();
        fs::write(live.join("old.txt"), b"old").unwrap();
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("new.txt"), b"new").unwrap();

        swap_dir(&staged, &live).unwrap();

        assert!(live.join("new.txt").exists());
        assert!(!live.join("old.txt").exists());
        assert!(!staged.exists());
        assert!(!retired_path(&live).exists());
    }
}
