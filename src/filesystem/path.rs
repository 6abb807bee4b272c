// src/filesystem/path.rs

//! Path sanitization for archive entries
//!
//! Pack and world archives come from third parties. Entry names are
//! normalised to relative paths and anything that would climb out of the
//! extraction root is rejected before a single byte is written.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Normalise an untrusted relative path
///
/// Leading slashes and `.` components are dropped; `..` anywhere is an error;
/// an empty result is an error.
///
/// ```
/// use worldpack::filesystem::path::sanitize_path;
/// use std::path::PathBuf;
///
/// assert_eq!(sanitize_path("./db/CURRENT").unwrap(), PathBuf::from("db/CURRENT"));
/// assert!(sanitize_path("../level.dat").is_err());
/// ```
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let raw = path.to_string_lossy();
    let relative = raw.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => return Err(Error::PathTraversal(raw.to_string())),
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath(format!("empty path '{}'", raw)));
    }
    Ok(normalized)
}

/// Join an untrusted relative path under `root`
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let joined = root.join(sanitize_path(path)?);
    if !joined.starts_with(root) {
        return Err(Error::PathTraversal(joined.display().to_string()));
    }
    Ok(joined)
}

/// Validate a single directory or file name (no separators, not `.`/`..`)
pub fn sanitize_filename(name: &str) -> Result<&str> {
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::PathTraversal(name.to_string()));
    }
    if name.is_empty() {
        return Err(Error::InvalidPath("empty file name".to_string()));
    }
    Ok(name)
}
