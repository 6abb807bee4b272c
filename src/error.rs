// src/error.rs

//! Error types for worldpack
//!
//! Discovery and deployment problems that should not stop a run
//! (`IdentityConflict`, `VersionMismatch`, per-pack install failures) are
//! collected into reports by their modules; the variants here are the ones
//! that can be raised.

use crate::pack::Capability;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No manifest.json anywhere in the pack source
    #[error("no manifest found in {0}")]
    ManifestMissing(PathBuf),

    /// Manifest present but uuid, version or capability unusable
    #[error("malformed manifest in {source_path}: {reason}")]
    ManifestMalformed { source_path: PathBuf, reason: String },

    /// A world pack-reference document that is not a list of references
    #[error("malformed pack reference document {path}: {reason}")]
    ReferenceMalformed { path: PathBuf, reason: String },

    /// World requires a pack the pool does not provide
    #[error("world '{world}' requires {capability} pack {uuid}, which is not in the pack pool")]
    MissingDependency {
        uuid: String,
        capability: Capability,
        world: String,
    },

    /// Registry lookup miss
    #[error("{capability} pack {uuid} not registered")]
    NotFound { uuid: String, capability: Capability },

    #[error("failed to install pack {uuid}: {reason}")]
    PackInstallFailed { uuid: String, reason: String },

    #[error("failed to write archive {path}: {reason}")]
    ArchiveWriteFailed { path: PathBuf, reason: String },

    /// Destination already taken; the existing file was left alone
    #[error("archive already exists: {0}")]
    ArchiveExists(PathBuf),

    #[error("failed to extract archive {path}: {reason}")]
    ArchiveExtractFailed { path: PathBuf, reason: String },

    #[error("world not found: {0}")]
    WorldNotFound(PathBuf),

    #[error("invalid world selection: {0}")]
    InvalidSelection(String),

    #[error("another worldpack run holds the lock at {0}")]
    Locked(PathBuf),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a malformed manifest error
    pub fn malformed(source_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ManifestMalformed {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }
}
