// src/hash.rs

//! Content digests for pack payloads
//!
//! A pack's digest covers every payload file's relative path and bytes, fed
//! in sorted path order so the same tree always hashes the same way whether
//! it came out of an archive or off disk. The deployment engine compares the
//! digest of an installed directory against the pool source to decide
//! whether a reinstall is needed.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

/// SHA-256 digest of a pack payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Hex form of the digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates (relative path, content) pairs and produces a digest
///
/// Entries can be added in any order; they are sorted on `finish`.
#[derive(Debug, Default)]
pub struct PayloadHasher {
    entries: BTreeMap<String, [u8; 32]>,
}

impl PayloadHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file. Paths use '/' separators relative to the pack root.
    pub fn add(&mut self, relative_path: &str, content: &[u8]) {
        let file_hash: [u8; 32] = Sha256::digest(content).into();
        self.entries.insert(relative_path.to_string(), file_hash);
    }

    /// Number of files added so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> ContentDigest {
        let mut hasher = Sha256::new();
        for (path, file_hash) in &self.entries {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(file_hash);
        }
        ContentDigest(hex::encode(hasher.finalize()))
    }
}

/// Digest every regular file under `root`
pub fn digest_dir(root: &Path) -> Result<ContentDigest> {
    let mut hasher = PayloadHasher::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path());
        let content = std::fs::read(entry.path())?;
        hasher.add(&to_slash_path(relative), &content);
    }
    Ok(hasher.finish())
}

/// Render a relative path with '/' separators on every platform
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
