// src/pack/registry.rs

//! Index of available packs keyed by identity
//!
//! Two pool entries claiming the same uuid and capability are a conflict,
//! whether or not their content differs. The run does not stop for it: the
//! most recently modified source wins, ties broken by path so the outcome
//! never depends on scan order, and the conflict is kept for the caller to
//! report.

use super::source::{self, PackSource};
use super::{Capability, PackIdentity, PackKey};
use crate::config::ServerLayout;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Two sources claiming the same identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConflict {
    pub key: PackKey,
    /// Both sources carry the same payload
    pub identical: bool,
    /// Source that stays registered
    pub kept: PathBuf,
    /// Source that lost the tie-break
    pub discarded: PathBuf,
}

impl fmt::Display for IdentityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: using {}, ignoring {}",
            self.key,
            self.kept.display(),
            self.discarded.display()
        )?;
        if self.identical {
            write!(f, " (identical copy)")?;
        }
        Ok(())
    }
}

/// Packs available for installation
#[derive(Debug, Default)]
pub struct PackRegistry {
    packs: BTreeMap<PackKey, PackSource>,
    conflicts: Vec<IdentityConflict>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source, resolving identity collisions
    ///
    /// Returns the conflict if one was recorded. Registering the same origin
    /// twice is a no-op; any other second source for an identity is a
    /// conflict, including a byte-identical copy elsewhere in the pool.
    pub fn register(&mut self, source: PackSource) -> Option<IdentityConflict> {
        let key = source.key();
        let Some(existing) = self.packs.get(&key) else {
            debug!("Registered {} from {}", source.identity, source.source_path().display());
            self.packs.insert(key, source);
            return None;
        };
        if existing.origin == source.origin {
            return None;
        }

        let incoming_wins = prefer(&source, existing) == Ordering::Greater;
        let identical =
            existing.digest == source.digest && existing.identity.version == source.identity.version;

        let (kept, discarded) = if incoming_wins {
            (source.source_path().to_path_buf(), existing.source_path().to_path_buf())
        } else {
            (existing.source_path().to_path_buf(), source.source_path().to_path_buf())
        };
        if identical {
            warn!(
                "Duplicate copy of {}: keeping {}, ignoring {}",
                key,
                kept.display(),
                discarded.display()
            );
        } else {
            warn!(
                "Identity conflict for {}: keeping {}, ignoring {}",
                key,
                kept.display(),
                discarded.display()
            );
        }

        let conflict = IdentityConflict {
            key: key.clone(),
            identical,
            kept,
            discarded,
        };
        if incoming_wins {
            self.packs.insert(key, source);
        }
        self.conflicts.push(conflict.clone());
        Some(conflict)
    }

    /// Winning source for an identity
    pub fn lookup(&self, uuid: &str, capability: Capability) -> Result<&PackSource> {
        let key = PackKey::new(uuid, capability);
        self.packs.get(&key).ok_or(Error::NotFound {
            uuid: key.uuid,
            capability,
        })
    }

    /// Registered identities in (uuid, capability) order
    ///
    /// Each call starts a fresh pass over the registry.
    pub fn all(&self) -> impl Iterator<Item = &PackIdentity> + '_ {
        self.packs.values().map(|source| &source.identity)
    }

    /// Registered sources in (uuid, capability) order
    pub fn sources(&self) -> impl Iterator<Item = &PackSource> + '_ {
        self.packs.values()
    }

    pub fn conflicts(&self) -> &[IdentityConflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Build a registry from every pack in the pool directory
    ///
    /// Unreadable entries are collected in the report, never raised. A
    /// missing pool directory is an empty pool.
    pub fn scan(layout: &ServerLayout) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let pool = &layout.pool_dir;
        if !pool.is_dir() {
            warn!("Pack pool {} does not exist", pool.display());
            return Ok(report);
        }

        let mut candidates: Vec<PathBuf> = fs::read_dir(pool)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        candidates.sort();

        for candidate in candidates {
            let batch = if candidate.is_dir() {
                source::read_directory(&candidate)
            } else if layout.is_pack_archive(&candidate) {
                source::read_archive(&candidate)
            } else {
                debug!("Ignoring {}", candidate.display());
                continue;
            };

            match batch {
                Ok(batch) => {
                    for error in batch.errors {
                        warn!("Skipping pack root: {}", error);
                        report.errors.push(error);
                    }
                    for source in batch.sources {
                        report.registry.register(source);
                    }
                }
                Err(error) => {
                    warn!("Skipping {}: {}", candidate.display(), error);
                    report.errors.push(error);
                }
            }
        }

        info!(
            "Indexed {} packs from {} ({} conflicts, {} unreadable)",
            report.registry.len(),
            pool.display(),
            report.registry.conflicts().len(),
            report.errors.len()
        );
        Ok(report)
    }
}

/// Ordering of two sources for the same identity: greater wins
fn prefer(a: &PackSource, b: &PackSource) -> Ordering {
    a.modified
        .cmp(&b.modified)
        .then_with(|| b.source_path().cmp(a.source_path()))
}

/// Registry plus everything that went wrong while building it
#[derive(Debug, Default)]
pub struct ScanReport {
    pub registry: PackRegistry,
    /// Discovery errors (ManifestMissing, ManifestMalformed, unreadable archives)
    pub errors: Vec<Error>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PayloadHasher;
    use crate::pack::PackOrigin;
    use crate::version::PackVersion;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn source(uuid: &str, path: &str, content: &[u8], age_secs: u64) -> PackSource {
        let mut hasher = PayloadHasher::new();
        hasher.add("manifest.json", content);
        PackSource {
            identity: PackIdentity::new(uuid, Capability::Behavior, PackVersion::new(1, 0, 0)),
            name: None,
            origin: PackOrigin::Directory {
                dir: PathBuf::from(path),
            },
            files: vec!["manifest.json".to_string()],
            digest: hasher.finish(),
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 - age_secs),
        }
    }

    #[test]
    fn test_register_then_lookup() {
        let mut registry = PackRegistry::new();
        assert!(registry.register(source("AAA", "/pool/a", b"a", 0)).is_none());

        let found = registry.lookup("aaa", Capability::Behavior).unwrap();
        assert_eq!(found.identity.uuid, "aaa");
        assert!(matches!(
            registry.lookup("aaa", Capability::Resource),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_conflict_newest_wins_either_order() {
        for newer_first in [true, false] {
            let mut registry = PackRegistry::new();
            let old = source("dup", "/pool/old", b"old", 500);
            let new = source("dup", "/pool/new", b"new", 10);
            let (first, second) = if newer_first { (new, old) } else { (old, new) };

            registry.register(first);
            let conflict = registry.register(second).unwrap();

            assert_eq!(conflict.kept, PathBuf::from("/pool/new"));
            assert_eq!(conflict.discarded, PathBuf::from("/pool/old"));
            assert_eq!(
                registry.lookup("dup", Capability::Behavior).unwrap().source_path(),
                Path::new("/pool/new")
            );
            assert_eq!(registry.conflicts().len(), 1);
        }
    }

    #[test]
    fn test_identical_copy_elsewhere_is_a_conflict() {
        let mut registry = PackRegistry::new();
        registry.register(source("same", "/pool/b", b"x", 5));
        let conflict = registry.register(source("same", "/pool/a", b"x", 5)).unwrap();

        assert!(conflict.identical);
        // Equal mtimes: the smaller path wins
        assert_eq!(conflict.kept, PathBuf::from("/pool/a"));
        assert_eq!(conflict.discarded, PathBuf::from("/pool/b"));
        assert_eq!(registry.conflicts().len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_origin_twice_is_not_a_conflict() {
        let mut registry = PackRegistry::new();
        registry.register(source("same", "/pool/a", b"x", 5));
        assert!(registry.register(source("same", "/pool/a", b"x", 5)).is_none());
        assert!(registry.conflicts().is_empty());
    }

    #[test]
    fn test_all_is_restartable_and_sorted() {
        let mut registry = PackRegistry::new();
        registry.register(source("ccc", "/pool/c", b"c", 0));
        registry.register(source("aaa", "/pool/a", b"a", 0));

        let first: Vec<&str> = registry.all().map(|id| id.uuid.as_str()).collect();
        let second: Vec<&str> = registry.all().map(|id| id.uuid.as_str()).collect();
        assert_eq!(first, vec!["aaa", "ccc"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_missing_pool_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ServerLayout::from_root(dir.path());
        let report = PackRegistry::scan(&layout).unwrap();
        assert!(report.registry.is_empty());
        assert!(report.errors.is_empty());
    }
}
