// src/deploy/diff.rs

//! Three-way comparison of a plan against the installed state
//!
//! Every installed pack ends up in exactly one of `to_remove` or
//! `unchanged`, or is replaced through `to_install`. Every planned pack ends
//! up in exactly one of `to_install` or `unchanged`.

use super::state::{InstalledPackRecord, InstalledState};
use crate::config::ServerLayout;
use crate::filesystem::path::sanitize_filename;
use crate::pack::PackKey;
use crate::resolver::{InstallPlan, PlanEntry};
use crate::version::PackVersion;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Why an installed directory goes away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveReason {
    /// The plan does not contain this pack
    NotRequired,
    /// The pack is planned but lives under a different directory name
    Relocated,
}

impl fmt::Display for RemoveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoveReason::NotRequired => write!(f, "no longer required"),
            RemoveReason::Relocated => write!(f, "relocated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub record: InstalledPackRecord,
    pub reason: RemoveReason,
}

#[derive(Debug, Clone)]
pub struct Installation {
    pub entry: PlanEntry,
    /// Directory the pack is installed as
    pub target: PathBuf,
    /// Version being replaced in `target`, if any
    pub replaces: Option<PackVersion>,
}

impl Installation {
    pub fn description(&self) -> String {
        let identity = &self.entry.source.identity;
        match self.replaces {
            Some(old) if old != identity.version => format!(
                "Update {} ({} -> {})",
                self.entry.source.display_name(),
                old,
                identity.version
            ),
            Some(_) => format!("Reinstall {} {}", self.entry.source.display_name(), identity.version),
            None => format!("Install {} {}", self.entry.source.display_name(), identity.version),
        }
    }
}

/// Result of comparing a plan with the installed state
#[derive(Debug, Clone, Default)]
pub struct DeploymentDiff {
    pub to_remove: Vec<Removal>,
    pub to_install: Vec<Installation>,
    pub unchanged: Vec<PackKey>,
    /// Planned packs that cannot be installed: the uuid cannot name a
    /// directory, or the target is an unmanaged or protected directory
    pub invalid: Vec<(PackKey, String)>,
}

impl DeploymentDiff {
    /// Compare `plan` with `state` for the areas in `layout`
    pub fn compute(plan: &InstallPlan, state: &InstalledState, layout: &ServerLayout) -> Self {
        let mut diff = Self::default();
        let mut kept: HashSet<PathBuf> = HashSet::new();

        for entry in plan.entries() {
            let key = entry.key();
            let dir_name = match install_dir_name(&key) {
                Ok(name) => name,
                Err(reason) => {
                    diff.invalid.push((key, reason));
                    continue;
                }
            };
            let target = layout.install_dir(entry.capability).join(&dir_name);
            if let Some(reason) = state.blocked(&target) {
                diff.invalid.push((key, reason));
                continue;
            }
            let current = state.records_for(&key).find(|r| r.path == target);

            match current {
                Some(record)
                    if record.identity.version == entry.source.identity.version
                        && record.digest == entry.source.digest =>
                {
                    kept.insert(record.path.clone());
                    diff.unchanged.push(key);
                }
                Some(record) => {
                    kept.insert(record.path.clone());
                    diff.to_install.push(Installation {
                        entry: entry.clone(),
                        target,
                        replaces: Some(record.identity.version),
                    });
                }
                None => diff.to_install.push(Installation {
                    entry: entry.clone(),
                    target,
                    replaces: None,
                }),
            }
        }

        for record in &state.records {
            if kept.contains(&record.path) {
                continue;
            }
            let reason = if plan.contains(&record.key()) {
                RemoveReason::Relocated
            } else {
                RemoveReason::NotRequired
            };
            diff.to_remove.push(Removal {
                record: record.clone(),
                reason,
            });
        }

        diff
    }

    /// True when applying would change nothing in the install areas
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_install.is_empty()
    }

    /// Identity keys that would be installed
    pub fn install_keys(&self) -> HashSet<PackKey> {
        self.to_install.iter().map(|i| i.entry.key()).collect()
    }

    /// Identity keys that would be removed without replacement
    pub fn remove_keys(&self) -> HashSet<PackKey> {
        self.to_remove
            .iter()
            .filter(|r| r.reason == RemoveReason::NotRequired)
            .map(|r| r.record.key())
            .collect()
    }
}

/// Directory name for an installed pack: its uuid
pub fn install_dir_name(key: &PackKey) -> Result<String, String> {
    sanitize_filename(&key.uuid)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::PayloadHasher;
    use crate::deploy::UnmanagedDir;
    use crate::pack::{Capability, PackIdentity, PackOrigin, PackSource};
    use std::path::Path;
    use std::time::SystemTime;

    fn layout() -> ServerLayout {
        ServerLayout::from_root("/srv")
    }

    fn source(uuid: &str, version: [u64; 3], content: &[u8]) -> PackSource {
        let mut hasher = PayloadHasher::new();
        hasher.add("manifest.json", content);
        PackSource {
            identity: PackIdentity::new(uuid, Capability::Behavior, version.into()),
            name: None,
            origin: PackOrigin::Directory {
                dir: PathBuf::from(format!("/srv/mods/{}", uuid)),
            },
            files: vec!["manifest.json".to_string()],
            digest: hasher.finish(),
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    fn record(uuid: &str, dir: &str, version: [u64; 3], content: &[u8]) -> InstalledPackRecord {
        let src = source(uuid, version, content);
        InstalledPackRecord {
            identity: src.identity,
            path: Path::new("/srv/mcpe/behavior_packs").join(dir),
            digest: src.digest,
        }
    }

    fn plan(sources: Vec<PackSource>) -> InstallPlan {
        let mut plan = InstallPlan::new();
        for source in sources {
            plan.push(PlanEntry {
                capability: source.identity.capability,
                source,
                reference: None,
            });
        }
        plan
    }

    fn state(records: Vec<InstalledPackRecord>) -> InstalledState {
        InstalledState {
            records,
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_a_with_b() {
        let diff = DeploymentDiff::compute(
            &plan(vec![source("b", [1, 0, 0], b"b")]),
            &state(vec![record("a", "a", [1, 0, 0], b"a")]),
            &layout(),
        );
        assert_eq!(diff.remove_keys(), HashSet::from([PackKey::new("a", Capability::Behavior)]));
        assert_eq!(diff.install_keys(), HashSet::from([PackKey::new("b", Capability::Behavior)]));
        assert!(diff.unchanged.is_empty());
    }

    #[test]
    fn test_matching_install_is_unchanged() {
        let diff = DeploymentDiff::compute(
            &plan(vec![source("a", [1, 0, 0], b"a")]),
            &state(vec![record("a", "a", [1, 0, 0], b"a")]),
            &layout(),
        );
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged.len(), 1);
    }

    #[test]
    fn test_version_or_content_change_reinstalls() {
        for (version, content) in [([2, 0, 0], &b"a"[..]), ([1, 0, 0], &b"edited"[..])] {
            let diff = DeploymentDiff::compute(
                &plan(vec![source("a", version, content)]),
                &state(vec![record("a", "a", [1, 0, 0], b"a")]),
                &layout(),
            );
            assert!(diff.to_remove.is_empty());
            assert_eq!(diff.to_install.len(), 1);
            assert_eq!(diff.to_install[0].replaces, Some(PackVersion::new(1, 0, 0)));
        }
    }

    #[test]
    fn test_renamed_copy_is_removed() {
        let diff = DeploymentDiff::compute(
            &plan(vec![source("a", [1, 0, 0], b"a")]),
            &state(vec![
                record("a", "a", [1, 0, 0], b"a"),
                record("a", "My Pack", [1, 0, 0], b"a"),
            ]),
            &layout(),
        );
        assert_eq!(diff.to_remove.len(), 1);
        assert_eq!(diff.to_remove[0].reason, RemoveReason::Relocated);
        assert_eq!(diff.to_remove[0].record.dir_name(), "My Pack");
        assert!(diff.to_install.is_empty());
        assert!(diff.remove_keys().is_empty());
    }

    #[test]
    fn test_unusable_uuid_is_invalid() {
        let diff = DeploymentDiff::compute(
            &plan(vec![source("../escape", [1, 0, 0], b"x")]),
            &InstalledState::default(),
            &layout(),
        );
        assert!(diff.to_install.is_empty());
        assert_eq!(diff.invalid.len(), 1);
    }

    #[test]
    fn test_unmanaged_target_blocks_install() {
        let installed = InstalledState {
            unmanaged: vec![UnmanagedDir {
                path: PathBuf::from("/srv/mcpe/behavior_packs/a"),
                reason: "no manifest".to_string(),
            }],
            ..Default::default()
        };
        let diff = DeploymentDiff::compute(&plan(vec![source("a", [1, 0, 0], b"a")]), &installed, &layout());

        assert!(diff.to_install.is_empty());
        assert!(diff.to_remove.is_empty());
        assert_eq!(diff.invalid.len(), 1);
        assert!(diff.invalid[0].1.contains("unmanaged"));
    }
}
