// src/pack/source.rs

//! Pack sources: where an installable pack's files come from
//!
//! A pool entry (archive or folder) is split into pack roots, one per
//! `manifest.json`. Each file belongs to the deepest root that contains it,
//! so an `.mcaddon` holding `BP/` and `RP/` yields two payloads that do not
//! overlap.

use super::manifest::{ManifestInfo, MANIFEST_FILE};
use super::{PackIdentity, PackKey};
use crate::archive;
use crate::error::{Error, Result};
use crate::filesystem::path::safe_join;
use crate::hash::{to_slash_path, ContentDigest, PayloadHasher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Where a pack's payload lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOrigin {
    /// Inside a compressed container, under `root` ("" for the container root)
    Archive { archive: PathBuf, root: String },
    /// An extracted pack folder on disk
    Directory { dir: PathBuf },
}

/// An installable pack found in the pool
#[derive(Debug, Clone)]
pub struct PackSource {
    pub identity: PackIdentity,
    /// Display name from the manifest header
    pub name: Option<String>,
    pub origin: PackOrigin,
    /// Payload files relative to the pack root, sorted
    pub files: Vec<String>,
    pub digest: ContentDigest,
    /// Modification time of the pool entry, used for conflict tie-breaks
    pub modified: SystemTime,
}

impl PackSource {
    pub fn key(&self) -> PackKey {
        self.identity.key()
    }

    /// The pool entry this source was read from
    pub fn source_path(&self) -> &Path {
        match &self.origin {
            PackOrigin::Archive { archive, .. } => archive,
            PackOrigin::Directory { dir } => dir,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identity.uuid)
    }

    /// Write the payload into `dest`, which must not exist yet
    pub fn install_into(&self, dest: &Path) -> Result<u64> {
        fs::create_dir_all(dest)?;
        let mut written = 0;

        match &self.origin {
            PackOrigin::Archive { archive: path, root } => {
                let wanted: std::collections::HashSet<&str> =
                    self.files.iter().map(String::as_str).collect();
                let entries = archive::read_entries_matching(path, |p| {
                    strip_root(p, root).is_some_and(|rel| wanted.contains(rel))
                })?;
                for entry in entries {
                    let Some(relative) = strip_root(&entry.path, root) else {
                        continue;
                    };
                    let target = safe_join(dest, relative)?;
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&target, &entry.content)?;
                    written += 1;
                }
            }
            PackOrigin::Directory { dir } => {
                for relative in &self.files {
                    let target = safe_join(dest, relative)?;
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(dir.join(relative), &target)?;
                    written += 1;
                }
            }
        }

        if written != self.files.len() as u64 {
            return Err(Error::PackInstallFailed {
                uuid: self.identity.uuid.clone(),
                reason: format!(
                    "expected {} payload files, wrote {}",
                    self.files.len(),
                    written
                ),
            });
        }
        Ok(written)
    }
}

/// Sources and per-root failures read from one pool entry
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub sources: Vec<PackSource>,
    /// Pack roots inside the entry whose manifest could not be used
    pub errors: Vec<Error>,
}

/// Read every pack in an archive
pub fn read_archive(path: &Path) -> Result<SourceBatch> {
    let entries = archive::read_entries(path)?;
    let files = entries
        .into_iter()
        .map(|entry| (entry.path, entry.content))
        .collect();
    let modified = modified_time(path);

    split_roots(path, files, modified, |root| PackOrigin::Archive {
        archive: path.to_path_buf(),
        root: root.to_string(),
    })
}

/// Read every pack in an extracted folder
pub fn read_directory(dir: &Path) -> Result<SourceBatch> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = to_slash_path(entry.path().strip_prefix(dir).unwrap_or(entry.path()));
        files.insert(relative, fs::read(entry.path())?);
    }
    let modified = modified_time(dir);

    split_roots(dir, files, modified, |root| PackOrigin::Directory {
        dir: if root.is_empty() {
            dir.to_path_buf()
        } else {
            dir.join(root.trim_end_matches('/'))
        },
    })
}

/// Group files under their pack roots and parse each root's manifest
fn split_roots<F>(
    source: &Path,
    files: BTreeMap<String, Vec<u8>>,
    modified: SystemTime,
    origin_for: F,
) -> Result<SourceBatch>
where
    F: Fn(&str) -> PackOrigin,
{
    // Roots are stored with a trailing '/', the container root as ""
    let mut roots: Vec<String> = files
        .keys()
        .filter_map(|p| {
            if p == MANIFEST_FILE {
                Some(String::new())
            } else {
                p.strip_suffix(MANIFEST_FILE)
                    .filter(|prefix| prefix.ends_with('/'))
                    .map(str::to_string)
            }
        })
        .collect();
    if roots.is_empty() {
        return Err(Error::ManifestMissing(source.to_path_buf()));
    }
    // Deepest first so each file lands in its innermost root
    roots.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut payloads: BTreeMap<&str, Vec<(&str, &[u8])>> = BTreeMap::new();
    for (path, content) in &files {
        if let Some(root) = roots.iter().find(|r| path.starts_with(r.as_str())) {
            let relative = &path[root.len()..];
            payloads
                .entry(root.as_str())
                .or_default()
                .push((relative, content.as_slice()));
        }
    }

    let mut batch = SourceBatch::default();
    for root in &roots {
        let manifest_path = format!("{}{}", root, MANIFEST_FILE);
        let error_path = source.join(&manifest_path);
        let info = match files
            .get(&manifest_path)
            .map(|content| ManifestInfo::parse(content, &error_path))
        {
            Some(Ok(info)) => info,
            Some(Err(e)) => {
                batch.errors.push(e);
                continue;
            }
            None => {
                batch.errors.push(Error::ManifestMissing(error_path));
                continue;
            }
        };

        let payload = payloads.remove(root.as_str()).unwrap_or_default();
        let mut hasher = PayloadHasher::new();
        for (relative, content) in &payload {
            hasher.add(relative, content);
        }
        let digest = hasher.finish();
        let file_list: Vec<String> = payload.iter().map(|(rel, _)| rel.to_string()).collect();

        for capability in &info.capabilities {
            batch.sources.push(PackSource {
                identity: PackIdentity::new(info.uuid.clone(), *capability, info.version),
                name: info.name.clone(),
                origin: origin_for(root),
                files: file_list.clone(),
                digest: digest.clone(),
                modified,
            });
        }
    }

    Ok(batch)
}

fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    path.strip_prefix(root).filter(|rel| !rel.is_empty())
}

fn modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::Capability;
    use crate::progress::SilentProgress;

    fn manifest(uuid: &str, modules: &[&str]) -> String {
        let modules: Vec<String> = modules
            .iter()
            .map(|m| format!(r#"{{"type": "{}"}}"#, m))
            .collect();
        format!(
            r#"{{"header": {{"uuid": "{}", "name": "{}", "version": [1, 0, 0]}}, "modules": [{}]}}"#,
            uuid,
            uuid,
            modules.join(",")
        )
    }

    #[test]
    fn test_addon_archive_splits_roots() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("addon");
        fs::create_dir_all(tree.join("BP/entities")).unwrap();
        fs::create_dir_all(tree.join("RP/textures")).unwrap();
        fs::write(tree.join("BP/manifest.json"), manifest("bp-uuid", &["data"])).unwrap();
        fs::write(tree.join("BP/entities/cow.json"), b"{}").unwrap();
        fs::write(tree.join("RP/manifest.json"), manifest("rp-uuid", &["resources"])).unwrap();
        fs::write(tree.join("RP/textures/cow.png"), b"png").unwrap();

        let archive_path = dir.path().join("Cows.mcaddon");
        archive::write_dir(&tree, &archive_path, &SilentProgress::new()).unwrap();

        let batch = read_archive(&archive_path).unwrap();
        assert!(batch.errors.is_empty());
        assert_eq!(batch.sources.len(), 2);

        let bp = batch
            .sources
            .iter()
            .find(|s| s.identity.capability == Capability::Behavior)
            .unwrap();
        assert_eq!(bp.identity.uuid, "bp-uuid");
        assert_eq!(bp.files, vec!["entities/cow.json", "manifest.json"]);

        let out = dir.path().join("installed");
        assert_eq!(bp.install_into(&out).unwrap(), 2);
        assert!(out.join("entities/cow.json").exists());
        assert!(!out.join("textures").exists());
    }

    #[test]
    fn test_combined_manifest_yields_two_sources() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("combo");
        fs::create_dir_all(&pack).unwrap();
        fs::write(pack.join("manifest.json"), manifest("combo", &["data", "resources"])).unwrap();

        let batch = read_directory(&pack).unwrap();
        let caps: Vec<Capability> = batch.sources.iter().map(|s| s.identity.capability).collect();
        assert_eq!(caps, vec![Capability::Behavior, Capability::Resource]);
        assert_eq!(batch.sources[0].digest, batch.sources[1].digest);
        assert_eq!(batch.sources[0].origin, PackOrigin::Directory { dir: pack.clone() });
    }

    #[test]
    fn test_no_manifest_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        assert!(matches!(
            read_directory(dir.path()),
            Err(Error::ManifestMissing(_))
        ));
    }

    #[test]
    fn test_bad_root_reported_good_root_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("good")).unwrap();
        fs::create_dir_all(dir.path().join("bad")).unwrap();
        fs::write(dir.path().join("good/manifest.json"), manifest("g", &["data"])).unwrap();
        fs::write(dir.path().join("bad/manifest.json"), b"{").unwrap();

        let batch = read_directory(dir.path()).unwrap();
        assert_eq!(batch.sources.len(), 1);
        assert_eq!(batch.errors.len(), 1);
        assert!(matches!(batch.errors[0], Error::ManifestMalformed { .. }));
    }
}
