// src/deploy/state.rs

//! What is currently deployed in the install areas

use crate::config::ServerLayout;
use crate::error::Result;
use crate::hash::{digest_dir, ContentDigest};
use crate::pack::{Capability, ManifestInfo, PackIdentity, PackKey, MANIFEST_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A pack directory found in an install area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackRecord {
    pub identity: PackIdentity,
    pub path: PathBuf,
    pub digest: ContentDigest,
}

impl InstalledPackRecord {
    pub fn key(&self) -> PackKey {
        self.identity.key()
    }

    pub fn dir_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// A directory the engine does not manage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmanagedDir {
    pub path: PathBuf,
    pub reason: String,
}

/// Snapshot of both install areas
#[derive(Debug, Clone, Default)]
pub struct InstalledState {
    pub records: Vec<InstalledPackRecord>,
    /// Directories without a usable manifest; never removed
    pub unmanaged: Vec<UnmanagedDir>,
    /// Directories matching a protected pattern; never touched
    pub protected: Vec<PathBuf>,
}

impl InstalledState {
    /// Read every pack directory in the behavior and resource install areas
    pub fn scan(layout: &ServerLayout) -> Result<Self> {
        let mut state = Self::default();
        for capability in Capability::ALL {
            state.scan_area(layout, capability)?;
        }
        debug!(
            "Installed state: {} packs, {} unmanaged, {} protected",
            state.records.len(),
            state.unmanaged.len(),
            state.protected.len()
        );
        Ok(state)
    }

    fn scan_area(&mut self, layout: &ServerLayout, capability: Capability) -> Result<()> {
        let area = layout.install_dir(capability);
        if !area.is_dir() {
            return Ok(());
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(area)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            // Staging directories of an interrupted run
            if name.starts_with('.') {
                continue;
            }
            if layout.is_protected(&name) {
                self.protected.push(dir);
                continue;
            }
            match read_record(&dir, capability) {
                Ok(record) => self.records.push(record),
                Err(reason) => {
                    debug!("Leaving unmanaged {}: {}", dir.display(), reason);
                    self.unmanaged.push(UnmanagedDir { path: dir, reason });
                }
            }
        }
        Ok(())
    }

    /// Why `path` must not be replaced, if it is an unmanaged or protected
    /// directory
    pub fn blocked(&self, path: &Path) -> Option<String> {
        if self.protected.iter().any(|p| p == path) {
            return Some(format!("{} is protected", path.display()));
        }
        self.unmanaged
            .iter()
            .find(|u| u.path == path)
            .map(|u| format!("{} is in use by an unmanaged directory ({})", path.display(), u.reason))
    }

    /// Records for one identity, in path order
    pub fn records_for<'a>(
        &'a self,
        key: &'a PackKey,
    ) -> impl Iterator<Item = &'a InstalledPackRecord> + 'a {
        self.records.iter().filter(move |r| &r.key() == key)
    }
}

fn read_record(dir: &Path, capability: Capability) -> std::result::Result<InstalledPackRecord, String> {
    let info = ManifestInfo::from_file(&dir.join(MANIFEST_FILE)).map_err(|e| e.to_string())?;
    if !info.capabilities.contains(&capability) {
        return Err(format!("manifest does not declare a {} module", capability));
    }
    let digest = digest_dir(dir).map_err(|e| e.to_string())?;
    Ok(InstalledPackRecord {
        identity: PackIdentity::new(info.uuid, capability, info.version),
        path: dir.to_path_buf(),
        digest,
    })
}
