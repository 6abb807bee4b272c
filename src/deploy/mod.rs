// src/deploy/mod.rs

//! Deployment engine
//!
//! Makes the install areas match an install plan and rewrites the world's
//! two pack-reference documents to list exactly the planned packs.
//!
//! # Order of operations
//!
//! 1. Remove installed packs the plan no longer wants (and stray copies of
//!    planned packs under other directory names)
//! 2. Install new or changed packs, one directory per pack named by uuid,
//!    each staged in a temporary directory and swapped into place
//! 3. Rewrite `world_behavior_packs.json` and `world_resource_packs.json`
//!
//! A pack that fails to install is reported and skipped; packs installed
//! before it stay installed. Running the same plan again converges on the
//! same end state.

mod diff;
mod state;

pub use diff::{install_dir_name, DeploymentDiff, Installation, Removal, RemoveReason};
pub use state::{InstalledPackRecord, InstalledState, UnmanagedDir};

use crate::config::ServerLayout;
use crate::error::{Error, Result};
use crate::filesystem::swap_dir;
use crate::pack::{Capability, PackIdentity, PackKey};
use crate::progress::ProgressTracker;
use crate::resolver::{InstallPlan, PlanEntry};
use crate::world::requirements::{write_references, PackReference};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A pack the engine could not install or remove
#[derive(Debug)]
pub struct DeployFailure {
    pub key: PackKey,
    pub error: Error,
}

/// What a deployment did
#[derive(Debug, Default)]
pub struct DeployReport {
    pub removed: Vec<InstalledPackRecord>,
    pub installed: Vec<PackIdentity>,
    pub unchanged: Vec<PackKey>,
    pub failed: Vec<DeployFailure>,
    /// Reference documents written
    pub references: Vec<PathBuf>,
}

impl DeployReport {
    /// Uuids of every pack that failed
    pub fn failed_uuids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.key.uuid.as_str()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Synchronises install areas and reference documents
pub struct DeploymentEngine<'a> {
    layout: &'a ServerLayout,
}

impl<'a> DeploymentEngine<'a> {
    pub fn new(layout: &'a ServerLayout) -> Self {
        Self { layout }
    }

    /// Compute what `apply` would do without touching the disk
    pub fn preview(&self, plan: &InstallPlan, installed: &InstalledState) -> DeploymentDiff {
        DeploymentDiff::compute(plan, installed, self.layout)
    }

    /// Apply `plan` to the install areas and `world_dir`'s reference documents
    ///
    /// Only fails outright when a reference document cannot be written;
    /// per-pack problems end up in `DeployReport::failed`.
    pub fn apply(
        &self,
        plan: &InstallPlan,
        installed: &InstalledState,
        world_dir: &Path,
        progress: &dyn ProgressTracker,
    ) -> Result<DeployReport> {
        let diff = self.preview(plan, installed);
        let mut report = DeployReport {
            unchanged: diff.unchanged.clone(),
            ..Default::default()
        };

        progress.set_length((diff.to_remove.len() + diff.to_install.len()) as u64);

        for removal in &diff.to_remove {
            let record = &removal.record;
            progress.set_message(&format!("Removing {}", record.identity));
            match fs::remove_dir_all(&record.path) {
                Ok(()) => {
                    info!(
                        "Removed {} from {} ({})",
                        record.identity,
                        record.path.display(),
                        removal.reason
                    );
                    report.removed.push(record.clone());
                }
                Err(e) => {
                    warn!("Could not remove {}: {}", record.path.display(), e);
                    report.failed.push(DeployFailure {
                        key: record.key(),
                        error: e.into(),
                    });
                }
            }
            progress.increment(1);
        }

        for (key, reason) in &diff.invalid {
            warn!("Cannot install {}: {}", key, reason);
            report.failed.push(DeployFailure {
                key: key.clone(),
                error: Error::PackInstallFailed {
                    uuid: key.uuid.clone(),
                    reason: reason.clone(),
                },
            });
        }

        for installation in &diff.to_install {
            let identity = &installation.entry.source.identity;
            progress.set_message(&installation.description());
            match install_one(installation) {
                Ok(files) => {
                    info!(
                        "{} into {} ({} files)",
                        installation.description(),
                        installation.target.display(),
                        files
                    );
                    report.installed.push(identity.clone());
                }
                Err(e) => {
                    warn!("Failed to install {}: {}", identity, e);
                    report.failed.push(DeployFailure {
                        key: installation.entry.key(),
                        error: Error::PackInstallFailed {
                            uuid: identity.uuid.clone(),
                            reason: e.to_string(),
                        },
                    });
                }
            }
            progress.increment(1);
        }

        for capability in Capability::ALL {
            let path = world_dir.join(capability.reference_file());
            let references: Vec<PackReference> = plan
                .for_capability(capability)
                .map(PlanEntry::to_reference)
                .collect();
            write_references(&path, &references)?;
            debug!("Wrote {} references to {}", references.len(), path.display());
            report.references.push(path);
        }

        if report.is_success() {
            progress.finish_with_message(&format!(
                "{} installed, {} removed, {} unchanged",
                report.installed.len(),
                report.removed.len(),
                report.unchanged.len()
            ));
        } else {
            progress.finish_with_error(&format!("{} packs failed", report.failed.len()));
        }
        Ok(report)
    }
}

/// Stage one pack next to its target and swap it in
fn install_one(installation: &Installation) -> Result<u64> {
    let area = installation
        .target
        .parent()
        .ok_or_else(|| Error::InvalidPath(installation.target.display().to_string()))?;
    fs::create_dir_all(area)?;

    let staging = tempfile::Builder::new()
        .prefix(".worldpack-")
        .tempdir_in(area)?;
    let files = installation.entry.source.install_into(staging.path())?;
    swap_dir(staging.path(), &installation.target)?;
    Ok(files)
}
