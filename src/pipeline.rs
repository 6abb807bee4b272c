// src/pipeline.rs

//! The setup pipeline
//!
//! One run, start to finish:
//!
//! 1. Index the pack pool (discovery errors are collected, not raised)
//! 2. Read the chosen world's requirements, from the live directory or
//!    straight out of the candidate container
//! 3. Resolve them; a missing pack aborts here, before anything changes
//! 4. Snapshot the live world, importing the candidate if one was chosen
//! 5. Deploy the plan and rewrite the reference documents

use crate::backup::{BackupArchive, BackupManager};
use crate::config::ServerLayout;
use crate::deploy::{DeployReport, DeploymentDiff, DeploymentEngine, InstalledState};
use crate::error::{Error, Result};
use crate::pack::{IdentityConflict, PackRegistry};
use crate::progress::ProgressTracker;
use crate::resolver::{self, InstallPlan, VersionMismatch};
use crate::world::{WorldChoice, WorldSelector};
use std::path::PathBuf;
use tracing::{debug, info};

/// How a setup run should behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    pub choice: WorldChoice,
    /// Deploy every pool pack, not only the ones the world references
    pub all_packs: bool,
    /// Compute and report the deployment without changing anything
    pub dry_run: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            choice: WorldChoice::Existing,
            all_packs: false,
            dry_run: false,
        }
    }
}

/// Everything a setup run did or would do
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub level_name: String,
    /// Packs in the pool after conflict resolution
    pub available: usize,
    pub scan_errors: Vec<Error>,
    pub conflicts: Vec<IdentityConflict>,
    pub mismatches: Vec<VersionMismatch>,
    /// World container imported into the live directory
    pub imported: Option<PathBuf>,
    pub safety_backup: Option<BackupArchive>,
    pub diff: DeploymentDiff,
    /// Absent for dry runs
    pub deploy: Option<DeployReport>,
}

/// Runs the setup pipeline against one server layout
pub struct Pipeline<'a> {
    layout: &'a ServerLayout,
    progress: &'a dyn ProgressTracker,
}

impl<'a> Pipeline<'a> {
    pub fn new(layout: &'a ServerLayout, progress: &'a dyn ProgressTracker) -> Self {
        Self { layout, progress }
    }

    pub fn run(&self, options: SetupOptions) -> Result<PipelineReport> {
        let scan = PackRegistry::scan(self.layout)?;
        let registry = scan.registry;
        let mut report = PipelineReport {
            available: registry.len(),
            conflicts: registry.conflicts().to_vec(),
            scan_errors: scan.errors,
            ..Default::default()
        };

        let selector = WorldSelector::discover(self.layout)?;
        let requirements = selector.requirements(options.choice)?;
        report.level_name = selector.level_name(options.choice)?;

        let mut plan = InstallPlan::new();
        if !requirements.is_empty() {
            let resolved = resolver::resolve(&requirements, &registry, &report.level_name)?;
            report.mismatches = resolved.mismatches;
            plan = resolved.plan;
        }
        if options.all_packs || requirements.is_empty() {
            plan.extend_from_registry(&registry);
        }
        info!(
            "Planned {} packs for '{}' ({} declared)",
            plan.len(),
            report.level_name,
            requirements.len()
        );

        let engine = DeploymentEngine::new(self.layout);
        if options.dry_run {
            let installed = InstalledState::scan(self.layout)?;
            report.diff = engine.preview(&plan, &installed);
            log_diff(&report.diff);
            return Ok(report);
        }

        let backups = BackupManager::from_layout(self.layout);
        let activation = selector.activate(options.choice, &backups, self.progress)?;
        report.imported = activation.imported;
        report.safety_backup = match activation.safety_backup {
            Some(backup) => Some(backup),
            None if report.imported.is_none() => {
                Some(backups.create(&activation.world_dir, self.progress)?)
            }
            None => None,
        };

        let installed = InstalledState::scan(self.layout)?;
        report.diff = engine.preview(&plan, &installed);
        log_diff(&report.diff);
        report.deploy = Some(engine.apply(&plan, &installed, &activation.world_dir, self.progress)?);
        Ok(report)
    }
}

fn log_diff(diff: &DeploymentDiff) {
    let mut install: Vec<String> = diff.install_keys().iter().map(ToString::to_string).collect();
    let mut remove: Vec<String> = diff.remove_keys().iter().map(ToString::to_string).collect();
    install.sort();
    remove.sort();
    debug!(
        "Deployment diff: install [{}], remove [{}], {} unchanged",
        install.join(", "),
        remove.join(", "),
        diff.unchanged.len()
    );
}
