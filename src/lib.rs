// src/lib.rs

//! worldpack
//!
//! Deploys third-party add-on packs into a Bedrock dedicated server world
//! and keeps dated, collision-free backups of that world.
//!
//! # Architecture
//!
//! - Identity, not filenames: packs are matched by manifest uuid and
//!   capability (behavior or resource)
//! - Resolve before mutating: a world that needs a pack the pool lacks is
//!   rejected before anything on disk changes
//! - Set-based deployment: installed packs are reconciled against the plan
//!   as a three-way diff, so re-running converges on the same state
//! - All-or-nothing archives: backups are written to a temp file and renamed

pub mod archive;
pub mod backup;
pub mod config;
pub mod deploy;
mod error;
pub mod filesystem;
pub mod hash;
pub mod lock;
pub mod pack;
pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod version;
pub mod world;

pub use backup::{BackupArchive, BackupEntry, BackupManager, BackupName};
pub use config::{ServerLayout, CONFIG_FILE_NAME};
pub use deploy::{
    DeployReport, DeploymentDiff, DeploymentEngine, InstalledPackRecord, InstalledState,
};
pub use error::{Error, Result};
pub use hash::ContentDigest;
pub use lock::RunLock;
pub use pack::{
    Capability, IdentityConflict, ManifestInfo, PackIdentity, PackKey, PackRegistry, PackSource,
    ScanReport,
};
pub use pipeline::{Pipeline, PipelineReport, SetupOptions};
pub use progress::{LogProgress, ProgressTracker, SilentProgress};
pub use resolver::{resolve, InstallPlan, PlanEntry, ResolveReport, VersionMismatch};
pub use version::PackVersion;
pub use world::{WorldCandidate, WorldChoice, WorldRequirement, WorldSelector};
