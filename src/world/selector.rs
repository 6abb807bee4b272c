// src/world/selector.rs

//! Choosing the world a pipeline run targets
//!
//! The choice is closed: keep the world already in the live directory, or
//! import one of the packaged worlds in the staging directory. Candidates
//! are listed newest-name-first, matching the order operators see in the
//! prompt.

use super::{
    level_name_from_archive, read_level_name, replace_live_world, WorldRequirement,
    DEFAULT_LEVEL_NAME,
};
use crate::backup::{BackupArchive, BackupManager};
use crate::config::ServerLayout;
use crate::error::{Error, Result};
use crate::filesystem::is_missing_or_empty;
use crate::progress::ProgressTracker;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// A packaged world waiting in the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldCandidate {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    /// Display name from the packaged `levelname.txt`, when readable
    pub level_name: Option<String>,
}

impl WorldCandidate {
    pub fn display_name(&self) -> &str {
        self.level_name.as_deref().unwrap_or(&self.file_name)
    }
}

/// Which world the run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldChoice {
    /// Keep the live world as it is
    Existing,
    /// Import the candidate at this zero-based index
    Candidate(usize),
}

impl WorldChoice {
    /// Map an operator's menu number: 0 keeps the existing world, N picks candidate N
    pub fn from_menu(number: usize) -> Self {
        match number {
            0 => Self::Existing,
            n => Self::Candidate(n - 1),
        }
    }
}

/// Outcome of activating a choice
#[derive(Debug)]
pub struct Activation {
    /// The live world directory, now holding the chosen world
    pub world_dir: PathBuf,
    pub level_name: String,
    /// Container imported into the live directory, if any
    pub imported: Option<PathBuf>,
    pub safety_backup: Option<BackupArchive>,
}

/// Lists candidates and applies a choice
#[derive(Debug)]
pub struct WorldSelector<'a> {
    layout: &'a ServerLayout,
    candidates: Vec<WorldCandidate>,
}

impl<'a> WorldSelector<'a> {
    /// Scan the staging directory for packaged worlds
    pub fn discover(layout: &'a ServerLayout) -> Result<Self> {
        let mut candidates = Vec::new();
        if layout.staging_dir.is_dir() {
            for entry in fs::read_dir(&layout.staging_dir)? {
                let entry = entry?;
                let path = entry.path();
                if !entry.file_type()?.is_file() || !layout.is_world_archive(&path) {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().into_owned();
                candidates.push(WorldCandidate {
                    level_name: level_name_from_archive(&path),
                    size: entry.metadata()?.len(),
                    file_name,
                    path,
                });
            }
        } else {
            debug!("Staging directory {} not present", layout.staging_dir.display());
        }
        candidates.sort_by(|a, b| b.file_name.cmp(&a.file_name));

        Ok(Self { layout, candidates })
    }

    pub fn candidates(&self) -> &[WorldCandidate] {
        &self.candidates
    }

    /// Whether the live directory currently holds a world
    pub fn has_live_world(&self) -> Result<bool> {
        Ok(!is_missing_or_empty(&self.layout.live_world)?)
    }

    /// The candidate a choice refers to; `None` for the existing world
    pub fn candidate(&self, choice: WorldChoice) -> Result<Option<&WorldCandidate>> {
        match choice {
            WorldChoice::Existing => Ok(None),
            WorldChoice::Candidate(index) => self.candidates.get(index).map(Some).ok_or_else(|| {
                Error::InvalidSelection(format!(
                    "world {} does not exist ({} candidates staged)",
                    index + 1,
                    self.candidates.len()
                ))
            }),
        }
    }

    /// Validate a choice without changing anything
    ///
    /// Returns the chosen world's pack requirements, read from the live
    /// directory or straight out of the candidate container.
    pub fn requirements(&self, choice: WorldChoice) -> Result<WorldRequirement> {
        match self.candidate(choice)? {
            Some(candidate) => WorldRequirement::read_archive(&candidate.path),
            None => {
                self.ensure_live_world()?;
                WorldRequirement::read_dir(&self.layout.live_world)
            }
        }
    }

    /// Display name of the world a choice targets
    pub fn level_name(&self, choice: WorldChoice) -> Result<String> {
        Ok(match self.candidate(choice)? {
            Some(candidate) => candidate
                .level_name
                .clone()
                .unwrap_or_else(|| DEFAULT_LEVEL_NAME.to_string()),
            None => read_level_name(&self.layout.live_world),
        })
    }

    /// Make the chosen world live
    ///
    /// Keeping the existing world only checks that one is there. Importing a
    /// candidate snapshots the previous live world first.
    pub fn activate(
        &self,
        choice: WorldChoice,
        backups: &BackupManager,
        progress: &dyn ProgressTracker,
    ) -> Result<Activation> {
        let live = &self.layout.live_world;
        let Some(candidate) = self.candidate(choice)? else {
            self.ensure_live_world()?;
            info!("Using existing world at {}", live.display());
            return Ok(Activation {
                world_dir: live.clone(),
                level_name: read_level_name(live),
                imported: None,
                safety_backup: None,
            });
        };

        info!("Importing world {}", candidate.file_name);
        let swap = replace_live_world(&candidate.path, live, backups, progress)?;
        Ok(Activation {
            world_dir: live.clone(),
            level_name: read_level_name(live),
            imported: Some(candidate.path.clone()),
            safety_backup: swap.safety_backup,
        })
    }

    fn ensure_live_world(&self) -> Result<()> {
        if self.has_live_world()? {
            Ok(())
        } else {
            Err(Error::WorldNotFound(self.layout.live_world.clone()))
        }
    }
}
