// src/config.rs

//! Server directory layout
//!
//! Every component takes a `ServerLayout` instead of reading global paths,
//! so each one can be pointed at a temporary tree in tests.
//!
//! The layout can be derived from a server root or loaded from a
//! `worldpack.toml` file:
//!
//! ```toml
//! pool_dir = "mods"
//! staging_dir = "world_backups"
//! live_world = "mcpe/worlds/Bedrock level"
//! backup_dir = "backups"
//! protected_packs = ["vanilla*", "chemistry*"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use crate::error::{Error, Result};
use crate::pack::Capability;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name looked up under the server root
pub const CONFIG_FILE_NAME: &str = "worldpack.toml";

/// Directory roles and naming conventions for one server installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerLayout {
    /// Pool of available pack archives (.mcpack / .mcaddon) and pack folders
    pub pool_dir: PathBuf,
    /// Candidate packaged worlds waiting to be imported
    pub staging_dir: PathBuf,
    /// The world directory the server process loads
    pub live_world: PathBuf,
    /// Where backup archives are written
    pub backup_dir: PathBuf,
    /// Install area for behavior packs
    pub behavior_packs_dir: PathBuf,
    /// Install area for resource packs
    pub resource_packs_dir: PathBuf,
    /// Extension for world archives and backups, without the dot
    pub world_extension: String,
    /// Extensions recognised as pack archives in the pool
    pub pack_extensions: Vec<String>,
    /// Glob patterns for install-area directories that are never removed
    pub protected_packs: Vec<String>,
}

impl Default for ServerLayout {
    fn default() -> Self {
        Self::from_root(".")
    }
}

impl ServerLayout {
    /// Standard layout relative to a server root
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mcpe = root.join("mcpe");
        Self {
            pool_dir: root.join("mods"),
            staging_dir: root.join("world_backups"),
            live_world: mcpe.join("worlds").join("Bedrock level"),
            backup_dir: root.join("backups"),
            behavior_packs_dir: mcpe.join("behavior_packs"),
            resource_packs_dir: mcpe.join("resource_packs"),
            world_extension: "mcworld".to_string(),
            pack_extensions: vec!["mcpack".to_string(), "mcaddon".to_string()],
            protected_packs: vec![
                "vanilla*".to_string(),
                "chemistry*".to_string(),
                "definitions".to_string(),
                "experimental*".to_string(),
            ],
        }
    }

    /// Load a layout from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base)
    }

    /// Parse TOML content, resolving relative paths against `base`
    ///
    /// Keys that are absent keep the value `from_root(base)` would give them.
    pub fn parse(content: &str, base: &Path) -> Result<Self> {
        let overrides: LayoutFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid layout: {}", e)))?;

        let mut layout = Self::from_root(base);
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };

        if let Some(p) = overrides.pool_dir {
            layout.pool_dir = resolve(p);
        }
        if let Some(p) = overrides.staging_dir {
            layout.staging_dir = resolve(p);
        }
        if let Some(p) = overrides.live_world {
            layout.live_world = resolve(p);
        }
        if let Some(p) = overrides.backup_dir {
            layout.backup_dir = resolve(p);
        }
        if let Some(p) = overrides.behavior_packs_dir {
            layout.behavior_packs_dir = resolve(p);
        }
        if let Some(p) = overrides.resource_packs_dir {
            layout.resource_packs_dir = resolve(p);
        }
        if let Some(ext) = overrides.world_extension {
            layout.world_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(exts) = overrides.pack_extensions {
            layout.pack_extensions = exts
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
        }
        if let Some(patterns) = overrides.protected_packs {
            layout.protected_packs = patterns;
        }

        layout.validate()?;
        Ok(layout)
    }

    /// Reject layouts whose roles overlap in ways that would destroy data
    pub fn validate(&self) -> Result<()> {
        if self.world_extension.is_empty() {
            return Err(Error::Config("world_extension must not be empty".to_string()));
        }
        if self.behavior_packs_dir == self.resource_packs_dir {
            return Err(Error::Config(
                "behavior and resource install areas must differ".to_string(),
            ));
        }
        for area in [&self.behavior_packs_dir, &self.resource_packs_dir] {
            if self.live_world.starts_with(area) || self.backup_dir.starts_with(area) {
                return Err(Error::Config(format!(
                    "install area {} must not contain the world or backups",
                    area.display()
                )));
            }
        }
        for pattern in &self.protected_packs {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::Config(format!("invalid protected pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    /// Install area for a capability
    pub fn install_dir(&self, capability: Capability) -> &Path {
        match capability {
            Capability::Behavior => &self.behavior_packs_dir,
            Capability::Resource => &self.resource_packs_dir,
        }
    }

    /// Whether a file name carries one of the pack archive extensions
    pub fn is_pack_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.pack_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Whether a file name carries the world archive extension
    pub fn is_world_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.world_extension))
    }

    /// Whether an install-area directory name is protected from cleanup
    pub fn is_protected(&self, dir_name: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        self.protected_packs.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches_with(dir_name, options))
                .unwrap_or(false)
        })
    }
}

/// On-disk form: every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutFile {
    pool_dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    live_world: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    behavior_packs_dir: Option<PathBuf>,
    resource_packs_dir: Option<PathBuf>,
    world_extension: Option<String>,
    pack_extensions: Option<Vec<String>>,
    protected_packs: Option<Vec<String>>,
}
