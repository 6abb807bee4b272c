// src/pack/mod.rs

//! Add-on packs: identity, manifest reading and the pool registry
//!
//! A pack is identified by its manifest UUID together with its capability.
//! A single archive may carry several packs (an `.mcaddon` with a behavior
//! and a resource folder), and a single manifest may declare both
//! capabilities; either way each capability becomes its own `PackSource`
//! and nothing downstream needs to know they were bundled.

pub mod manifest;
mod registry;
mod source;

pub use manifest::{ManifestInfo, MANIFEST_FILE};
pub use registry::{IdentityConflict, PackRegistry, ScanReport};
pub use source::{PackOrigin, PackSource};

use crate::version::PackVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of pack a world can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Server-side logic: entities, loot tables, scripts
    Behavior,
    /// Client-visible assets: textures, models, sounds
    Resource,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::Behavior, Capability::Resource];

    /// Name of the world document listing packs of this capability
    pub const fn reference_file(&self) -> &'static str {
        match self {
            Capability::Behavior => "world_behavior_packs.json",
            Capability::Resource => "world_resource_packs.json",
        }
    }

    /// Map a manifest module type to a capability
    ///
    /// Module types that carry neither (skin packs, world templates) map to
    /// `None`.
    pub fn from_module_type(module_type: &str) -> Option<Self> {
        match module_type {
            "data" | "javascript" | "script" => Some(Capability::Behavior),
            "resources" | "client_data" => Some(Capability::Resource),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Behavior => write!(f, "behavior"),
            Capability::Resource => write!(f, "resource"),
        }
    }
}

/// Identity key: two packs are the same pack iff uuid and capability match
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackKey {
    pub uuid: String,
    pub capability: Capability,
}

impl PackKey {
    pub fn new(uuid: impl Into<String>, capability: Capability) -> Self {
        Self {
            uuid: normalize_uuid(&uuid.into()),
            capability,
        }
    }
}

impl fmt::Display for PackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.uuid, self.capability)
    }
}

/// Full identity of a pack as declared by its manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackIdentity {
    pub uuid: String,
    pub capability: Capability,
    pub version: PackVersion,
}

impl PackIdentity {
    pub fn new(uuid: impl Into<String>, capability: Capability, version: PackVersion) -> Self {
        Self {
            uuid: normalize_uuid(&uuid.into()),
            capability,
            version,
        }
    }

    pub fn key(&self) -> PackKey {
        PackKey {
            uuid: self.uuid.clone(),
            capability: self.capability,
        }
    }
}

impl fmt::Display for PackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} v{}", self.capability, self.uuid, self.version)
    }
}

/// UUIDs are compared case-insensitively and without surrounding whitespace
pub fn normalize_uuid(uuid: &str) -> String {
    uuid.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_type_mapping() {
        assert_eq!(Capability::from_module_type("data"), Some(Capability::Behavior));
        assert_eq!(Capability::from_module_type("script"), Some(Capability::Behavior));
        assert_eq!(Capability::from_module_type("resources"), Some(Capability::Resource));
        assert_eq!(Capability::from_module_type("skin_pack"), None);
    }

    #[test]
    fn test_key_ignores_version_and_case() {
        let a = PackIdentity::new("ABC-1", Capability::Behavior, PackVersion::new(1, 0, 0));
        let b = PackIdentity::new("abc-1 ", Capability::Behavior, PackVersion::new(2, 0, 0));
        let c = PackIdentity::new("abc-1", Capability::Resource, PackVersion::new(1, 0, 0));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_reference_files() {
        assert_eq!(
            Capability::Behavior.reference_file(),
            "world_behavior_packs.json"
        );
        assert_eq!(Capability::Resource.to_string(), "resource");
    }
}
