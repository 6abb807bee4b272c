// src/world/requirements.rs

//! World pack-reference documents
//!
//! A world lists the packs it needs in `world_behavior_packs.json` and
//! `world_resource_packs.json`, each an ordered JSON array of
//! `{"pack_id": "...", "version": [x, y, z]}` objects. Fields other than
//! those two (for example `subpacks`) are carried through untouched.

use super::read_world_files;
use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use crate::pack::{normalize_uuid, Capability, PackKey};
use crate::version::PackVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One entry of a pack-reference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackReference {
    pub pack_id: String,
    pub version: PackVersion,
    /// Any other fields present in the document
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackReference {
    pub fn new(pack_id: impl Into<String>, version: PackVersion) -> Self {
        Self {
            pack_id: pack_id.into(),
            version,
            extra: Map::new(),
        }
    }
}

/// The packs a world declares, per capability, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldRequirement {
    pub behavior: Vec<PackReference>,
    pub resource: Vec<PackReference>,
}

impl WorldRequirement {
    /// Read both documents from a world directory; absent files are empty
    pub fn read_dir(world_dir: &Path) -> Result<Self> {
        let mut requirement = Self::default();
        for capability in Capability::ALL {
            let path = world_dir.join(capability.reference_file());
            *requirement.entries_mut(capability) = read_references(&path)?;
        }
        Ok(requirement)
    }

    /// Read both documents out of a packaged world without extracting it
    pub fn read_archive(world_archive: &Path) -> Result<Self> {
        let mut requirement = Self::default();
        let wanted: Vec<&str> = Capability::ALL.iter().map(|c| c.reference_file()).collect();
        let docs = read_world_files(world_archive, &wanted)?;

        for capability in Capability::ALL {
            if let Some(content) = docs.get(capability.reference_file()) {
                let path = world_archive.join(capability.reference_file());
                *requirement.entries_mut(capability) = parse_references(content, &path)?;
            }
        }
        Ok(requirement)
    }

    pub fn entries(&self, capability: Capability) -> &[PackReference] {
        match capability {
            Capability::Behavior => &self.behavior,
            Capability::Resource => &self.resource,
        }
    }

    fn entries_mut(&mut self, capability: Capability) -> &mut Vec<PackReference> {
        match capability {
            Capability::Behavior => &mut self.behavior,
            Capability::Resource => &mut self.resource,
        }
    }

    /// Every requirement, behavior first, each list in document order
    pub fn iter(&self) -> impl Iterator<Item = (Capability, &PackReference)> + '_ {
        Capability::ALL
            .into_iter()
            .flat_map(move |cap| self.entries(cap).iter().map(move |r| (cap, r)))
    }

    /// Identity keys of every requirement
    pub fn keys(&self) -> HashSet<PackKey> {
        self.iter()
            .map(|(cap, r)| PackKey::new(r.pack_id.clone(), cap))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.behavior.len() + self.resource.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behavior.is_empty() && self.resource.is_empty()
    }
}

/// Read one document; a missing file is an empty list
pub fn read_references(path: &Path) -> Result<Vec<PackReference>> {
    if !path.exists() {
        debug!("{} not present, treating as empty", path.display());
        return Ok(Vec::new());
    }
    let content = std::fs::read(path)?;
    parse_references(&content, path)
}

/// Parse a document, dropping entries without a pack_id and duplicates
pub fn parse_references(content: &[u8], path: &Path) -> Result<Vec<PackReference>> {
    let malformed = |reason: String| Error::ReferenceMalformed {
        path: path.to_path_buf(),
        reason,
    };

    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let raw: Vec<Map<String, Value>> =
        serde_json::from_slice(content).map_err(|e| malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut references = Vec::with_capacity(raw.len());
    for mut entry in raw {
        let pack_id = match entry.remove("pack_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => normalize_uuid(&id),
            _ => continue,
        };
        let version = match entry.remove("version") {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| malformed(format!("pack {}: {}", pack_id, e)))?,
            None => PackVersion::default(),
        };
        if !seen.insert(pack_id.clone()) {
            debug!("Dropping duplicate reference to {} in {}", pack_id, path.display());
            continue;
        }
        references.push(PackReference {
            pack_id,
            version,
            extra: entry,
        });
    }
    Ok(references)
}

/// Write a document atomically
pub fn write_references(path: &Path, references: &[PackReference]) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(references)?;
    json.push(b'\n');
    write_atomic(path, &json)
}
