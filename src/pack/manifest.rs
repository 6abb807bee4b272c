// src/pack/manifest.rs

//! Pack manifest (manifest.json) parsing
//!
//! Only the fields needed for identity are interpreted: `header.uuid`,
//! `header.version`, `header.name` and the `modules[].type` list that
//! decides the capability. Everything else in the manifest is ignored.

use super::{normalize_uuid, Capability};
use crate::error::{Error, Result};
use crate::version::PackVersion;
use serde::Deserialize;
use std::path::Path;

/// File name of the manifest at the root of every pack
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Deserialize)]
struct RawManifest {
    header: Option<RawHeader>,
    #[serde(default)]
    modules: Vec<RawModule>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    uuid: Option<String>,
    name: Option<String>,
    version: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    #[serde(rename = "type")]
    module_type: Option<String>,
}

/// Identity information extracted from one manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub uuid: String,
    pub name: Option<String>,
    pub version: PackVersion,
    /// Declared capabilities, behavior first, without duplicates
    pub capabilities: Vec<Capability>,
}

impl ManifestInfo {
    /// Parse manifest bytes; `source` is only used in error messages
    pub fn parse(content: &[u8], source: &Path) -> Result<Self> {
        let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
        let raw: RawManifest = serde_json::from_slice(content)
            .map_err(|e| Error::malformed(source, format!("invalid JSON: {}", e)))?;

        let header = raw
            .header
            .ok_or_else(|| Error::malformed(source, "missing header"))?;

        let uuid = header
            .uuid
            .map(|u| normalize_uuid(&u))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::malformed(source, "missing header.uuid"))?;

        let version_value = header
            .version
            .ok_or_else(|| Error::malformed(source, "missing header.version"))?;
        let version: PackVersion = serde_json::from_value(version_value)
            .map_err(|e| Error::malformed(source, format!("bad header.version: {}", e)))?;

        let mut capabilities: Vec<Capability> = raw
            .modules
            .iter()
            .filter_map(|m| m.module_type.as_deref())
            .filter_map(Capability::from_module_type)
            .collect();
        capabilities.sort();
        capabilities.dedup();
        if capabilities.is_empty() {
            return Err(Error::malformed(
                source,
                "no behavior or resource module declared",
            ));
        }

        Ok(Self {
            uuid,
            name: header.name.filter(|n| !n.trim().is_empty()),
            version,
            capabilities,
        })
    }

    /// Read and parse a manifest file on disk
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ManifestMissing(path.to_path_buf()));
        }
        let content = std::fs::read(path)?;
        Self::parse(&content, path)
    }
}
