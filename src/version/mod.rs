// src/version/mod.rs

//! Pack version triples
//!
//! Bedrock manifests and world pack-reference documents carry versions as
//! `[major, minor, patch]` arrays. Newer manifest formats also allow a
//! `"major.minor.patch"` string, which is parsed with `semver`.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A three-part pack version, ordered lexicographically by component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PackVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl PackVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a "x.y.z" string
    ///
    /// Pre-release and build metadata are accepted but dropped, since the
    /// reference documents have no place to store them.
    pub fn parse(s: &str) -> Result<Self> {
        let v = semver::Version::parse(s.trim())
            .map_err(|e| Error::InvalidVersion(format!("'{}': {}", s, e)))?;
        Ok(Self::new(v.major, v.minor, v.patch))
    }

    fn from_slice(parts: &[u64]) -> std::result::Result<Self, String> {
        match parts {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            other => Err(format!(
                "version array must have 3 components, got {}",
                other.len()
            )),
        }
    }
}

impl From<[u64; 3]> for PackVersion {
    fn from(parts: [u64; 3]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl FromStr for PackVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for PackVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.major)?;
        tuple.serialize_element(&self.minor)?;
        tuple.serialize_element(&self.patch)?;
        tuple.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Parts(Vec<u64>),
    Text(String),
}

impl<'de> Deserialize<'de> for PackVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawVersion::deserialize(deserializer)? {
            RawVersion::Parts(parts) => Self::from_slice(&parts).map_err(de::Error::custom),
            RawVersion::Text(text) => Self::parse(&text).map_err(de::Error::custom),
        }
    }
}
