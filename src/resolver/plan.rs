// src/resolver/plan.rs

//! Resolution results
//!
//! Contains the installation plan and the warnings collected while
//! building it.

use crate::pack::{Capability, PackKey, PackRegistry, PackSource};
use crate::version::PackVersion;
use crate::world::PackReference;
use std::collections::HashSet;
use std::fmt;

/// One pack to deploy
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub source: PackSource,
    /// Install area and reference document the pack goes to
    pub capability: Capability,
    /// World reference that asked for it, carrying any extra fields to keep
    pub reference: Option<PackReference>,
}

impl PlanEntry {
    pub fn key(&self) -> PackKey {
        PackKey::new(self.source.identity.uuid.clone(), self.capability)
    }

    /// Reference entry describing the installed pack
    ///
    /// Points at the version actually deployed; extra fields from the
    /// world's original entry are preserved.
    pub fn to_reference(&self) -> PackReference {
        let mut reference = PackReference::new(
            self.source.identity.uuid.clone(),
            self.source.identity.version,
        );
        if let Some(original) = &self.reference {
            reference.extra = original.extra.clone();
        }
        reference
    }
}

/// Ordered, duplicate-free list of packs to deploy
#[derive(Debug, Clone, Default)]
pub struct InstallPlan {
    entries: Vec<PlanEntry>,
    keys: HashSet<PackKey>,
}

impl InstallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pack in the registry, in (uuid, capability) order
    pub fn from_registry(registry: &PackRegistry) -> Self {
        let mut plan = Self::new();
        plan.extend_from_registry(registry);
        plan
    }

    /// Append every registry pack not already planned
    pub fn extend_from_registry(&mut self, registry: &PackRegistry) {
        for source in registry.sources() {
            self.push(PlanEntry {
                capability: source.identity.capability,
                source: source.clone(),
                reference: None,
            });
        }
    }

    /// Append an entry; returns false if its identity is already planned
    pub fn push(&mut self, entry: PlanEntry) -> bool {
        if !self.keys.insert(entry.key()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Entries for one capability, in plan order
    pub fn for_capability(&self, capability: Capability) -> impl Iterator<Item = &PlanEntry> + '_ {
        self.entries.iter().filter(move |e| e.capability == capability)
    }

    pub fn keys(&self) -> &HashSet<PackKey> {
        &self.keys
    }

    pub fn contains(&self, key: &PackKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A world asks for a different version than the pool provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub key: PackKey,
    pub required: PackVersion,
    pub available: PackVersion,
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires {}, installing {}",
            self.key, self.required, self.available
        )
    }
}

/// Plan plus the warnings raised while resolving it
#[derive(Debug, Clone, Default)]
pub struct ResolveReport {
    pub plan: InstallPlan,
    pub mismatches: Vec<VersionMismatch>,
}
