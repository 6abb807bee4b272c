// src/resolver/mod.rs

//! World requirement resolution
//!
//! Matches every pack a world declares against the pack registry and
//! produces the installation plan. A version difference between the world's
//! reference and the pool is only a warning; a pack the pool cannot provide
//! at all stops resolution, and with it the whole run, before anything on
//! disk has been changed.

mod plan;

pub use plan::{InstallPlan, PlanEntry, ResolveReport, VersionMismatch};

use crate::error::{Error, Result};
use crate::pack::{PackKey, PackRegistry};
use crate::world::WorldRequirement;
use tracing::{debug, info, warn};

/// Resolve a world's requirements against the registry
///
/// Requirements are visited behavior first, each capability in document
/// order; the plan keeps that order. `world_name` only appears in errors.
pub fn resolve(
    requirements: &WorldRequirement,
    registry: &PackRegistry,
    world_name: &str,
) -> Result<ResolveReport> {
    let mut report = ResolveReport::default();

    for (capability, reference) in requirements.iter() {
        let source = match registry.lookup(&reference.pack_id, capability) {
            Ok(source) => source,
            Err(Error::NotFound { uuid, capability }) => {
                return Err(Error::MissingDependency {
                    uuid,
                    capability,
                    world: world_name.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if source.identity.version != reference.version {
            let mismatch = VersionMismatch {
                key: source.key(),
                required: reference.version,
                available: source.identity.version,
            };
            warn!("Version mismatch: {}", mismatch);
            report.mismatches.push(mismatch);
        }

        let added = report.plan.push(PlanEntry {
            source: source.clone(),
            capability,
            reference: Some(reference.clone()),
        });
        if !added {
            debug!("{} already planned", source.identity);
        }
    }

    info!(
        "Resolved {} packs for '{}' ({} version warnings)",
        report.plan.len(),
        world_name,
        report.mismatches.len()
    );
    Ok(report)
}

/// Every missing requirement, for reporting without aborting at the first
pub fn missing(requirements: &WorldRequirement, registry: &PackRegistry) -> Vec<PackKey> {
    requirements
        .iter()
        .filter(|(cap, r)| registry.lookup(&r.pack_id, *cap).is_err())
        .map(|(cap, r)| PackKey::new(r.pack_id.clone(), cap))
        .collect()
}
