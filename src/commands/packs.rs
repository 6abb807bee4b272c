// src/commands/packs.rs
//! Pool and staging inspection commands

use super::format_bytes;
use super::prompt::print_world_menu;
use anyhow::Result;
use worldpack::{PackRegistry, ServerLayout, WorldSelector};

/// Show the registry, conflicts and discovery errors
pub fn cmd_packs(layout: &ServerLayout) -> Result<()> {
    let report = PackRegistry::scan(layout)?;
    let registry = &report.registry;

    println!("Pack pool: {}", layout.pool_dir.display());
    if registry.is_empty() {
        println!("  (no packs)");
    }
    for source in registry.sources() {
        println!(
            "  {:<8} {} v{}  {}  [{}]",
            source.identity.capability.to_string(),
            source.identity.uuid,
            source.identity.version,
            source.display_name(),
            source.digest.short()
        );
    }

    if !registry.conflicts().is_empty() {
        println!("Conflicts:");
        for conflict in registry.conflicts() {
            println!("  {}", conflict);
        }
    }
    if !report.errors.is_empty() {
        println!("Unreadable:");
        for error in &report.errors {
            println!("  {}", error);
        }
    }
    Ok(())
}

/// List staged worlds in menu order
pub fn cmd_worlds(layout: &ServerLayout) -> Result<()> {
    let selector = WorldSelector::discover(layout)?;
    println!("Staged worlds in {}:", layout.staging_dir.display());
    print_world_menu(selector.candidates(), selector.has_live_world()?);

    let total: u64 = selector.candidates().iter().map(|c| c.size).sum();
    println!(
        "{} staged, {} total",
        selector.candidates().len(),
        format_bytes(total)
    );
    Ok(())
}
