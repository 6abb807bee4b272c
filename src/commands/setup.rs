// src/commands/setup.rs
//! Setup and check commands

use super::progress;
use super::prompt;
use anyhow::{Context, Result};
use tracing::info;
use worldpack::resolver;
use worldpack::{
    DeploymentDiff, PackRegistry, Pipeline, PipelineReport, RunLock, ServerLayout, SetupOptions,
    WorldChoice, WorldSelector,
};

/// Pick the world from flags, or ask when neither flag was given
fn select_world(
    layout: &ServerLayout,
    world: Option<usize>,
    existing: bool,
) -> Result<WorldChoice> {
    if existing {
        return Ok(WorldChoice::Existing);
    }
    if let Some(number) = world {
        return Ok(WorldChoice::from_menu(number));
    }

    let selector = WorldSelector::discover(layout)?;
    if selector.candidates().is_empty() || !prompt::is_interactive() {
        return Ok(WorldChoice::Existing);
    }
    prompt::choose_world(selector.candidates(), selector.has_live_world()?)
}

/// Run the full pipeline
pub fn cmd_setup(
    layout: &ServerLayout,
    world: Option<usize>,
    existing: bool,
    all_packs: bool,
    dry_run: bool,
) -> Result<()> {
    let choice = select_world(layout, world, existing)?;
    let options = SetupOptions {
        choice,
        all_packs,
        dry_run,
    };

    let _lock = if dry_run {
        None
    } else {
        Some(RunLock::try_acquire(&layout.backup_dir).context("Cannot start setup")?)
    };

    info!("Starting setup ({:?})", options);
    let progress = progress::tracker("Deploying packs");
    let report = Pipeline::new(layout, progress.as_ref())
        .run(options)
        .context("Setup failed")?;

    print_report(&report, dry_run);

    if let Some(deploy) = &report.deploy
        && !deploy.is_success()
    {
        anyhow::bail!(
            "{} pack(s) failed to deploy: {}",
            deploy.failed.len(),
            deploy.failed_uuids().join(", ")
        );
    }
    Ok(())
}

fn print_report(report: &PipelineReport, dry_run: bool) {
    println!("World: {}", report.level_name);
    if let Some(imported) = &report.imported {
        println!("Imported: {}", imported.display());
    }
    if let Some(backup) = &report.safety_backup {
        println!("Safety backup: {}", backup.path.display());
    }

    println!("Packs in pool: {}", report.available);
    for error in &report.scan_errors {
        println!("  [skipped] {}", error);
    }
    for conflict in &report.conflicts {
        println!("  [conflict] {}", conflict);
    }
    for mismatch in &report.mismatches {
        println!("  [version] {}", mismatch);
    }

    if dry_run {
        println!("Dry run, nothing changed:");
        print_diff(&report.diff);
        return;
    }

    if let Some(deploy) = &report.deploy {
        println!(
            "Deployed: {} installed, {} removed, {} unchanged",
            deploy.installed.len(),
            deploy.removed.len(),
            deploy.unchanged.len()
        );
        for identity in &deploy.installed {
            println!("  + {}", identity);
        }
        for record in &deploy.removed {
            println!("  - {}", record.identity);
        }
        for failure in &deploy.failed {
            println!("  ! {}: {}", failure.key, failure.error);
        }
    }
}

fn print_diff(diff: &DeploymentDiff) {
    if diff.is_empty() && diff.invalid.is_empty() {
        println!("  Install areas already match");
    }
    for removal in &diff.to_remove {
        println!(
            "  Remove {} at {} ({})",
            removal.record.identity,
            removal.record.path.display(),
            removal.reason
        );
    }
    for installation in &diff.to_install {
        println!("  {}", installation.description());
    }
    for (key, reason) in &diff.invalid {
        println!("  Cannot install {}: {}", key, reason);
    }
    println!("  {} unchanged", diff.unchanged.len());
}

/// Resolve a world's requirements and report problems
pub fn cmd_check(layout: &ServerLayout, world: Option<usize>) -> Result<()> {
    let choice = world.map(WorldChoice::from_menu).unwrap_or(WorldChoice::Existing);
    let scan = PackRegistry::scan(layout)?;
    let selector = WorldSelector::discover(layout)?;
    let requirements = selector.requirements(choice)?;
    let level_name = selector.level_name(choice)?;

    println!(
        "World '{}' declares {} behavior and {} resource packs",
        level_name,
        requirements.behavior.len(),
        requirements.resource.len()
    );

    let missing = resolver::missing(&requirements, &scan.registry);
    if !missing.is_empty() {
        for key in &missing {
            println!("  [missing] {}", key);
        }
        anyhow::bail!("{} required pack(s) are not in {}", missing.len(), layout.pool_dir.display());
    }

    let report = resolver::resolve(&requirements, &scan.registry, &level_name)?;
    for mismatch in &report.mismatches {
        println!("  [version] {}", mismatch);
    }
    for entry in report.plan.entries() {
        println!(
            "  [ok] {} {} from {}",
            entry.capability,
            entry.source.display_name(),
            entry.source.source_path().display()
        );
    }
    println!("All {} required packs are available", report.plan.len());
    Ok(())
}
