// src/commands/mod.rs
//! Command handlers for the worldpack CLI

mod backup;
mod packs;
pub mod progress;
mod prompt;
mod setup;

pub use backup::{cmd_backup, cmd_backups, cmd_restore};
pub use packs::{cmd_packs, cmd_worlds};
pub use setup::{cmd_check, cmd_setup};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use worldpack::{ServerLayout, CONFIG_FILE_NAME};

/// Build the layout from `--root` and `--config`
///
/// An explicit config file must exist; `<root>/worldpack.toml` is used when
/// present, otherwise the default layout under the root applies.
pub fn load_layout(root: &Path, config: Option<&Path>) -> Result<ServerLayout> {
    let layout = match config {
        Some(path) => ServerLayout::load(path)
            .with_context(|| format!("Failed to load layout from {}", path.display()))?,
        None => {
            let default_path = root.join(CONFIG_FILE_NAME);
            if default_path.is_file() {
                ServerLayout::load(&default_path).with_context(|| {
                    format!("Failed to load layout from {}", default_path.display())
                })?
            } else {
                ServerLayout::from_root(root)
            }
        }
    };
    debug!("Using layout: {:?}", layout);
    Ok(layout)
}

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
