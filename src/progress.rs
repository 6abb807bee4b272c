// src/progress.rs

//! Progress reporting for long-running steps
//!
//! Archival and deployment report progress through the `ProgressTracker`
//! trait so the library never decides how output looks. Implementations:
//! - `SilentProgress`: no-op, for tests and quiet runs
//! - `LogProgress`: periodic tracing lines
//!
//! The CLI supplies an indicatif-backed tracker of its own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Core trait for progress tracking
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error/abandonment message
    fn finish_with_error(&self, message: &str);
}

/// Silent progress tracker (no-op apart from counting)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn set_length(&self, _length: u64) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

/// Logging progress tracker
///
/// Logs roughly ten times over the course of the operation.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;
        let length = self.length.load(Ordering::Relaxed);
        if length == 0 {
            return;
        }

        let interval = std::cmp::max(1, length / 10);
        if new_pos / interval > old_pos / interval {
            let percent = (new_pos * 100) / length;
            info!("{}: {}% ({}/{})", self.name, percent, new_pos, length);
        }
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        info!("{}: ERROR - {}", self.name, message);
    }
}
