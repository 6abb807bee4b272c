// src/commands/progress.rs
//! Terminal progress bars for archival and deployment
//!
//! Wraps an indicatif bar in the library's `ProgressTracker` trait so the
//! pipeline can report progress without knowing about the terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use worldpack::{LogProgress, ProgressTracker};

/// A bar on a terminal, periodic log lines otherwise (cron, systemd)
pub fn tracker(operation: &str) -> Box<dyn ProgressTracker> {
    if std::io::stderr().is_terminal() {
        Box::new(CliProgress::new(operation))
    } else {
        Box::new(LogProgress::new(operation))
    }
}

/// Bar-style tracker
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(operation: &str) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} ({pos}/{len}) [{bar:40.green/dim}] {percent}%")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(operation.to_string());
        Self { bar }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
        self.bar.set_position(0);
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}
