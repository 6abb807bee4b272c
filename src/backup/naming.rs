// src/backup/naming.rs

//! Backup file names
//!
//! `<Level_Name>_<Mon><DD>_<YYYY>[<suffix>].<ext>`, for example
//! `Core_Craft_TK2_Mar05_2024b.mcworld`. The suffix is empty for the first
//! backup of a level on a day, then `a`, `b`, ... `z`, `aa`, `ab`, ... The
//! next free suffix is always derived from the files currently in the
//! backup directory; nothing is persisted between runs.

use crate::error::Result;
use crate::world::DEFAULT_LEVEL_NAME;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Characters that never appear in a normalized level name
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Normalize a display name for use in a file name
///
/// Whitespace becomes `_`, path and shell-hostile characters are dropped,
/// leading dots are trimmed. An empty result falls back to `World`.
pub fn normalize_level_name(name: &str) -> String {
    let normalized: String = name
        .trim()
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c) && !c.is_control())
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let normalized = normalized.trim_start_matches('.');
    if normalized.is_empty() {
        DEFAULT_LEVEL_NAME.to_string()
    } else {
        normalized.to_string()
    }
}

/// `Mar05_2024` style date token
pub fn date_token(date: NaiveDate) -> String {
    date.format("%b%d_%Y").to_string()
}

/// Letters for a sequence number; 0 has no suffix
pub fn sequence_suffix(sequence: u32) -> String {
    let mut letters = Vec::new();
    let mut n = sequence;
    while n > 0 {
        n -= 1;
        letters.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of `sequence_suffix`; `None` for anything but lowercase letters
pub fn parse_suffix(suffix: &str) -> Option<u32> {
    suffix.chars().try_fold(0u32, |acc, c| {
        if c.is_ascii_lowercase() {
            acc.checked_mul(26)?.checked_add(c as u32 - 'a' as u32 + 1)
        } else {
            None
        }
    })
}

/// A fully determined backup file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupName {
    /// Normalized level name
    pub level_name: String,
    pub date: NaiveDate,
    pub sequence: u32,
    /// Extension without the dot
    pub extension: String,
}

impl BackupName {
    /// The lowest unused name for this level and day in `backup_dir`
    pub fn next_in(
        backup_dir: &Path,
        level_name: &str,
        date: NaiveDate,
        extension: &str,
    ) -> Result<Self> {
        let mut name = Self {
            level_name: normalize_level_name(level_name),
            date,
            sequence: 0,
            extension: extension.trim_start_matches('.').to_string(),
        };
        let taken = name.taken_sequences(backup_dir)?;
        while taken.contains(&name.sequence) {
            name.sequence += 1;
        }
        Ok(name)
    }

    /// Name stem shared by every sequence for this level and day
    pub fn stem(&self) -> String {
        format!("{}_{}", self.level_name, date_token(self.date))
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{}.{}",
            self.stem(),
            sequence_suffix(self.sequence),
            self.extension
        )
    }

    pub fn path_in(&self, backup_dir: &Path) -> PathBuf {
        backup_dir.join(self.file_name())
    }

    /// Sequence numbers already used in `backup_dir` for this level and day
    ///
    /// The extension matches case-insensitively, as in `BackupManager::list`.
    fn taken_sequences(&self, backup_dir: &Path) -> Result<BTreeSet<u32>> {
        let mut taken = BTreeSet::new();
        if !backup_dir.is_dir() {
            return Ok(taken);
        }

        let pattern = format!(
            r"^{}([a-z]*)\.(?i:{})$",
            regex::escape(&self.stem()),
            regex::escape(&self.extension)
        );
        let Ok(matcher) = Regex::new(&pattern) else {
            return Ok(taken);
        };

        for entry in fs::read_dir(backup_dir)? {
            let file_name = entry?.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(caps) = matcher.captures(file_name)
                && let Some(sequence) = parse_suffix(&caps[1])
            {
                taken.insert(sequence);
            }
        }
        Ok(taken)
    }
}
