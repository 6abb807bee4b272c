// src/archive/mod.rs

//! Compressed containers for packs, worlds and backups
//!
//! `.mcpack`, `.mcaddon` and `.mcworld` files are zip archives. Gzip
//! tarballs are also accepted on read; the format is chosen from the
//! leading magic bytes, never from the extension. Everything this crate
//! writes is zip.
//!
//! A world container's root is the flattened contents of the world
//! directory; a pack container holds one or more pack roots, each a
//! directory with a `manifest.json`.
//!
//! Writes go to a temporary file in the destination directory and are
//! moved into place only once the writer has finished, so a failed or
//! interrupted write never leaves a partial archive at the final path. An
//! existing file at the destination is never replaced.

use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_path;
use crate::hash::to_slash_path;
use crate::progress::ProgressTracker;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tar::EntryType;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Refuse single entries larger than this while reading into memory
pub const MAX_ENTRY_SIZE: u64 = 512 * 1024 * 1024;

const ZIP_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];
const GZIP_MAGIC: &[u8] = b"\x1f\x8b";

/// Encoding of a container on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Zip,
    TarGz,
}

impl ContainerFormat {
    /// Sniff the format from the first bytes of `path`
    pub fn detect(path: &Path) -> Result<Self> {
        let mut head = Vec::with_capacity(4);
        File::open(path)
            .and_then(|file| file.take(4).read_to_end(&mut head))
            .map_err(|e| extract_error(path, e))?;

        if ZIP_MAGIC.iter().any(|magic| head.starts_with(magic)) {
            Ok(Self::Zip)
        } else if head.starts_with(GZIP_MAGIC) {
            Ok(Self::TarGz)
        } else {
            Err(extract_error(path, "not a zip or gzip tar container"))
        }
    }
}

/// A regular file read out of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Sanitised relative path with '/' separators
    pub path: String,
    pub content: Vec<u8>,
}

/// Outcome of writing a container
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: u64,
    /// Sum of the uncompressed file sizes
    pub source_bytes: u64,
    /// Size of the finished container
    pub archive_bytes: u64,
    /// Entries left out because they are neither files nor directories
    pub skipped: Vec<PathBuf>,
}

impl ArchiveSummary {
    /// Percentage saved by compression (0 for empty sources)
    pub fn compression_ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 0.0;
        }
        (self.source_bytes as f64 - self.archive_bytes as f64) / self.source_bytes as f64 * 100.0
    }
}

fn extract_error(path: &Path, reason: impl ToString) -> Error {
    Error::ArchiveExtractFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, reason: impl ToString) -> Error {
    Error::ArchiveWriteFailed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    Other,
}

/// Call `visit` with the raw name, kind, declared size and reader of every
/// entry, in container order
fn visit_entries<F>(archive_path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&str, EntryKind, u64, &mut dyn Read) -> Result<()>,
{
    let file = File::open(archive_path).map_err(|e| extract_error(archive_path, e))?;
    let reader = BufReader::new(file);

    match ContainerFormat::detect(archive_path)? {
        ContainerFormat::Zip => {
            let mut zip = ZipArchive::new(reader).map_err(|e| extract_error(archive_path, e))?;
            for index in 0..zip.len() {
                let mut entry = zip
                    .by_index(index)
                    .map_err(|e| extract_error(archive_path, e))?;
                // Archives made on Windows sometimes use '\' separators
                let raw = entry.name().replace('\\', "/");
                let kind = if entry.is_dir() {
                    EntryKind::Dir
                } else if entry.is_file() {
                    EntryKind::File
                } else {
                    EntryKind::Other
                };
                let size = entry.size();
                visit(&raw, kind, size, &mut entry)?;
            }
        }
        ContainerFormat::TarGz => {
            let mut tar = tar::Archive::new(GzDecoder::new(reader));
            for entry in tar.entries().map_err(|e| extract_error(archive_path, e))? {
                let mut entry = entry.map_err(|e| extract_error(archive_path, e))?;
                let raw = entry
                    .path()
                    .map_err(|e| extract_error(archive_path, e))?
                    .to_string_lossy()
                    .into_owned();
                let kind = match entry.header().entry_type() {
                    EntryType::Regular => EntryKind::File,
                    EntryType::Directory => EntryKind::Dir,
                    _ => EntryKind::Other,
                };
                let size = entry.header().size().unwrap_or(0);
                visit(&raw, kind, size, &mut entry)?;
            }
        }
    }
    Ok(())
}

/// Read every regular file whose sanitised path satisfies `wanted`
///
/// Entries with unsafe paths are rejected outright rather than skipped: a
/// container carrying them is not trustworthy.
pub fn read_entries_matching<F>(archive_path: &Path, mut wanted: F) -> Result<Vec<ArchiveEntry>>
where
    F: FnMut(&str) -> bool,
{
    let mut entries = Vec::new();

    visit_entries(archive_path, |raw, kind, size, reader| {
        if kind != EntryKind::File {
            return Ok(());
        }
        let path = to_slash_path(&sanitize_path(raw).map_err(|e| extract_error(archive_path, e))?);
        if !wanted(&path) {
            return Ok(());
        }
        if size > MAX_ENTRY_SIZE {
            return Err(extract_error(
                archive_path,
                format!("entry {} is {} bytes, over the limit", path, size),
            ));
        }

        let mut content = Vec::with_capacity(size as usize);
        reader
            .read_to_end(&mut content)
            .map_err(|e| extract_error(archive_path, e))?;
        entries.push(ArchiveEntry { path, content });
        Ok(())
    })?;

    Ok(entries)
}

/// Read every regular file in a container
pub fn read_entries(archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
    read_entries_matching(archive_path, |_| true)
}

/// Extract a container into `dest`, reconstructing its tree
///
/// `dest` is created if missing. Returns the number of files written.
pub fn extract_to(archive_path: &Path, dest: &Path) -> Result<u64> {
    fs::create_dir_all(dest).map_err(|e| extract_error(archive_path, e))?;
    let mut files = 0;

    visit_entries(archive_path, |raw, kind, _size, reader| {
        match kind {
            EntryKind::Dir => {
                // The container root shows up as "./"
                if let Ok(relative) = sanitize_path(raw) {
                    fs::create_dir_all(dest.join(relative))
                        .map_err(|e| extract_error(archive_path, e))?;
                }
            }
            EntryKind::Other => debug!("Skipping non-regular entry {}", raw),
            EntryKind::File => {
                let target = dest.join(sanitize_path(raw).map_err(|e| extract_error(archive_path, e))?);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| extract_error(archive_path, e))?;
                }
                let mut out = File::create(&target).map_err(|e| extract_error(archive_path, e))?;
                io::copy(reader, &mut out).map_err(|e| extract_error(archive_path, e))?;
                files += 1;
            }
        }
        Ok(())
    })?;

    debug!(
        "Extracted {} files from {} into {}",
        files,
        archive_path.display(),
        dest.display()
    );
    Ok(files)
}

/// Package the contents of `source_dir` into a zip container at `dest`
///
/// Entries are added in sorted order with paths relative to `source_dir`,
/// including empty directories, so extraction reproduces the tree exactly.
/// Symlinks and special files are left out and listed in the summary.
/// Nothing appears at `dest` unless the whole container was written, and a
/// file already at `dest` fails with `ArchiveExists` instead of being
/// replaced.
pub fn write_dir(
    source_dir: &Path,
    dest: &Path,
    progress: &dyn ProgressTracker,
) -> Result<ArchiveSummary> {
    if !source_dir.is_dir() {
        return Err(write_error(dest, format!("{} is not a directory", source_dir.display())));
    }

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| write_error(dest, e))?;

    let entries: Vec<walkdir::DirEntry> = WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| write_error(dest, e))?;

    let file_count = entries.iter().filter(|e| e.file_type().is_file()).count() as u64;
    progress.set_length(file_count);

    let temp = tempfile::Builder::new()
        .prefix(".worldpack-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|e| write_error(dest, e))?;

    let mut writer = ZipWriter::new(temp.reopen().map_err(|e| write_error(dest, e))?);

    let mut source_bytes = 0;
    let mut skipped = Vec::new();
    for entry in &entries {
        let relative = to_slash_path(entry.path().strip_prefix(source_dir).unwrap_or(entry.path()));
        let file_type = entry.file_type();
        if file_type.is_dir() {
            writer
                .add_directory(
                    format!("{}/", relative),
                    SimpleFileOptions::default().unix_permissions(0o755),
                )
                .map_err(|e| write_error(dest, e))?;
        } else if file_type.is_file() {
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(0o644)
                .large_file(len >= u64::from(u32::MAX));
            writer
                .start_file(relative, options)
                .map_err(|e| write_error(dest, e))?;
            let mut file = File::open(entry.path()).map_err(|e| write_error(dest, e))?;
            io::copy(&mut file, &mut writer).map_err(|e| write_error(dest, e))?;
            source_bytes += len;
            progress.increment(1);
        } else {
            warn!("Not archiving {}: not a regular file or directory", entry.path().display());
            skipped.push(entry.path().to_path_buf());
        }
    }

    let file = writer.finish().map_err(|e| write_error(dest, e))?;
    file.sync_all().map_err(|e| write_error(dest, e))?;
    drop(file);

    temp.persist_noclobber(dest).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            Error::ArchiveExists(dest.to_path_buf())
        } else {
            write_error(dest, e.error)
        }
    })?;

    let archive_bytes = fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
    info!(
        "Wrote {} ({} files, {} -> {} bytes)",
        dest.display(),
        file_count,
        source_bytes,
        archive_bytes
    );

    Ok(ArchiveSummary {
        path: dest.to_path_buf(),
        files: file_count,
        source_bytes,
        archive_bytes,
        skipped,
    })
}
