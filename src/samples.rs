//! Populating the source directory before a run.
//!
//! `--seed-samples` fills an empty source directory with a handful of small
//! files so the organizer has something to sort; `--import` copies one
//! external file in under a collision-free name.

use crate::collision::resolve_destination;
use crate::filesystem::FileSystem;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};

/// Names written by [`seed_samples`], one per interesting category.
pub const SAMPLE_NAMES: [&str; 6] = [
    "sample-image.jpg",
    "sample-video.mp4",
    "sample-audio.mp3",
    "sample-document.pdf",
    "sample-archive.zip",
    "notes.txt",
];

/// Writes the sample files into `source_dir` if it is empty.
///
/// The directory is created if needed. Returns the paths written; nothing is
/// written (and an empty list returned) when the directory already has
/// entries. Existing files are never overwritten.
pub fn seed_samples<F: FileSystem + ?Sized>(
    fs: &F,
    source_dir: &Path,
) -> io::Result<Vec<PathBuf>> {
    fs.create_dir_all(source_dir)?;
    if !fs.list_entries(source_dir)?.is_empty() {
        return Ok(Vec::new());
    }

    let created_at = Utc::now().to_rfc3339();
    let mut written = Vec::new();
    for name in SAMPLE_NAMES {
        let path = source_dir.join(name);
        if fs.exists(&path) {
            continue;
        }
        let contents = format!("This is a sample file: {}\nCreated at {}", name, created_at);
        fs.write_file(&path, contents.as_bytes())?;
        written.push(path);
    }
    Ok(written)
}

/// Copies `file` into `source_dir`, appending `-1`, `-2`, ... on a name clash.
///
/// Returns `Ok(None)` when `file` does not exist.
pub fn import_file<F: FileSystem + ?Sized>(
    fs: &F,
    file: &Path,
    source_dir: &Path,
) -> io::Result<Option<PathBuf>> {
    if !fs.exists(file) {
        return Ok(None);
    }
    let file_name = file.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "import path has no file name")
    })?;

    fs.create_dir_all(source_dir)?;
    let target = resolve_destination(fs, source_dir, file_name);
    fs.copy_file(file, &target)?;
    Ok(Some(target))
}
