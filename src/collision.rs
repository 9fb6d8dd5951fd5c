//! Collision-free destination naming.
//!
//! When a file named `photo.jpg` already exists in the destination, the
//! relocated file becomes `photo-1.jpg`, then `photo-2.jpg`, and so on.

use crate::filesystem::FileSystem;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Splits a file name into stem and extension at the last dot.
///
/// The extension excludes the dot and is empty when there is none. A name
/// whose only dot is the first character (`.bashrc`) is all stem. A trailing
/// dot ends the stem and leaves an empty extension (`notes.` splits into
/// `notes` and `""`).
///
/// # Examples
///
/// ```
/// use tidytree::collision::split_file_name;
///
/// assert_eq!(split_file_name("archive.tar.gz"), ("archive.tar", "gz"));
/// assert_eq!(split_file_name("README"), ("README", ""));
/// ```
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx + 1..]),
        _ => (file_name, ""),
    }
}

/// Returns the name for the `n`-th collision variant of `file_name`.
///
/// Works on the raw `OsStr` so names that are not valid UTF-8 keep their bytes.
/// The dot split matches [`split_file_name`], so `notes.` becomes `notes-1.`.
fn suffixed_name(file_name: &OsStr, n: u64) -> OsString {
    let path = Path::new(file_name);
    let mut name = path.file_stem().unwrap_or(file_name).to_os_string();
    name.push(format!("-{}", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Picks the first path in `destination_dir` for `file_name` that is not taken.
///
/// `is_taken` is consulted once per candidate, in order: the plain name, then
/// `stem-1.ext`, `stem-2.ext`, ... This is the primitive behind
/// [`resolve_destination`]; dry runs also pass paths already planned in the
/// same run.
pub fn resolve_destination_with<F>(
    destination_dir: &Path,
    file_name: &OsStr,
    mut is_taken: F,
) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    let candidate = destination_dir.join(file_name);
    if !is_taken(&candidate) {
        return candidate;
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = destination_dir.join(suffixed_name(file_name, counter));
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Returns a path in `destination_dir` that does not exist at call time.
///
/// # Examples
///
/// ```no_run
/// use tidytree::collision::resolve_destination;
/// use tidytree::filesystem::StdFileSystem;
/// use std::ffi::{OsStr, OsString};
/// use std::path::Path;
///
/// // With images/a.jpg already present this yields images/a-1.jpg
/// let target = resolve_destination(&StdFileSystem, Path::new("images"), OsStr::new("a.jpg"));
/// println!("{}", target.display());
/// ```
pub fn resolve_destination<F: FileSystem + ?Sized>(
    fs: &F,
    destination_dir: &Path,
    file_name: &OsStr,
) -> PathBuf {
    resolve_destination_with(destination_dir, file_name, |candidate| fs.exists(candidate))
}
