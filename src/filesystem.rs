//! Filesystem capability used by the organizer.
//!
//! The organizer only ever talks to the disk through the [`FileSystem`] trait,
//! so tests can substitute an implementation that injects failures.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What kind of entry a directory listing returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
    /// Symlinks, sockets, devices and anything else; never traversed or relocated.
    Other,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub kind: EntryKind,
}

impl DirEntryInfo {
    /// Returns true for entries whose name starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.name.to_string_lossy().starts_with('.')
    }
}

/// The filesystem operations the organizer consumes.
///
/// Every method returns the raw `io::Error` so callers can inspect its kind
/// (e.g. to decide whether a failed rename should fall back to copy+delete).
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// Lists immediate children without following symlinks.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Creates a directory and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory; fails if it is not empty.
    fn remove_empty_dir(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn delete_file(&self, path: &Path) -> io::Result<()>;

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Resolves `path` to an absolute path with symlinks and `..` removed.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling link still counts as occupied
        fs::symlink_metadata(path).is_ok()
    }

    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            entries.push(DirEntryInfo {
                name: entry.file_name(),
                kind,
            });
        }
        // read_dir order is platform dependent; sort for reproducible runs
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_empty_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_entries_kinds_sorted() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("b.txt"), "b").unwrap();
        fs::write(base.join("a.txt"), "a").unwrap();
        fs::create_dir(base.join("sub")).unwrap();

        let entries = StdFileSystem.list_entries(base).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.name.to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[2].kind, EntryKind::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_listed_as_other() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("target.txt"), "t").unwrap();
        std::os::unix::fs::symlink(base.join("target.txt"), base.join("link.txt")).unwrap();

        let entries = StdFileSystem.list_entries(base).unwrap();
        let link = entries
            .iter()
            .find(|e| e.name == "link.txt")
            .expect("link listed");
        assert_eq!(link.kind, EntryKind::Other);
    }

    #[test]
    fn test_hidden_detection() {
        let hidden = DirEntryInfo {
            name: OsString::from(".DS_Store"),
            kind: EntryKind::File,
        };
        let visible = DirEntryInfo {
            name: OsString::from("photo.jpg"),
            kind: EntryKind::File,
        };
        assert!(hidden.is_hidden());
        assert!(!visible.is_hidden());
    }

    #[test]
    fn test_remove_empty_dir_refuses_non_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dir = temp_dir.path().join("full");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("keep.txt"), "x").unwrap();

        assert!(StdFileSystem.remove_empty_dir(&dir).is_err());
        assert!(dir.exists());
    }
}
