/// Tree organizer: walks a source tree and sorts files into category directories.
///
/// The walk is depth-first. Files are classified by extension, given a
/// collision-free name under `<destination>/<category>/` and then moved or
/// copied. When a subdirectory has been fully processed it is re-listed and
/// removed if nothing is left in it.
use crate::collision::{resolve_destination, resolve_destination_with, split_file_name};
use crate::config::{CompiledFilters, FallbackTrigger, RelocationMode};
use crate::file_category::{Category, CategoryTable};
use crate::filesystem::{EntryKind, FileSystem};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Run parameters for a single organize pass.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Tree to organize.
    pub source_root: PathBuf,
    /// Root that receives one subdirectory per category.
    pub destination_root: PathBuf,
    /// Move or copy.
    pub mode: RelocationMode,
    /// Plan every relocation without touching the filesystem.
    pub dry_run: bool,
    /// Rename failures that fall back to copy-then-delete in move mode.
    pub fallback_on: Vec<FallbackTrigger>,
}

impl OrganizeOptions {
    /// Options for a real (non dry-run) pass with the default fallback triggers.
    pub fn new(
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        mode: RelocationMode,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            mode,
            dry_run: false,
            fallback_on: FallbackTrigger::DEFAULT.to_vec(),
        }
    }
}

/// A single planned relocation, computed right before it is executed.
#[derive(Debug, Clone, Serialize)]
pub struct RelocationPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
    pub mode: RelocationMode,
}

/// How a relocation was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelocationOutcome {
    /// Renamed in place.
    Moved,
    /// Copied; the source is untouched.
    Copied,
    /// Rename failed with a fallback trigger, so the file was copied and the original deleted.
    CopiedAndRemoved,
    /// Dry run: nothing was done.
    Planned,
}

/// A completed (or, in a dry run, planned) relocation.
#[derive(Debug, Clone, Serialize)]
pub struct Relocation {
    #[serde(flatten)]
    pub plan: RelocationPlan,
    pub outcome: RelocationOutcome,
}

/// Why a single file could not be relocated.
#[derive(Debug)]
pub enum RelocationError {
    /// The rename failed with an error outside the fallback trigger set.
    RenameFailed(io::Error),
    /// Copy mode: copying the bytes failed.
    CopyFailed(io::Error),
    /// The rename triggered the fallback, but the fallback copy failed too.
    FallbackCopyFailed {
        rename_error: io::Error,
        copy_error: io::Error,
    },
    /// The fallback copy succeeded but the original could not be deleted.
    /// The copy is removed again so the file only exists at its original path.
    FallbackDeleteFailed(io::Error),
}

impl fmt::Display for RelocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenameFailed(e) => write!(f, "rename failed: {}", e),
            Self::CopyFailed(e) => write!(f, "copy failed: {}", e),
            Self::FallbackCopyFailed {
                rename_error,
                copy_error,
            } => write!(
                f,
                "rename failed ({}) and fallback copy failed: {}",
                rename_error, copy_error
            ),
            Self::FallbackDeleteFailed(e) => {
                write!(f, "copied but could not remove original: {}", e)
            }
        }
    }
}

impl std::error::Error for RelocationError {}

/// A file or directory the walk could not handle. The entry is left in place.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    /// Intended destination, when one had been computed.
    pub destination: Option<PathBuf>,
    pub reason: String,
}

/// Summary of an organize pass.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub mode: RelocationMode,
    pub dry_run: bool,
    pub relocated: Vec<Relocation>,
    pub failures: Vec<FileFailure>,
    /// Dot-prefixed entries that were neither traversed nor relocated.
    pub skipped_hidden: usize,
    /// Files matched by an exclusion rule.
    pub excluded: usize,
    /// Symlinks and other entries that are neither files nor directories.
    pub skipped_other: usize,
    /// Source directories removed because the walk left them empty.
    pub pruned_dirs: Vec<PathBuf>,
    pub category_counts: BTreeMap<Category, usize>,
}

impl OrganizeReport {
    fn new(options: &OrganizeOptions, source_root: PathBuf, destination_root: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            source_root,
            destination_root,
            mode: options.mode,
            dry_run: options.dry_run,
            relocated: Vec::new(),
            failures: Vec::new(),
            skipped_hidden: 0,
            excluded: 0,
            skipped_other: 0,
            pruned_dirs: Vec::new(),
            category_counts: BTreeMap::new(),
        }
    }

    /// Number of files relocated (or planned, in a dry run).
    pub fn processed(&self) -> usize {
        self.relocated.len()
    }

    /// Returns true if no file failed.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that abort an organize pass before or at its root.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create the source root, destination root or a category directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: io::Error,
    },
    /// The source path cannot be used (missing in a dry run, or not resolvable).
    InvalidSourcePath {
        path: PathBuf,
        source: io::Error,
    },
    /// The source root could not be listed.
    ReadDirFailed {
        path: PathBuf,
        source: io::Error,
    },
}

impl fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::InvalidSourcePath { path, source } => {
                write!(f, "Invalid source path {}: {}", path.display(), source)
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for organize operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Receives progress events while the organizer walks the tree.
///
/// All methods default to doing nothing.
pub trait OrganizeListener {
    fn on_relocated(&mut self, _relocation: &Relocation) {}
    fn on_failure(&mut self, _failure: &FileFailure) {}
    fn on_pruned(&mut self, _dir: &Path) {}
}

/// Listener that ignores every event.
#[derive(Debug, Default)]
pub struct SilentListener;

impl OrganizeListener for SilentListener {}

/// Per-pass mutable state.
struct WalkState {
    report: OrganizeReport,
    source_root: PathBuf,
    destination_root: PathBuf,
    /// Destination directories that must not be walked when they sit inside the source tree.
    guarded: HashSet<PathBuf>,
    /// Destinations already handed out in a dry run.
    reserved: HashSet<PathBuf>,
}

/// Sorts a source tree into category directories.
///
/// # Examples
///
/// ```no_run
/// use tidytree::config::RelocationMode;
/// use tidytree::file_category::CategoryTable;
/// use tidytree::file_organizer::{OrganizeOptions, Organizer, SilentListener};
/// use tidytree::filesystem::StdFileSystem;
///
/// let options = OrganizeOptions::new("messy-files", "organized-files", RelocationMode::Move);
/// let organizer = Organizer::new(StdFileSystem, CategoryTable::default(), options);
///
/// match organizer.organize(&mut SilentListener) {
///     Ok(report) => println!("Organized {} files", report.processed()),
///     Err(e) => eprintln!("Organization failed: {}", e),
/// }
/// ```
pub struct Organizer<F: FileSystem> {
    fs: F,
    table: CategoryTable,
    filters: CompiledFilters,
    options: OrganizeOptions,
}

impl<F: FileSystem> Organizer<F> {
    pub fn new(fs: F, table: CategoryTable, options: OrganizeOptions) -> Self {
        Self {
            fs,
            table,
            filters: CompiledFilters::default(),
            options,
        }
    }

    /// Leaves files matching `filters` in place.
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Runs one organize pass.
    ///
    /// Creates both roots and every category directory up front (skipped in a
    /// dry run), then walks the source tree. Only setup failures and an
    /// unreadable source root are returned as errors; everything that goes
    /// wrong with individual files ends up in [`OrganizeReport::failures`].
    pub fn organize(&self, listener: &mut dyn OrganizeListener) -> OrganizeResult<OrganizeReport> {
        let source_root = std::path::absolute(&self.options.source_root).map_err(|e| {
            OrganizeError::InvalidSourcePath {
                path: self.options.source_root.clone(),
                source: e,
            }
        })?;
        let destination_root =
            std::path::absolute(&self.options.destination_root).map_err(|e| {
                OrganizeError::DirectoryCreationFailed {
                    path: self.options.destination_root.clone(),
                    source: e,
                }
            })?;

        self.prepare(&source_root, &destination_root)?;

        // the guard compares paths, so both roots must be spelled the way the walk sees them
        let source_root = self
            .real_path(&source_root)
            .map_err(|e| OrganizeError::InvalidSourcePath {
                path: self.options.source_root.clone(),
                source: e,
            })?;
        let destination_root = self.real_path(&destination_root).map_err(|e| {
            OrganizeError::DirectoryCreationFailed {
                path: self.options.destination_root.clone(),
                source: e,
            }
        })?;

        let mut guarded: HashSet<PathBuf> = Category::ALL
            .iter()
            .map(|category| destination_root.join(category.dir_name()))
            .collect();
        guarded.insert(destination_root.clone());

        let mut state = WalkState {
            report: OrganizeReport::new(
                &self.options,
                source_root.clone(),
                destination_root.clone(),
            ),
            source_root: source_root.clone(),
            destination_root,
            guarded,
            reserved: HashSet::new(),
        };

        self.walk_dir(&source_root, &mut state, listener)
            .map_err(|e| OrganizeError::ReadDirFailed {
                path: source_root.clone(),
                source: e,
            })?;

        state.report.finished_at = Utc::now();
        Ok(state.report)
    }

    /// Ensures the roots and all category directories exist.
    fn prepare(&self, source_root: &Path, destination_root: &Path) -> OrganizeResult<()> {
        if self.options.dry_run {
            if !self.fs.exists(source_root) {
                return Err(OrganizeError::InvalidSourcePath {
                    path: source_root.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::NotFound, "source path does not exist"),
                });
            }
            return Ok(());
        }

        let category_dirs = Category::ALL
            .iter()
            .map(|category| destination_root.join(category.dir_name()));
        let required = [source_root.to_path_buf(), destination_root.to_path_buf()]
            .into_iter()
            .chain(category_dirs);

        for dir in required {
            self.fs
                .create_dir_all(&dir)
                .map_err(|e| OrganizeError::DirectoryCreationFailed {
                    path: dir.clone(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Resolves symlinks and `..` in `path`, keeping any trailing part that does not exist yet.
    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        match self.fs.canonicalize(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (path.parent(), path.file_name()) {
                    (Some(parent), Some(name)) => Ok(self.real_path(parent)?.join(name)),
                    _ => Ok(path.to_path_buf()),
                }
            }
            resolved => resolved,
        }
    }

    /// Processes the immediate children of `dir`. Errors only if `dir` itself cannot be listed.
    fn walk_dir(
        &self,
        dir: &Path,
        state: &mut WalkState,
        listener: &mut dyn OrganizeListener,
    ) -> io::Result<()> {
        let entries = self.fs.list_entries(dir)?;

        for entry in entries {
            if entry.is_hidden() {
                debug!("Skipping hidden entry {}", dir.join(&entry.name).display());
                state.report.skipped_hidden += 1;
                continue;
            }

            let path = dir.join(&entry.name);
            match entry.kind {
                EntryKind::Directory => self.visit_subdirectory(&path, state, listener),
                EntryKind::File => self.visit_file(&path, &entry.name, state, listener),
                EntryKind::Other => {
                    debug!("Skipping non-regular entry {}", path.display());
                    state.report.skipped_other += 1;
                }
            }
        }
        Ok(())
    }

    /// Recurses into `dir`, then removes it if the walk left it empty.
    fn visit_subdirectory(
        &self,
        dir: &Path,
        state: &mut WalkState,
        listener: &mut dyn OrganizeListener,
    ) {
        if state.guarded.contains(dir) {
            debug!("Not descending into destination directory {}", dir.display());
            return;
        }

        if let Err(e) = self.walk_dir(dir, state, listener) {
            record_failure(
                state,
                listener,
                FileFailure {
                    path: dir.to_path_buf(),
                    destination: None,
                    reason: format!("cannot read directory: {}", e),
                },
            );
            return;
        }

        if !self.options.dry_run {
            self.prune_if_empty(dir, state, listener);
        }
    }

    /// Removes `dir` if it has no entries left. Failures are logged and ignored.
    fn prune_if_empty(
        &self,
        dir: &Path,
        state: &mut WalkState,
        listener: &mut dyn OrganizeListener,
    ) {
        match self.fs.list_entries(dir) {
            Ok(remaining) if remaining.is_empty() => match self.fs.remove_empty_dir(dir) {
                Ok(()) => {
                    debug!("Removed empty directory {}", dir.display());
                    listener.on_pruned(dir);
                    state.report.pruned_dirs.push(dir.to_path_buf());
                }
                Err(e) => debug!("Could not remove empty directory {}: {}", dir.display(), e),
            },
            Ok(_) => {}
            Err(e) => debug!("Could not re-list {}: {}", dir.display(), e),
        }
    }

    /// Classifies, places and relocates one file.
    fn visit_file(
        &self,
        path: &Path,
        name: &OsStr,
        state: &mut WalkState,
        listener: &mut dyn OrganizeListener,
    ) {
        let relative = path.strip_prefix(&state.source_root).unwrap_or(path);
        if self.filters.is_excluded(relative) {
            debug!("Excluded by filter rules: {}", relative.display());
            state.report.excluded += 1;
            return;
        }

        let name_lossy = name.to_string_lossy();
        let (_, extension) = split_file_name(&name_lossy);
        let category = self.table.classify(extension);
        let category_dir = state.destination_root.join(category.dir_name());

        let destination = if self.options.dry_run {
            let reserved = &state.reserved;
            resolve_destination_with(&category_dir, name, |candidate| {
                reserved.contains(candidate) || self.fs.exists(candidate)
            })
        } else {
            resolve_destination(&self.fs, &category_dir, name)
        };

        let plan = RelocationPlan {
            source: path.to_path_buf(),
            destination,
            category,
            mode: self.options.mode,
        };

        let outcome = if self.options.dry_run {
            state.reserved.insert(plan.destination.clone());
            Ok(RelocationOutcome::Planned)
        } else {
            self.execute(&plan)
        };

        match outcome {
            Ok(outcome) => {
                let relocation = Relocation { plan, outcome };
                *state.report.category_counts.entry(category).or_insert(0) += 1;
                listener.on_relocated(&relocation);
                state.report.relocated.push(relocation);
            }
            Err(e) => {
                warn!("Failed to relocate {}: {}", plan.source.display(), e);
                record_failure(
                    state,
                    listener,
                    FileFailure {
                        path: plan.source,
                        destination: Some(plan.destination),
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    /// Carries out a relocation plan.
    fn execute(&self, plan: &RelocationPlan) -> Result<RelocationOutcome, RelocationError> {
        match plan.mode {
            RelocationMode::Copy => {
                self.copy_or_clean_up(plan).map_err(RelocationError::CopyFailed)?;
                Ok(RelocationOutcome::Copied)
            }
            RelocationMode::Move => match self.fs.rename(&plan.source, &plan.destination) {
                Ok(()) => Ok(RelocationOutcome::Moved),
                Err(e) if self.should_fall_back(&e) => {
                    debug!(
                        "Rename of {} failed ({}), falling back to copy+delete",
                        plan.source.display(),
                        e
                    );
                    self.copy_then_delete(plan, e)
                }
                Err(e) => Err(RelocationError::RenameFailed(e)),
            },
        }
    }

    fn should_fall_back(&self, err: &io::Error) -> bool {
        self.options
            .fallback_on
            .iter()
            .any(|trigger| trigger.matches(err))
    }

    fn copy_then_delete(
        &self,
        plan: &RelocationPlan,
        rename_error: io::Error,
    ) -> Result<RelocationOutcome, RelocationError> {
        self.copy_or_clean_up(plan)
            .map_err(|copy_error| RelocationError::FallbackCopyFailed {
                rename_error,
                copy_error,
            })?;

        if let Err(e) = self.fs.delete_file(&plan.source) {
            self.remove_partial(&plan.destination);
            return Err(RelocationError::FallbackDeleteFailed(e));
        }
        Ok(RelocationOutcome::CopiedAndRemoved)
    }

    /// Copies `plan.source` to `plan.destination`, removing any partial copy on failure.
    fn copy_or_clean_up(&self, plan: &RelocationPlan) -> io::Result<()> {
        self.fs
            .copy_file(&plan.source, &plan.destination)
            .inspect_err(|_| self.remove_partial(&plan.destination))
    }

    fn remove_partial(&self, destination: &Path) {
        if self.fs.exists(destination)
            && let Err(e) = self.fs.delete_file(destination)
        {
            warn!(
                "Could not remove incomplete copy {}: {}",
                destination.display(),
                e
            );
        }
    }
}

fn record_failure(
    state: &mut WalkState,
    listener: &mut dyn OrganizeListener,
    failure: FileFailure,
) {
    listener.on_failure(&failure);
    state.report.failures.push(failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::StdFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn organizer(
        source: &Path,
        destination: &Path,
        mode: RelocationMode,
    ) -> Organizer<StdFileSystem> {
        Organizer::new(
            StdFileSystem,
            CategoryTable::default(),
            OrganizeOptions::new(source, destination, mode),
        )
    }

    /// A temp directory plus its real path, which is what reports contain.
    fn workspace() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = fs::canonicalize(temp_dir.path()).expect("Failed to resolve temp directory");
        (temp_dir, root)
    }

    #[derive(Default)]
    struct RecordingListener {
        relocated: Vec<PathBuf>,
        pruned: Vec<PathBuf>,
    }

    impl OrganizeListener for RecordingListener {
        fn on_relocated(&mut self, relocation: &Relocation) {
            self.relocated.push(relocation.plan.destination.clone());
        }
        fn on_pruned(&mut self, dir: &Path) {
            self.pruned.push(dir.to_path_buf());
        }
    }

    #[test]
    fn test_creates_all_category_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("messy");
        let destination = temp_dir.path().join("organized");

        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut SilentListener)
            .expect("organize should succeed");

        assert!(source.is_dir());
        for category in Category::ALL {
            assert!(destination.join(category.dir_name()).is_dir());
        }
        assert_eq!(report.processed(), 0);
    }

    #[test]
    fn test_move_classifies_by_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("messy");
        let destination = temp_dir.path().join("organized");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("photo.JPG"), "img").unwrap();
        fs::write(source.join("setup.sh"), "#!/bin/sh").unwrap();
        fs::write(source.join("LICENSE"), "mit").unwrap();

        let mut listener = RecordingListener::default();
        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut listener)
            .unwrap();

        assert_eq!(report.processed(), 3);
        assert_eq!(listener.relocated.len(), 3);
        assert!(destination.join("images/photo.JPG").is_file());
        assert!(destination.join("executables/setup.sh").is_file());
        assert!(destination.join("others/LICENSE").is_file());
        assert!(!source.join("photo.JPG").exists());
        assert_eq!(report.category_counts.get(&Category::Images), Some(&1));
        assert!(
            report
                .relocated
                .iter()
                .all(|r| r.outcome == RelocationOutcome::Moved)
        );
    }

    #[test]
    fn test_copy_leaves_source_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("messy");
        let destination = temp_dir.path().join("organized");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested/song.mp3"), "la").unwrap();

        let report = organizer(&source, &destination, RelocationMode::Copy)
            .organize(&mut SilentListener)
            .unwrap();

        assert_eq!(report.relocated[0].outcome, RelocationOutcome::Copied);
        assert!(source.join("nested/song.mp3").is_file());
        assert_eq!(
            fs::read_to_string(destination.join("audio/song.mp3")).unwrap(),
            "la"
        );
        assert!(report.pruned_dirs.is_empty());
    }

    #[test]
    fn test_nested_directories_pruned_post_order() {
        let (_temp_dir, root) = workspace();
        let source = root.join("messy");
        let destination = root.join("organized");
        fs::create_dir_all(source.join("a/b/c")).unwrap();
        fs::write(source.join("a/b/c/deep.pdf"), "pdf").unwrap();
        fs::write(source.join("a/top.txt"), "txt").unwrap();

        let mut listener = RecordingListener::default();
        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut listener)
            .unwrap();

        assert!(!source.join("a").exists());
        assert!(source.exists(), "source root itself is kept");
        assert_eq!(
            listener.pruned,
            vec![source.join("a/b/c"), source.join("a/b"), source.join("a")]
        );
        assert_eq!(report.pruned_dirs.len(), 3);
    }

    #[test]
    fn test_hidden_entries_skipped_and_keep_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("messy");
        let destination = temp_dir.path().join("organized");
        fs::create_dir_all(source.join("keep")).unwrap();
        fs::create_dir_all(source.join(".git")).unwrap();
        fs::write(source.join(".git/config.txt"), "x").unwrap();
        fs::write(source.join("keep/.hidden.txt"), "x").unwrap();
        fs::write(source.join("keep/visible.txt"), "x").unwrap();

        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();

        assert_eq!(report.skipped_hidden, 2);
        assert!(source.join(".git/config.txt").is_file());
        assert!(source.join("keep/.hidden.txt").is_file());
        assert!(!source.join("keep/visible.txt").exists());
        assert!(destination.join("documents/visible.txt").is_file());
    }

    #[test]
    fn test_destination_inside_source_not_walked() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("messy");
        let destination = source.join("organized");
        fs::create_dir_all(destination.join("images")).unwrap();
        fs::write(destination.join("images/old.png"), "old").unwrap();
        fs::write(source.join("new.png"), "new").unwrap();

        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();

        assert_eq!(report.processed(), 1);
        assert!(destination.join("images/old.png").is_file());
        assert!(destination.join("images/new.png").is_file());
        assert!(destination.exists());
    }

    // Linux filesystems accept arbitrary bytes in names; APFS rejects them
    #[cfg(target_os = "linux")]
    #[test]
    fn test_colliding_non_utf8_name_keeps_its_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let (_temp_dir, root) = workspace();
        let source = root.join("messy");
        let destination = root.join("organized");
        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(destination.join("images")).unwrap();
        fs::write(source.join(name), "new").unwrap();
        fs::write(destination.join("images").join(name), "old").unwrap();

        let report = organizer(&source, &destination, RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();

        let expected = destination
            .join("images")
            .join(OsStr::from_bytes(b"caf\xe9-1.jpg"));
        assert_eq!(report.relocated.len(), 1);
        assert_eq!(report.relocated[0].plan.destination, expected);
        assert_eq!(fs::read_to_string(&expected).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(destination.join("images").join(name)).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_destination_guard_sees_through_parent_segments() {
        let (_temp_dir, root) = workspace();
        let project = root.join("proj");
        fs::create_dir_all(project.join("sub")).unwrap();
        fs::write(project.join("a.jpg"), "jpg").unwrap();

        let report = organizer(
            &project.join("sub").join(".."),
            &project.join("out"),
            RelocationMode::Move,
        )
        .organize(&mut SilentListener)
        .unwrap();

        assert_eq!(report.processed(), 1);
        assert_eq!(report.category_counts.get(&Category::Images), Some(&1));
        assert!(project.join("out/images/a.jpg").is_file());
        assert!(!project.join("out/images/a-1.jpg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_destination_guard_sees_through_symlinked_source() {
        let (_temp_dir, root) = workspace();
        let project = root.join("proj");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("a.jpg"), "jpg").unwrap();
        let link = root.join("link");
        std::os::unix::fs::symlink(&project, &link).unwrap();

        let report = organizer(&link, &project.join("out"), RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();

        assert_eq!(report.processed(), 1);
        assert!(project.join("out/images/a.jpg").is_file());
        assert!(!project.join("out/images/a-1.jpg").exists());
    }

    #[test]
    fn test_in_place_organization() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::write(root.join("clip.mkv"), "v").unwrap();

        organizer(root, root, RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();
        let second = organizer(root, root, RelocationMode::Move)
            .organize(&mut SilentListener)
            .unwrap();

        assert!(root.join("videos/clip.mkv").is_file());
        assert_eq!(second.processed(), 0);
        // category directories are guarded, never pruned
        assert!(root.join("fonts").is_dir());
    }

    #[test]
    fn test_dry_run_changes_nothing_and_reserves_names() {
        let (_temp_dir, root) = workspace();
        let source = root.join("messy");
        let destination = root.join("organized");
        fs::create_dir_all(source.join("x")).unwrap();
        fs::create_dir_all(source.join("y")).unwrap();
        fs::write(source.join("x/a.jpg"), "1").unwrap();
        fs::write(source.join("y/a.jpg"), "2").unwrap();

        let mut options = OrganizeOptions::new(&source, &destination, RelocationMode::Move);
        options.dry_run = true;
        let report = Organizer::new(StdFileSystem, CategoryTable::default(), options)
            .organize(&mut SilentListener)
            .unwrap();

        assert!(!destination.exists());
        assert!(source.join("x/a.jpg").is_file());
        let planned: Vec<_> = report
            .relocated
            .iter()
            .map(|r| r.plan.destination.clone())
            .collect();
        assert_eq!(
            planned,
            vec![
                destination.join("images/a.jpg"),
                destination.join("images/a-1.jpg")
            ]
        );
        assert!(
            report
                .relocated
                .iter()
                .all(|r| r.outcome == RelocationOutcome::Planned)
        );
    }

    #[test]
    fn test_dry_run_missing_source_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut options = OrganizeOptions::new(
            temp_dir.path().join("nope"),
            temp_dir.path().join("out"),
            RelocationMode::Move,
        );
        options.dry_run = true;

        let result = Organizer::new(StdFileSystem, CategoryTable::default(), options)
            .organize(&mut SilentListener);
        assert!(matches!(result, Err(OrganizeError::InvalidSourcePath { .. })));
    }

    #[test]
    fn test_setup_failure_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("file.txt");
        fs::write(&blocker, "not a dir").unwrap();

        let result = organizer(temp_dir.path(), &blocker.join("organized"), RelocationMode::Move)
            .organize(&mut SilentListener);
        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
    }
}
