//! Run configuration and file exclusion rules.
//!
//! This module loads the organizer's settings from a TOML file and compiles
//! the exclusion rules applied to every file the walk encounters:
//! - Exact filename matching
//! - File extension matching
//! - Glob pattern matching (against the path relative to the source root)
//! - Regex pattern matching (against the file name)
//!
//! # Configuration File Format
//!
//! ```toml
//! source = "messy-files"
//! destination = "organized-files"
//! mode = "move"
//! fallback_on = ["cross-device", "permission-denied"]
//!
//! [categories]
//! images = ["jpg", "jpeg", "png", "heic"]
//!
//! [exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["**/node_modules/**"]
//! extensions = ["part", "crdownload"]
//! regex = []
//! ```

use crate::file_category::{Category, CategoryTable};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".tidytree.toml";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// The same extension was assigned to two categories.
    DuplicateExtension {
        extension: String,
        first: Category,
        second: Category,
    },
    /// IO error while reading configuration.
    IoError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::DuplicateExtension {
                extension,
                first,
                second,
            } => write!(
                f,
                "Extension '{}' is listed under both '{}' and '{}'",
                extension, first, second
            ),
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Whether files are moved out of the source tree or copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    #[default]
    Move,
    Copy,
}

impl fmt::Display for RelocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocationMode::Move => f.write_str("move"),
            RelocationMode::Copy => f.write_str("copy"),
        }
    }
}

/// A rename failure that makes a move fall back to copy-then-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackTrigger {
    /// Source and destination live on different filesystems (EXDEV).
    CrossDevice,
    /// The rename was refused for permission reasons (EPERM/EACCES).
    PermissionDenied,
}

impl FallbackTrigger {
    /// Triggers used when the configuration names none.
    pub const DEFAULT: [FallbackTrigger; 2] = [
        FallbackTrigger::CrossDevice,
        FallbackTrigger::PermissionDenied,
    ];

    /// Returns true if `err` is the failure this trigger stands for.
    pub fn matches(&self, err: &io::Error) -> bool {
        match self {
            FallbackTrigger::CrossDevice => err.kind() == io::ErrorKind::CrossesDevices,
            FallbackTrigger::PermissionDenied => err.kind() == io::ErrorKind::PermissionDenied,
        }
    }
}

/// Settings read from a configuration file.
///
/// Every field is optional; command-line arguments override whatever is
/// set here and built-in defaults fill the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TidyConfig {
    /// Directory to organize.
    pub source: Option<PathBuf>,
    /// Directory that receives the category folders.
    pub destination: Option<PathBuf>,
    /// Move (default) or copy.
    pub mode: Option<RelocationMode>,
    /// Rename failures that fall back to copy+delete.
    pub fallback_on: Option<Vec<FallbackTrigger>>,
    /// Per-category extension lists replacing the built-in ones.
    pub categories: CategoryOverrides,
    /// Files left where they are.
    pub exclude: ExcludeRules,
}

/// Extension lists from the `[categories]` table.
///
/// A category left out keeps its built-in list. Unknown category names are
/// rejected when parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryOverrides {
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub documents: Option<Vec<String>>,
    pub audio: Option<Vec<String>>,
    pub archives: Option<Vec<String>>,
    pub executables: Option<Vec<String>>,
    pub fonts: Option<Vec<String>>,
    pub others: Option<Vec<String>>,
}

impl CategoryOverrides {
    /// The list configured for `category`, if any.
    pub fn get(&self, category: Category) -> Option<&Vec<String>> {
        match category {
            Category::Images => self.images.as_ref(),
            Category::Videos => self.videos.as_ref(),
            Category::Documents => self.documents.as_ref(),
            Category::Audio => self.audio.as_ref(),
            Category::Archives => self.archives.as_ref(),
            Category::Executables => self.executables.as_ref(),
            Category::Fonts => self.fonts.as_ref(),
            Category::Others => self.others.as_ref(),
        }
    }

    /// Collects the configured lists keyed by category.
    pub fn to_map(&self) -> HashMap<Category, Vec<String>> {
        Category::ALL
            .iter()
            .filter_map(|category| self.get(*category).map(|list| (*category, list.clone())))
            .collect()
    }
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db", "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "**/node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "part", "crdownload").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns to exclude (for advanced users).
    #[serde(default)]
    pub regex: Vec<String>,
}

impl TidyConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tidytree.toml` in the current directory
    /// 3. Look for `~/.config/tidytree/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read, or if any discovered file fails to parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("tidytree")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if TOML parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Build the extension table, validating that no extension is listed twice.
    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        CategoryTable::with_overrides(&self.categories.to_map())
    }

    /// Configured fallback triggers, or the defaults.
    pub fn fallback_triggers(&self) -> Vec<FallbackTrigger> {
        match &self.fallback_on {
            Some(triggers) => triggers.clone(),
            None => FallbackTrigger::DEFAULT.to_vec(),
        }
    }

    /// Compile the exclusion rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.exclude)
    }
}

/// Compiled exclusion rules, ready for per-file matching.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    /// Create compiled filters from exclusion rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Check if a file must be left in place.
    ///
    /// `relative_path` is the file's path relative to the source root; glob
    /// patterns are matched against it. Name, extension and regex rules look
    /// at the final component only.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return true;
        }

        if let Some(ext) = relative_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return true;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}
