/// File categorization by extension.
///
/// This module maps file extensions to the category folders files are sorted
/// into (e.g., "images", "audio", "documents").
///
/// # Examples
///
/// ```
/// use tidytree::file_category::{Category, CategoryTable};
///
/// let table = CategoryTable::default();
/// assert_eq!(table.classify("PNG"), Category::Images);
/// assert_eq!(table.classify("sh"), Category::Executables);
/// assert_eq!(table.classify(""), Category::Others);
/// ```
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Represents a broad file category.
///
/// Each category owns one subdirectory of the destination root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Image files (JPG, PNG, GIF, etc.)
    Images,
    /// Video files (MP4, MKV, AVI, etc.)
    Videos,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Audio files (MP3, WAV, FLAC, etc.)
    Audio,
    /// Archive files (ZIP, RAR, 7Z, etc.)
    Archives,
    /// Executables and installers (EXE, MSI, SH, etc.)
    Executables,
    /// Font files (TTF, OTF, WOFF, etc.)
    Fonts,
    /// Unknown or uncategorized files
    Others,
}

impl Category {
    /// Every category, in table order.
    pub const ALL: [Category; 8] = [
        Category::Images,
        Category::Videos,
        Category::Documents,
        Category::Audio,
        Category::Archives,
        Category::Executables,
        Category::Fonts,
        Category::Others,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidytree::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Audio.dir_name(), "audio");
    /// assert_eq!(Category::Others.dir_name(), "others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Documents => "documents",
            Category::Audio => "audio",
            Category::Archives => "archives",
            Category::Executables => "executables",
            Category::Fonts => "fonts",
            Category::Others => "others",
        }
    }

    /// Extensions assigned to this category when no configuration overrides them.
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Images => &["jpeg", "jpg", "png", "gif", "webp", "svg"],
            Category::Videos => &["mp4", "mkv", "avi", "mov", "wmv", "webm"],
            Category::Documents => &[
                "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "md",
            ],
            Category::Audio => &["mp3", "wav", "aac", "flac", "wma", "ogg", "m4a"],
            Category::Archives => &["zip", "rar", "7z", "tar", "gz", "bz2", "iso"],
            Category::Executables => &["exe", "msi", "dmg", "app", "bin", "sh", "bat"],
            Category::Fonts => &["ttf", "otf", "woff", "woff2"],
            Category::Others => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Maps lowercase file extensions to categories.
///
/// Built once per run and never mutated afterwards. Construction rejects an
/// extension that appears under more than one category, so lookups never
/// depend on iteration order.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    extension_map: HashMap<String, Category>,
}

impl CategoryTable {
    /// Builds a table from per-category extension lists.
    ///
    /// Extensions are lowercased and stripped of a leading dot. Listing the
    /// same extension twice under one category is harmless; listing it under
    /// two categories is an error. Extensions listed under `others` are
    /// accepted but have no effect, since unmatched extensions land there anyway.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateExtension` when the lists overlap.
    pub fn from_lists<I, S>(lists: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Category, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut extension_map: HashMap<String, Category> = HashMap::new();

        for (category, extensions) in lists {
            for ext in extensions {
                let normalized = normalize_extension(ext.as_ref());
                if normalized.is_empty() {
                    continue;
                }
                match extension_map.get(&normalized) {
                    Some(existing) if *existing != category => {
                        return Err(ConfigError::DuplicateExtension {
                            extension: normalized,
                            first: *existing,
                            second: category,
                        });
                    }
                    _ => {
                        extension_map.insert(normalized, category);
                    }
                }
            }
        }

        Ok(Self { extension_map })
    }

    /// Builds the default table, with `overrides` replacing the extension
    /// list of any category it names.
    pub fn with_overrides(overrides: &HashMap<Category, Vec<String>>) -> Result<Self, ConfigError> {
        let lists = Category::ALL.iter().map(|category| {
            let extensions = match overrides.get(category) {
                Some(custom) => custom.clone(),
                None => category
                    .default_extensions()
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect(),
            };
            (*category, extensions)
        });
        Self::from_lists(lists)
    }

    /// Maps a raw extension to its category.
    ///
    /// Total over all inputs: the lookup is case-insensitive and anything
    /// unknown, including the empty string, is `Category::Others`.
    pub fn classify(&self, extension: &str) -> Category {
        self.extension_map
            .get(&normalize_extension(extension))
            .copied()
            .unwrap_or(Category::Others)
    }

    /// Number of extensions known to the table.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    /// Returns true if no extension is mapped.
    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        // Built-in lists are disjoint (test_default_table_is_disjoint).
        let mut extension_map = HashMap::new();
        for category in Category::ALL {
            for ext in category.default_extensions() {
                extension_map.insert(ext.to_string(), category);
            }
        }
        Self { extension_map }
    }
}

/// Lowercases an extension and drops a leading dot.
fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}
