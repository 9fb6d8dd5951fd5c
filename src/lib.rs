//! tidytree - sort a directory tree into category folders
//!
//! This library walks a source directory, classifies every file by its
//! extension, moves (or copies) it into a category folder under a destination
//! root without overwriting anything, and removes the source folders it
//! leaves empty.

pub mod cli;
pub mod collision;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod filesystem;
pub mod output;
pub mod samples;

pub use collision::resolve_destination;
pub use config::{CompiledFilters, ConfigError, FallbackTrigger, RelocationMode, TidyConfig};
pub use file_category::{Category, CategoryTable};
pub use file_organizer::{
    OrganizeError, OrganizeListener, OrganizeOptions, OrganizeReport, Organizer, SilentListener,
};
pub use filesystem::{FileSystem, StdFileSystem};

pub use cli::{Cli, run_cli};
