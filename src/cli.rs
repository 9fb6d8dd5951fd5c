//! Command-line interface module for tidytree.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging command-line flags with the configuration file
//! - Seeding and importing source files
//! - Driving the organizer and reporting progress

use crate::config::{RelocationMode, TidyConfig};
use crate::file_organizer::{
    FileFailure, OrganizeListener, OrganizeOptions, OrganizeReport, Organizer, Relocation,
    RelocationOutcome,
};
use crate::filesystem::StdFileSystem;
use crate::output::OutputFormatter;
use crate::samples;
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// Source directory used when neither the command line nor the config names one.
pub const DEFAULT_SOURCE: &str = "messy-files";
/// Destination directory used when neither the command line nor the config names one.
pub const DEFAULT_DESTINATION: &str = "organized-files";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tidytree")]
#[command(version)]
#[command(
    about = "Sort files into category folders by extension",
    long_about = None
)]
pub struct Cli {
    /// Directory to organize [default: messy-files]
    pub source: Option<PathBuf>,
    /// Directory receiving the category folders [default: organized-files]
    pub destination: Option<PathBuf>,
    /// Copy files instead of moving them
    #[arg(long)]
    pub copy: bool,
    /// Show what would happen without touching any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Configuration file (defaults to .tidytree.toml, then ~/.config/tidytree/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Print the run report as JSON instead of the console summary
    #[arg(long)]
    pub json: bool,
    /// Fill an empty source directory with sample files first
    #[arg(long)]
    pub seed_samples: bool,
    /// Copy this file into the source directory before organizing
    #[arg(long, value_name = "FILE")]
    pub import: Option<PathBuf>,
}

impl Cli {
    /// Merges these flags with `config`; flags win, then the file, then defaults.
    pub fn organize_options(&self, config: &TidyConfig) -> OrganizeOptions {
        let source = self
            .source
            .clone()
            .or_else(|| config.source.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));
        let destination = self
            .destination
            .clone()
            .or_else(|| config.destination.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION));
        let mode = if self.copy {
            RelocationMode::Copy
        } else {
            config.mode.unwrap_or_default()
        };

        OrganizeOptions {
            source_root: source,
            destination_root: destination,
            mode,
            dry_run: self.dry_run,
            fallback_on: config.fallback_triggers(),
        }
    }
}

/// Prints one line per event and ticks the spinner.
struct ConsoleListener {
    spinner: Option<ProgressBar>,
}

impl ConsoleListener {
    fn new(quiet: bool) -> Self {
        let spinner = (!quiet).then(OutputFormatter::create_spinner);
        Self { spinner }
    }

    /// Runs `f` with the spinner hidden; in quiet mode `f` is dropped.
    fn print(&self, f: impl FnOnce()) {
        if let Some(pb) = &self.spinner {
            pb.suspend(f);
        }
    }

    fn finish(&self) {
        if let Some(pb) = &self.spinner {
            pb.finish_and_clear();
        }
    }
}

impl OrganizeListener for ConsoleListener {
    fn on_relocated(&mut self, relocation: &Relocation) {
        let verb = match relocation.outcome {
            RelocationOutcome::Moved => "Moved",
            RelocationOutcome::Copied => "Copied",
            RelocationOutcome::CopiedAndRemoved => "Copied+Removed",
            RelocationOutcome::Planned => "Would relocate",
        };
        let line = format!(
            "{}: {} -> {}",
            verb,
            display_relative(&relocation.plan.source).display(),
            display_relative(&relocation.plan.destination).display()
        );
        self.print(|| {
            if relocation.outcome == RelocationOutcome::Planned {
                OutputFormatter::dry_run_notice(&line)
            } else {
                OutputFormatter::success(&line)
            }
        });
        if let Some(pb) = &self.spinner {
            pb.inc(1);
        }
    }

    fn on_failure(&mut self, failure: &FileFailure) {
        let line = format!(
            "Failed to relocate {}: {}",
            display_relative(&failure.path).display(),
            failure.reason
        );
        match &self.spinner {
            Some(pb) => pb.suspend(|| OutputFormatter::error(&line)),
            // failures always reach stderr, even in --json mode
            None => OutputFormatter::error(&line),
        }
    }

    fn on_pruned(&mut self, dir: &Path) {
        let line = format!("Removed empty folder: {}", display_relative(dir).display());
        self.print(|| OutputFormatter::plain(&line));
    }
}

/// Runs the CLI application with the parsed arguments.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidytree::cli::{run_cli, Cli};
///
/// let cli = Cli::parse_from(["tidytree", "Downloads", "Sorted", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(()) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let config = TidyConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let table = config
        .category_table()
        .map_err(|e| format!("Error in category table: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let options = cli.organize_options(&config);

    prepare_source(cli, &options)?;

    if !cli.json {
        OutputFormatter::info(&format!(
            "Organizing files from {} into {}",
            options.source_root.display(),
            options.destination_root.display()
        ));
    }

    let organizer = Organizer::new(StdFileSystem, table, options).with_filters(filters);
    let mut listener = ConsoleListener::new(cli.json);
    let result = organizer.organize(&mut listener);
    listener.finish();
    let report = result.map_err(|e| e.to_string())?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Error serializing report: {}", e))?;
        println!("{}", json);
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Handles `--seed-samples` and `--import` before the walk starts.
fn prepare_source(cli: &Cli, options: &OrganizeOptions) -> Result<(), String> {
    if !cli.seed_samples && cli.import.is_none() {
        return Ok(());
    }
    if options.dry_run {
        if !cli.json {
            OutputFormatter::dry_run_notice("Skipping sample seeding and import.");
        }
        return Ok(());
    }

    let fs = StdFileSystem;
    if cli.seed_samples {
        let written = samples::seed_samples(&fs, &options.source_root)
            .map_err(|e| format!("Error creating sample files: {}", e))?;
        if !written.is_empty() && !cli.json {
            OutputFormatter::info(&format!(
                "Source directory was empty; created {} sample files in {}",
                written.len(),
                options.source_root.display()
            ));
        }
    }

    if let Some(file) = &cli.import {
        match samples::import_file(&fs, file, &options.source_root) {
            Ok(Some(target)) if !cli.json => OutputFormatter::plain(&format!(
                "Imported {} -> {}",
                file.display(),
                display_relative(&target).display()
            )),
            Ok(Some(_)) => {}
            Ok(None) => OutputFormatter::warning(&format!(
                "Import file not found, skipping: {}",
                file.display()
            )),
            Err(e) => OutputFormatter::error(&format!("Error importing {}: {}", file.display(), e)),
        }
    }
    Ok(())
}

fn print_summary(report: &OrganizeReport) {
    if report.processed() > 0 {
        OutputFormatter::summary_table(&report.category_counts, report.processed());
    }

    if report.skipped_hidden > 0 || report.excluded > 0 {
        OutputFormatter::plain(&format!(
            "Left in place: {} hidden, {} excluded",
            report.skipped_hidden, report.excluded
        ));
    }

    if !report.is_complete_success() {
        OutputFormatter::warning(&format!(
            "{} entries could not be organized. Please review errors above.",
            report.failures.len()
        ));
    }

    if report.dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    } else {
        OutputFormatter::success(&format!("Done. {} files organized.", report.processed()));
    }
}

/// Shortens `path` relative to the working directory when it lies inside it.
fn display_relative(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}
