//! CLI argument parsing with clap

use crate::config::{Config, ResumeMode};
use clap::Parser;
use std::path::PathBuf;

/// Biblio Sorter - AI-assisted bibliography organization tool
///
/// Reads PDF filenames from a source folder, asks a chat-completions API
/// for title/author/subject, and moves each file into a category folder
/// hierarchy under a deterministic `Author-Title.pdf` name. Every move is
/// journaled so an interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "biblio-sorter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Source folder containing the PDF files to organize
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// API key for the metadata extraction service
    #[arg(short = 'k', long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Resume mode:
    /// - fresh: ignore any prior journal entries (default)
    /// - journal: skip files the journal already records as moved
    /// - plan: resume from a manually supplied plan file
    #[arg(short, long, value_enum)]
    pub resume: Option<ResumeMode>,

    /// Plan file for `--resume plan`
    #[arg(short = 'p', long)]
    pub plan_file: Option<PathBuf>,

    /// Metadata cache file path
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Resume journal file path
    #[arg(long)]
    pub journal_file: Option<PathBuf>,

    /// Model identifier for extraction requests
    #[arg(long)]
    pub model: Option<String>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_sample_config: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(resume) = self.resume {
            config.resume = resume;
        }
        if let Some(ref plan_file) = self.plan_file {
            config.plan_file = Some(plan_file.clone());
        }
        if let Some(ref cache_file) = self.cache_file {
            config.cache_file = Some(cache_file.clone());
        }
        if let Some(ref journal_file) = self.journal_file {
            config.journal_file = Some(journal_file.clone());
        }
        if let Some(ref model) = self.model {
            config.model = model.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
