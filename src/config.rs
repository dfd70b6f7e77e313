//! Configuration types for the bibliography sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How a run treats a prior journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResumeMode {
    /// Fresh run: ignore any prior journal entries
    #[default]
    Fresh,
    /// Resume from the journal next to the source folder
    Journal,
    /// Resume from a manually supplied plan file (see `plan_file`)
    Plan,
}

/// A single category-inference rule
///
/// Files whose extracted subject or title contains one of the keywords
/// (case-insensitive) are placed under `path`. First matching rule wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    /// Destination path relative to the source folder, forward slashes
    pub path: String,
}

/// Configuration for the bibliography sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source folder containing the PDF files to organize
    pub source_dir: PathBuf,

    /// File extensions to process
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Metadata cache file path (defaults to `.biblio_sorter_cache.json`
    /// inside the source folder)
    pub cache_file: Option<PathBuf>,

    /// Resume journal file path (defaults to `.biblio_sorter_journal.jsonl`
    /// inside the source folder)
    pub journal_file: Option<PathBuf>,

    /// Manually supplied plan file for `ResumeMode::Plan`
    pub plan_file: Option<PathBuf>,

    /// Resume mode
    #[serde(default)]
    pub resume: ResumeMode,

    /// Chat-completions endpoint base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model identifier sent with each extraction request
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Category inference rules, checked in order
    #[serde(default)]
    pub categories: Vec<CategoryRule>,

    /// Folder for files no rule matches
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,

    /// Dry run mode - don't actually move files
    #[serde(default)]
    pub dry_run: bool,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".into()]
}

fn default_api_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_model() -> String {
    "deepseek/deepseek-r1-distill-llama-70b:free".into()
}

fn default_timeout_secs() -> u64 {
    45
}

fn default_fallback_category() -> String {
    "Uncategorized".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            extensions: default_extensions(),
            cache_file: None,
            journal_file: None,
            plan_file: None,
            resume: ResumeMode::default(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            categories: vec![],
            fallback_category: default_fallback_category(),
            dry_run: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Check if a file extension should be processed
    pub fn is_supported(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.extensions.iter().any(|e| e.to_lowercase() == ext_lower)
    }

    /// Get cache file path, using default if not specified
    pub fn get_cache_file(&self) -> PathBuf {
        self.cache_file
            .clone()
            .unwrap_or_else(|| self.source_dir.join(".biblio_sorter_cache.json"))
    }

    /// Get journal file path, using default if not specified
    pub fn get_journal_file(&self) -> PathBuf {
        self.journal_file
            .clone()
            .unwrap_or_else(|| self.source_dir.join(".biblio_sorter_journal.jsonl"))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Biblio Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Source folder containing the PDF files to organize
source_dir = "D:/Papers"

# File extensions to process
extensions = ["pdf"]

# Resume mode: "fresh", "journal", or "plan"
# - fresh: ignore any prior journal entries
# - journal: skip files the journal already records as moved
# - plan: resume from a manually supplied plan file (set plan_file)
resume = "fresh"

# Chat-completions endpoint and model used for metadata extraction
api_base_url = "https://openrouter.ai/api/v1"
model = "deepseek/deepseek-r1-distill-llama-70b:free"
timeout_secs = 45

# Folder for files no category rule matches
fallback_category = "Uncategorized"

# Category rules, checked in order. A file whose extracted subject or
# title contains one of the keywords is placed under the rule's path.
[[categories]]
keywords = ["quantum", "relativity", "particle"]
path = "Physics/Quantum"

[[categories]]
keywords = ["physics", "mechanics", "thermodynamics"]
path = "Physics"

[[categories]]
keywords = ["algebra", "topology", "analysis"]
path = "Mathematics"

# Dry run mode - show what would be done without actually doing it
dry_run = false

# Verbose output - show detailed processing information
verbose = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
