//! Biblio Sorter - AI-assisted bibliography organization tool
//!
//! This library provides functionality for organizing a folder of PDF
//! files into a category hierarchy:
//! - filename-based metadata extraction via a chat-completions API
//! - an on-disk metadata cache keyed by filename
//! - deterministic `Author-Title.pdf` placement plans
//! - an append-only resume journal replayed on interrupted runs
//! - idempotent plan execution

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod execute;
pub mod extract;
pub mod interactive;
pub mod journal;
pub mod plan;
pub mod process;

pub use cache::MetadataCache;
pub use cli::Cli;
pub use config::{CategoryRule, Config, ConfigError, ResumeMode};
pub use error::{Error, Result};
pub use execute::Executor;
pub use extract::{ExtractedMetadata, Extraction, MetadataExtractor, OpenRouterExtractor};
pub use journal::{JournalEntry, MoveOutcome, PlanEntry, ResumeJournal, ResumeState};
pub use plan::{CategoryStrategy, KeywordCategories, PlanBuilder};
pub use process::{FileResult, ProcessingStatus, Processor, RunStats};
