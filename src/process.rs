//! Main processing pipeline
//!
//! Handles the core logic of:
//! - Scanning the source folder
//! - Resolving metadata through the cache or the remote extractor
//! - Building a placement plan per file
//! - Applying moves and journaling every outcome
//!
//! Processing is strictly sequential: one file is extracted, planned and
//! executed at a time, and its journal line is written before the next file
//! is touched, so an interrupted run leaves a journal consistent with the
//! filesystem up to the last completed move.

use crate::cache::MetadataCache;
use crate::config::{Config, ResumeMode};
use crate::error::{Error, Result};
use crate::execute::Executor;
use crate::extract::{ExtractedMetadata, Extraction, MetadataExtractor};
use crate::journal::{self, JournalEntry, MoveOutcome, PlanEntry, ResumeJournal, ResumeState};
use crate::plan::PlanBuilder;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Lifecycle of one discovered file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Discovered, nothing resolved yet
    Pending,
    /// Metadata resolved (cache hit or extraction success)
    Extracted,
    /// Placement plan built
    Planned,
    /// Terminal: file is at its destination (or identical copy exists)
    Moved,
    /// Terminal: extraction or move failed, file remains at source
    Failed,
}

/// Per-file record carried through the pipeline
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub original_filename: String,
    pub source_path: PathBuf,
    pub metadata: Option<ExtractedMetadata>,
    pub status: RecordStatus,
}

impl FileRecord {
    fn new(source_path: PathBuf) -> Self {
        let original_filename = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            original_filename,
            source_path,
            metadata: None,
            status: RecordStatus::Pending,
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source file path
    pub source: PathBuf,
    /// Destination path relative to the source folder (if planned)
    pub destination: Option<PathBuf>,
    /// Processing status
    pub status: ProcessingStatus,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Status of file processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// File was moved to its destination
    Applied,
    /// Destination already held an identical file
    SkippedExists,
    /// Journal already records this file as settled
    Resumed,
    /// Extraction or move failed
    Failed,
    /// Dry run - would have moved
    DryRun,
}

/// Processing statistics for the run summary
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub total_files: usize,
    pub applied: usize,
    pub skipped: usize,
    pub resumed: usize,
    pub failed: usize,
    /// Moves a dry run would have performed
    pub planned: usize,
    pub cache_hits: usize,
    pub malformed_journal_lines: usize,
}

impl RunStats {
    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Applied: {}, Skipped: {}, Resumed: {}, Failed: {}, Planned: {}, Cache hits: {}",
            self.total_files,
            self.applied,
            self.skipped,
            self.resumed,
            self.failed,
            self.planned,
            self.cache_hits
        )
    }
}

/// Main processor for organizing bibliography files
pub struct Processor {
    config: Config,
    cache: MetadataCache,
    cache_path: PathBuf,
    resume_state: ResumeState,
    extractor: Box<dyn MetadataExtractor>,
    plan_builder: PlanBuilder,
    executor: Executor,
    stats: RunStats,
}

impl Processor {
    /// Create a new processor with the given configuration and extractor
    pub fn new(config: Config, extractor: Box<dyn MetadataExtractor>) -> Result<Self> {
        if !config.source_dir.is_dir() {
            return Err(Error::SourceDir {
                path: config.source_dir.clone(),
            });
        }

        let cache_path = config.get_cache_file();
        let cache = MetadataCache::load(&cache_path);

        let resume_state = match config.resume {
            ResumeMode::Fresh => ResumeState::default(),
            ResumeMode::Journal => {
                let (entries, malformed) = journal::load_prior(&config.get_journal_file())?;
                ResumeState::from_entries(&entries, malformed)
            }
            ResumeMode::Plan => {
                let plan_path = config.plan_file.clone().ok_or_else(|| {
                    Error::Config("Resume mode 'plan' requires a plan file".into())
                })?;
                let (entries, malformed) = journal::load_plan_file(&plan_path)?;
                ResumeState::from_entries(&entries, malformed)
            }
        };

        if resume_state.settled_count() > 0 {
            info!(
                settled = resume_state.settled_count(),
                prior_entries = resume_state.prior_entries,
                "Resuming: journal-settled files will be skipped"
            );
        }

        let plan_builder = PlanBuilder::from_config(&config);
        let executor = Executor::new(&config.source_dir);

        Ok(Self {
            config,
            cache,
            cache_path,
            resume_state,
            extractor,
            plan_builder,
            executor,
            stats: RunStats::default(),
        })
    }

    /// Run the processing pipeline
    pub fn run(&mut self) -> Result<Vec<FileResult>> {
        let _span = span!(Level::INFO, "processor_run").entered();

        info!(source = %self.config.source_dir.display(), "Scanning source folder");
        let files = self.collect_files()?;
        info!(count = files.len(), "Found candidate files");

        self.stats.total_files = files.len();
        self.stats.malformed_journal_lines = self.resume_state.malformed_lines;

        if files.is_empty() {
            info!("No files to process");
            return Ok(Vec::new());
        }

        let mut journal = ResumeJournal::open(&self.config.get_journal_file())?;
        let mut results = Vec::with_capacity(files.len());

        for path in files {
            let record = FileRecord::new(path);

            if self.resume_state.is_settled(&record.original_filename) {
                debug!(file = %record.original_filename, "Journal records file as settled, skipping");
                self.stats.resumed += 1;
                results.push(FileResult {
                    source: record.source_path,
                    destination: None,
                    status: ProcessingStatus::Resumed,
                    error: None,
                });
                continue;
            }

            results.push(self.process_file(record, &mut journal)?);
        }

        // Final flush; stores happen incrementally but last_run is stamped here
        if let Err(e) = self.cache.save(&self.cache_path) {
            warn!(error = %e, "Failed to save metadata cache");
        }

        info!("{}", self.stats.summary());
        Ok(results)
    }

    /// Process one file through extract -> plan -> execute -> journal
    fn process_file(
        &mut self,
        mut record: FileRecord,
        journal: &mut ResumeJournal,
    ) -> Result<FileResult> {
        let _span = span!(Level::DEBUG, "process_file", file = %record.original_filename).entered();

        // Resolve metadata: cache first, extractor on miss
        let metadata = match self.cache.lookup(&record.original_filename) {
            Some(cached) => {
                debug!(file = %record.original_filename, "Using cached metadata");
                self.stats.cache_hits += 1;
                cached.clone()
            }
            None => match self.extractor.extract(&record.original_filename) {
                Extraction::Success(metadata) => {
                    // Cache write precedes the state advance so cache and
                    // record never diverge
                    self.cache
                        .store(record.original_filename.clone(), metadata.clone());
                    if let Err(e) = self.cache.save(&self.cache_path) {
                        warn!(error = %e, "Failed to flush metadata cache");
                    }
                    metadata
                }
                Extraction::Failure { reason } => {
                    warn!(file = %record.original_filename, %reason, "Extraction failed");
                    record.status = RecordStatus::Failed;

                    if !self.config.dry_run {
                        let plan = PlanEntry {
                            source_path: record.source_path.clone(),
                            dest_folder: Vec::new(),
                            dest_filename: record.original_filename.clone(),
                        };
                        journal
                            .append(&JournalEntry::new(plan, MoveOutcome::Failed(reason.clone())))?;
                    }

                    self.stats.failed += 1;
                    return Ok(FileResult {
                        source: record.source_path,
                        destination: None,
                        status: ProcessingStatus::Failed,
                        error: Some(reason),
                    });
                }
            },
        };

        record.metadata = Some(metadata.clone());
        record.status = RecordStatus::Extracted;

        let plan = self.plan_builder.build(&record.source_path, &metadata);
        record.status = RecordStatus::Planned;

        let relative_dest = plan.dest_path(Path::new(""));

        if self.config.dry_run {
            info!(
                source = %record.source_path.display(),
                dest = %relative_dest.display(),
                "Would move file"
            );
            self.stats.planned += 1;
            return Ok(FileResult {
                source: record.source_path,
                destination: Some(relative_dest),
                status: ProcessingStatus::DryRun,
                error: None,
            });
        }

        let outcome = self.executor.apply(&plan);
        // Log-then-continue: the outcome is journaled before the next file
        journal.append(&JournalEntry::new(plan, outcome.clone()))?;

        let result = match outcome {
            MoveOutcome::Applied => {
                record.status = RecordStatus::Moved;
                self.stats.applied += 1;
                FileResult {
                    source: record.source_path,
                    destination: Some(relative_dest),
                    status: ProcessingStatus::Applied,
                    error: None,
                }
            }
            MoveOutcome::SkippedExists => {
                record.status = RecordStatus::Moved;
                self.stats.skipped += 1;
                FileResult {
                    source: record.source_path,
                    destination: Some(relative_dest),
                    status: ProcessingStatus::SkippedExists,
                    error: None,
                }
            }
            MoveOutcome::Failed(reason) => {
                record.status = RecordStatus::Failed;
                self.stats.failed += 1;
                FileResult {
                    source: record.source_path,
                    destination: Some(relative_dest),
                    status: ProcessingStatus::Failed,
                    error: Some(reason),
                }
            }
        };

        Ok(result)
    }

    /// Collect candidate files from the source folder (top level only),
    /// sorted by filename so discovery order is stable across runs
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.source_dir)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            // The cache and journal live in the source folder
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.starts_with('.')
            {
                continue;
            }

            if let Some(ext) = path.extension().and_then(|e| e.to_str())
                && self.config.is_supported(ext)
            {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Get processing statistics
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}
