//! Append-only resume journal
//!
//! Every planned move and its outcome is appended as one complete JSON
//! object per line. On resume the journal, not the filesystem, is
//! authoritative: a filename whose last recorded outcome is terminal
//! (Applied or SkippedExists) is excluded from the candidate set entirely,
//! while a Failed filename is re-attempted. Because each entry is a single
//! flushed line, a run killed mid-append leaves every prior line parseable.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Planned placement for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Full path of the file at its original location
    pub source_path: PathBuf,
    /// Destination folder as path segments relative to the source folder
    pub dest_folder: Vec<String>,
    /// New filename at the destination
    pub dest_filename: String,
}

impl PlanEntry {
    /// Original filename this entry was planned for
    pub fn source_filename(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Resolve the full destination path under the given root
    pub fn dest_path(&self, root: &Path) -> PathBuf {
        let mut dest = root.to_path_buf();
        for segment in &self.dest_folder {
            dest.push(segment);
        }
        dest.push(&self.dest_filename);
        dest
    }
}

/// Outcome of applying one plan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "kebab-case")]
pub enum MoveOutcome {
    /// File was moved to its destination
    Applied,
    /// Destination already holds an identical file
    SkippedExists,
    /// Move failed; file remains at the source
    Failed(String),
}

impl MoveOutcome {
    /// Terminal outcomes are not re-attempted on resume
    pub fn is_terminal(&self) -> bool {
        matches!(self, MoveOutcome::Applied | MoveOutcome::SkippedExists)
    }
}

/// One journal line: a plan entry plus what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub plan: PlanEntry,
    pub outcome: MoveOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(plan: PlanEntry, outcome: MoveOutcome) -> Self {
        Self {
            plan,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only journal file handle
pub struct ResumeJournal {
    path: PathBuf,
    file: File,
}

impl ResumeJournal {
    /// Open (or create) the journal for appending
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::JournalFile(format!("Failed to open journal: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one entry as a complete, flushed JSON line
    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| Error::JournalFile(format!("Failed to append journal entry: {}", e)))?;

        debug!(
            source = %entry.plan.source_path.display(),
            outcome = ?entry.outcome,
            "Journaled move outcome"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Load prior entries from a journal file.
///
/// Returns the parsed entries in file order plus the count of malformed
/// lines, which are skipped with a warning and treated as absent.
pub fn load_prior(path: &Path) -> Result<(Vec<JournalEntry>, usize)> {
    if !path.exists() {
        debug!(?path, "Journal file does not exist");
        return Ok((Vec::new(), 0));
    }

    let file = File::open(path)
        .map_err(|e| Error::JournalFile(format!("Failed to read journal: {}", e)))?;

    let mut entries = Vec::new();
    let mut malformed = 0usize;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::JournalFile(format!("Failed to read journal: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(?path, line = line_no + 1, error = %e, "Skipping malformed journal line");
                malformed += 1;
            }
        }
    }

    info!(
        entries = entries.len(),
        malformed, "Loaded prior journal entries"
    );
    Ok((entries, malformed))
}

/// Parse a manually supplied plan file into journal entries.
///
/// Accepts either a JSON array of entries or the journal's own JSON Lines
/// format, so a prior journal can be handed back verbatim. Array parse
/// failures are fatal (the operator named the file explicitly); malformed
/// lines in the line format are skipped like journal corruption.
pub fn load_plan_file(path: &Path) -> Result<(Vec<JournalEntry>, usize)> {
    let content = fs::read_to_string(path).map_err(|e| Error::PlanFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let entries: Vec<JournalEntry> =
            serde_json::from_str(trimmed).map_err(|e| Error::PlanFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        return Ok((entries, 0));
    }

    let mut entries = Vec::new();
    let mut malformed = 0usize;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(?path, line = line_no + 1, error = %e, "Skipping malformed plan line");
                malformed += 1;
            }
        }
    }

    if entries.is_empty() && malformed > 0 {
        return Err(Error::PlanFile {
            path: path.to_path_buf(),
            message: "no parseable entries".into(),
        });
    }

    Ok((entries, malformed))
}

/// Resume state distilled from prior entries
#[derive(Debug, Default)]
pub struct ResumeState {
    /// Filenames whose last recorded outcome is terminal
    terminal: HashSet<String>,
    /// Number of prior entries considered
    pub prior_entries: usize,
    /// Malformed lines encountered while loading
    pub malformed_lines: usize,
}

impl ResumeState {
    /// Build resume state from prior entries; the last entry per source
    /// filename wins, so a Failed attempt followed by an Applied retry is
    /// treated as done.
    pub fn from_entries(entries: &[JournalEntry], malformed_lines: usize) -> Self {
        let mut last: HashMap<String, &MoveOutcome> = HashMap::new();
        for entry in entries {
            last.insert(entry.plan.source_filename(), &entry.outcome);
        }

        let terminal = last
            .into_iter()
            .filter(|(_, outcome)| outcome.is_terminal())
            .map(|(name, _)| name)
            .collect();

        Self {
            terminal,
            prior_entries: entries.len(),
            malformed_lines,
        }
    }

    /// Whether a filename is already settled and must be excluded from the
    /// candidate set
    pub fn is_settled(&self, filename: &str) -> bool {
        self.terminal.contains(filename)
    }

    pub fn settled_count(&self) -> usize {
        self.terminal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn plan(name: &str) -> PlanEntry {
        PlanEntry {
            source_path: PathBuf::from("/papers").join(name),
            dest_folder: vec!["Physics".into(), "Quantum".into()],
            dest_filename: format!("Author-{}", name),
        }
    }

    #[test]
    fn test_dest_path_joins_segments() {
        let entry = plan("a.pdf");
        assert_eq!(
            entry.dest_path(Path::new("/papers")),
            PathBuf::from("/papers/Physics/Quantum/Author-a.pdf")
        );
        assert_eq!(entry.source_filename(), "a.pdf");
    }

    #[test]
    fn test_append_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let mut journal = ResumeJournal::open(&path).unwrap();
        journal
            .append(&JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied))
            .unwrap();
        journal
            .append(&JournalEntry::new(
                plan("b.pdf"),
                MoveOutcome::Failed("disk full".into()),
            ))
            .unwrap();
        drop(journal);

        let (entries, malformed) = load_prior(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(malformed, 0);
        assert_eq!(entries[0].outcome, MoveOutcome::Applied);
        assert_eq!(entries[1].outcome, MoveOutcome::Failed("disk full".into()));
    }

    #[test]
    fn test_load_prior_missing_file() {
        let dir = tempdir().unwrap();
        let (entries, malformed) = load_prior(&dir.path().join("nope.jsonl")).unwrap();
        assert!(entries.is_empty());
        assert_eq!(malformed, 0);
    }

    #[test]
    fn test_malformed_lines_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let good = serde_json::to_string(&JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied))
            .unwrap();
        fs::write(&path, format!("{}\n{{truncated garbage\n", good)).unwrap();

        let (entries, malformed) = load_prior(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(malformed, 1);
    }

    #[test]
    fn test_resume_state_filters_terminal() {
        let entries = vec![
            JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied),
            JournalEntry::new(plan("b.pdf"), MoveOutcome::Failed("api error".into())),
            JournalEntry::new(plan("c.pdf"), MoveOutcome::SkippedExists),
        ];

        let state = ResumeState::from_entries(&entries, 0);
        assert!(state.is_settled("a.pdf"));
        assert!(!state.is_settled("b.pdf"));
        assert!(state.is_settled("c.pdf"));
        assert!(!state.is_settled("never-seen.pdf"));
        assert_eq!(state.settled_count(), 2);
    }

    #[test]
    fn test_resume_state_last_entry_wins() {
        let entries = vec![
            JournalEntry::new(plan("a.pdf"), MoveOutcome::Failed("transient".into())),
            JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied),
        ];

        let state = ResumeState::from_entries(&entries, 0);
        assert!(state.is_settled("a.pdf"));
    }

    #[test]
    fn test_plan_file_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");

        let entries = vec![
            JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied),
            JournalEntry::new(plan("b.pdf"), MoveOutcome::Failed("x".into())),
        ];
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let (loaded, malformed) = load_plan_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(malformed, 0);

        let state = ResumeState::from_entries(&loaded, malformed);
        assert!(state.is_settled("a.pdf"));
        assert!(!state.is_settled("b.pdf"));
    }

    #[test]
    fn test_plan_file_unparseable_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, "{nonsense").unwrap();
        assert!(load_plan_file(&path).is_err());
    }

    #[test]
    fn test_journal_survives_trailing_partial_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");

        let good = serde_json::to_string(&JournalEntry::new(plan("a.pdf"), MoveOutcome::Applied))
            .unwrap();
        // Simulate a crash mid-append: last line truncated
        fs::write(&path, format!("{}\n{{\"plan\":{{\"source", good)).unwrap();

        let (entries, malformed) = load_prior(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(malformed, 1);
    }
}
