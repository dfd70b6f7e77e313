//! Plan execution: create folders and move files idempotently
//!
//! Applying a plan entry is atomic from the caller's perspective: the file
//! either ends up at the destination (Applied) or stays untouched at the
//! source (Failed). A destination already holding an identical file is
//! reported as SkippedExists so re-runs are idempotent; a destination
//! holding different content gets a numeric suffix instead of a silent
//! overwrite.

use crate::error::Result;
use crate::journal::{MoveOutcome, PlanEntry};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::Xxh3;

/// Applies plan entries under a destination root
pub struct Executor {
    dest_root: PathBuf,
}

impl Executor {
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            dest_root: dest_root.into(),
        }
    }

    /// Apply one plan entry, returning its outcome.
    ///
    /// Never returns Err: every failure mode is folded into
    /// `MoveOutcome::Failed` so the caller can journal it and continue.
    pub fn apply(&self, plan: &PlanEntry) -> MoveOutcome {
        let source = &plan.source_path;

        if !source.exists() {
            return MoveOutcome::Failed(format!(
                "Source file no longer exists: {}",
                source.display()
            ));
        }

        let base_dest = plan.dest_path(&self.dest_root);

        if let Some(parent) = base_dest.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(dest = %parent.display(), error = %e, "Failed to create destination folder");
            return MoveOutcome::Failed(format!(
                "Failed to create destination folder {}: {}",
                parent.display(),
                e
            ));
        }

        let dest = match self.resolve_destination(source, base_dest) {
            Ok(Some(dest)) => dest,
            Ok(None) => return MoveOutcome::SkippedExists,
            Err(reason) => return MoveOutcome::Failed(reason),
        };

        match move_file(source, &dest) {
            Ok(()) => {
                info!(source = %source.display(), dest = %dest.display(), "Moved file");
                MoveOutcome::Applied
            }
            Err(e) => {
                warn!(source = %source.display(), dest = %dest.display(), error = %e, "Move failed");
                MoveOutcome::Failed(e.to_string())
            }
        }
    }

    /// Decide the final destination path.
    ///
    /// Returns `Ok(None)` when the destination already holds a file with
    /// identical content; otherwise resolves name collisions with a
    /// numeric suffix.
    fn resolve_destination(
        &self,
        source: &Path,
        base_dest: PathBuf,
    ) -> std::result::Result<Option<PathBuf>, String> {
        if !base_dest.exists() {
            return Ok(Some(base_dest));
        }

        match (content_hash(source), content_hash(&base_dest)) {
            (Ok(src), Ok(dst)) if src == dst => {
                debug!(
                    dest = %base_dest.display(),
                    "Destination already holds identical content, skipping"
                );
                return Ok(None);
            }
            (Err(e), _) | (_, Err(e)) => {
                // Can't compare content; fall through to suffixing rather
                // than risking an overwrite
                debug!(error = %e, "Content comparison failed, resolving by suffix");
            }
            _ => {}
        }

        resolve_filename_conflict(base_dest)
            .map(Some)
            .map_err(|e| e.to_string())
    }
}

/// Resolve filename conflicts by adding a numeric suffix
fn resolve_filename_conflict(mut path: PathBuf) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path);
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| crate::error::Error::Config("Invalid filename".into()))?
        .to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let parent = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();

    for i in 1..10000 {
        let new_name = format!("{}_{}{}", stem, i, extension);
        path = parent.join(new_name);
        if !path.exists() {
            return Ok(path);
        }
    }

    Err(crate::error::Error::Config(
        "Could not resolve filename conflict".into(),
    ))
}

/// Move a file: rename first, copy + delete fallback for cross-device moves.
///
/// On any fallback failure the destination copy is removed, so a failed
/// move always leaves exactly one file, untouched at the source.
fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    if let Err(e) = copy_file(source, dest) {
        let _ = fs::remove_file(dest);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(source) {
        // Keep the source authoritative rather than leaving two copies
        let _ = fs::remove_file(dest);
        return Err(e);
    }

    Ok(())
}

/// Copy file with buffered I/O
fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()
}

/// Full-content xxHash3 of a file, streamed
pub fn content_hash(path: &Path) -> std::io::Result<u64> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(256 * 1024, file);
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; 256 * 1024];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn plan_for(source: &Path, folder: &[&str], filename: &str) -> PlanEntry {
        PlanEntry {
            source_path: source.to_path_buf(),
            dest_folder: folder.iter().map(|s| s.to_string()).collect(),
            dest_filename: filename.to_string(),
        }
    }

    #[test]
    fn test_apply_creates_folders_and_moves() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper1.pdf");
        fs::write(&source, b"pdf bytes").unwrap();

        let executor = Executor::new(dir.path());
        let plan = plan_for(&source, &["Physics", "Quantum"], "Einstein-QuantumTheory.pdf");

        assert_eq!(executor.apply(&plan), MoveOutcome::Applied);
        assert!(!source.exists());

        let dest = dir.path().join("Physics/Quantum/Einstein-QuantumTheory.pdf");
        assert_eq!(fs::read(&dest).unwrap(), b"pdf bytes");
    }

    #[test]
    fn test_identical_destination_is_skipped() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper1.pdf");
        fs::write(&source, b"same bytes").unwrap();

        let dest_dir = dir.path().join("Physics");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("A-T.pdf"), b"same bytes").unwrap();

        let executor = Executor::new(dir.path());
        let plan = plan_for(&source, &["Physics"], "A-T.pdf");

        assert_eq!(executor.apply(&plan), MoveOutcome::SkippedExists);
        // Source is untouched on skip
        assert!(source.exists());
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper1.pdf");
        fs::write(&source, b"new content").unwrap();

        let dest_dir = dir.path().join("Physics");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::write(dest_dir.join("A-T.pdf"), b"old different content").unwrap();

        let executor = Executor::new(dir.path());
        let plan = plan_for(&source, &["Physics"], "A-T.pdf");

        assert_eq!(executor.apply(&plan), MoveOutcome::Applied);
        assert_eq!(
            fs::read(dest_dir.join("A-T.pdf")).unwrap(),
            b"old different content"
        );
        assert_eq!(fs::read(dest_dir.join("A-T_1.pdf")).unwrap(), b"new content");
    }

    #[test]
    fn test_missing_source_fails_without_touching_anything() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("gone.pdf");

        let executor = Executor::new(dir.path());
        let plan = plan_for(&source, &["Physics"], "A-T.pdf");

        assert!(matches!(executor.apply(&plan), MoveOutcome::Failed(_)));
        assert!(!dir.path().join("Physics/A-T.pdf").exists());
    }

    #[test]
    fn test_reapply_after_move_is_failed_not_destructive() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper1.pdf");
        fs::write(&source, b"bytes").unwrap();

        let executor = Executor::new(dir.path());
        let plan = plan_for(&source, &["Physics"], "A-T.pdf");

        assert_eq!(executor.apply(&plan), MoveOutcome::Applied);
        // Second apply: source is gone, destination untouched
        assert!(matches!(executor.apply(&plan), MoveOutcome::Failed(_)));
        assert_eq!(fs::read(dir.path().join("Physics/A-T.pdf")).unwrap(), b"bytes");
    }

    #[test]
    fn test_failed_fallback_never_leaves_two_copies() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("paper1.pdf");
        fs::write(&source, b"bytes").unwrap();

        // Destination parent is missing, so rename and the copy fallback
        // both fail; the invariant is one file, still at the source
        let dest = dir.path().join("missing-folder/A-T.pdf");
        assert!(move_file(&source, &dest).is_err());
        assert!(source.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_content_hash_matches_for_equal_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"test content").unwrap();
        fs::write(&b, b"test content").unwrap();

        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());

        fs::write(&b, b"other content").unwrap();
        assert_ne!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }
}
