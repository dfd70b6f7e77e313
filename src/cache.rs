//! On-disk metadata cache
//!
//! Maps original filename to the extracted {title, author, subject} record
//! so repeated runs never re-query the extraction API for a filename they
//! have already resolved. The persisted form is pretty-printed JSON so it
//! can be inspected and hand-edited when troubleshooting.

use crate::error::Result;
use crate::extract::ExtractedMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info, warn};

/// Metadata cache keyed by original filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCache {
    /// Version for cache file format compatibility
    version: u32,

    /// Map of original filename to extracted metadata
    entries: HashMap<String, ExtractedMetadata>,

    /// Last run timestamp
    last_run: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// Current cache file format version
    const VERSION: u32 = 1;

    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            entries: HashMap::new(),
            last_run: None,
        }
    }

    /// Load cache from file
    ///
    /// A missing file yields an empty cache. An unparseable file is warned
    /// about and also yields an empty cache; losing cached answers only
    /// costs extra API calls, never correctness.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(?path, "Cache file does not exist, starting with empty cache");
            return Self::new();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(?path, error = %e, "Failed to open cache file, starting fresh");
                return Self::new();
            }
        };

        let cache: Self = match serde_json::from_reader(BufReader::new(file)) {
            Ok(c) => c,
            Err(e) => {
                warn!(?path, error = %e, "Failed to parse cache file, starting fresh");
                return Self::new();
            }
        };

        if cache.version != Self::VERSION {
            warn!(
                cache_version = cache.version,
                current_version = Self::VERSION,
                "Cache file version mismatch, starting fresh"
            );
            return Self::new();
        }

        info!(entries = cache.entries.len(), "Loaded metadata cache");
        cache
    }

    /// Save cache to file atomically (temp file + rename)
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_run = Some(chrono::Utc::now());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");

        let file = File::create(&temp_path).map_err(|e| {
            crate::error::Error::CacheFile(format!("Failed to create temp cache file: {}", e))
        })?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            crate::error::Error::CacheFile(format!("Failed to write cache file: {}", e))
        })?;

        fs::rename(&temp_path, path).map_err(|e| {
            crate::error::Error::CacheFile(format!("Failed to rename temp cache file: {}", e))
        })?;

        debug!(entries = self.entries.len(), "Saved metadata cache");
        Ok(())
    }

    /// Look up the cached record for a filename
    pub fn lookup(&self, filename: &str) -> Option<&ExtractedMetadata> {
        self.entries.get(filename)
    }

    /// Store a record for a filename; storing twice overwrites silently
    pub fn store(&mut self, filename: impl Into<String>, metadata: ExtractedMetadata) {
        self.entries.insert(filename.into(), metadata);
    }

    /// Get the number of cached entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get last run timestamp
    pub fn last_run(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(title: &str, author: &str) -> ExtractedMetadata {
        ExtractedMetadata {
            title: title.into(),
            author: author.into(),
            subject: None,
        }
    }

    #[test]
    fn test_new_cache_is_empty() {
        let cache = MetadataCache::new();
        assert_eq!(cache.entry_count(), 0);
        assert!(cache.last_run().is_none());
        assert!(cache.lookup("paper.pdf").is_none());
    }

    #[test]
    fn test_store_and_lookup() {
        let mut cache = MetadataCache::new();
        cache.store("paper.pdf", meta("Quantum Theory", "Einstein"));

        let entry = cache.lookup("paper.pdf").unwrap();
        assert_eq!(entry.title, "Quantum Theory");
        assert_eq!(entry.author, "Einstein");
        assert!(cache.lookup("other.pdf").is_none());
    }

    #[test]
    fn test_store_overwrites_silently() {
        let mut cache = MetadataCache::new();
        cache.store("paper.pdf", meta("First", "A"));
        cache.store("paper.pdf", meta("Second", "B"));

        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.lookup("paper.pdf").unwrap().title, "Second");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = MetadataCache::new();
        cache.store("paper.pdf", meta("Quantum Theory", "Einstein"));
        cache.save(&path).unwrap();

        let loaded = MetadataCache::load(&path);
        assert_eq!(loaded.entry_count(), 1);
        assert_eq!(loaded.lookup("paper.pdf").unwrap().author, "Einstein");
        assert!(loaded.last_run().is_some());
    }

    #[test]
    fn test_load_missing_file_yields_empty() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::load(&dir.path().join("nope.json"));
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn test_load_corrupt_file_yields_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json at all").unwrap();

        let cache = MetadataCache::load(&path);
        assert_eq!(cache.entry_count(), 0);
    }
}
