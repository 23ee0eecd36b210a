//! Persistent discovery cache for encrypted files.
//!
//! The cache lets the shell populate its sidebar without re-walking the
//! filesystem on every launch. It is a disposable index: any malformed or
//! stale on-disk document simply yields an empty cache, and every entry is
//! re-validated against the live filesystem (exists, mtime matches, size
//! matches) before it is served.
//!
//! Scanning is a cooperative job — one directory per step — so a UI driving
//! it at ~100 ms ticks stays responsive. The pacing is part of the contract:
//! the job exposes visited/queued counts for progress reporting.

use crate::constants::{CACHE_MAX_AGE_DAYS, ENCRYPTED_SUFFIX, SCAN_EXCLUDED_DIRS};
use crate::errors::CacheError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// One observed encrypted file, with freshness validators.
///
/// An entry is valid iff the filesystem currently reports an existing
/// regular file at `path` whose modification time and size match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute path of the encrypted file.
    pub path: PathBuf,
    /// Modification time at observation, in epoch seconds.
    #[serde(rename = "lastModified")]
    pub last_modified: i64,
    /// Size at observation, in bytes.
    pub size: u64,
}

impl CacheEntry {
    /// Stats `path` and builds an entry, or `None` if it is not a regular
    /// file.
    pub fn observe(path: &Path) -> Option<CacheEntry> {
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        Some(CacheEntry {
            path: path.to_path_buf(),
            last_modified: epoch_secs(metadata.modified().ok()?),
            size: metadata.len(),
        })
    }

    /// The freshness predicate: `exists ∧ mtime matches ∧ size matches`.
    pub fn is_valid(&self) -> bool {
        let Ok(metadata) = fs::metadata(&self.path) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        epoch_secs(modified) == self.last_modified && metadata.len() == self.size
    }
}

/// On-disk document shape: a write timestamp plus the entry array.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    timestamp: i64,
    entries: Vec<CacheEntry>,
}

/// The in-memory cache plus its on-disk location.
///
/// # Examples
///
/// ```no_run
/// use secview::cache::FileCache;
/// use std::path::{Path, PathBuf};
///
/// let mut cache = FileCache::load(PathBuf::from("/data/secview/file_cache.json"));
/// cache.observe(Path::new("/home/user/photo.senc"));
/// let hits = cache.query(Path::new("/home/user"));
/// if let Err(e) = cache.save() {
///     // Cache errors are non-fatal by policy.
///     eprintln!("cache save failed: {}", e);
/// }
/// ```
#[derive(Debug)]
pub struct FileCache {
    cache_path: PathBuf,
    entries: HashMap<PathBuf, CacheEntry>,
}

impl FileCache {
    /// Loads the cache document at `cache_path`.
    ///
    /// Never fails: a missing, unreadable, or malformed document — or one
    /// older than the retention window — yields an empty cache. Entries
    /// whose freshness predicate no longer holds are dropped silently.
    pub fn load(cache_path: PathBuf) -> FileCache {
        let mut cache = FileCache {
            cache_path,
            entries: HashMap::new(),
        };

        let raw = match fs::read_to_string(&cache.cache_path) {
            Ok(raw) => raw,
            Err(_) => return cache,
        };
        let document: CacheDocument = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                debug!("Discarding malformed cache document: {}", e);
                return cache;
            }
        };

        let age_secs = Utc::now().timestamp() - document.timestamp;
        if age_secs > CACHE_MAX_AGE_DAYS * 86_400 {
            debug!("Discarding cache document older than the retention window");
            return cache;
        }

        for entry in document.entries {
            if entry.is_valid() {
                cache.entries.insert(entry.path.clone(), entry);
            }
        }
        debug!("Loaded {} valid cache entries", cache.entries.len());
        cache
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns every cached path under `root` that is still valid.
    ///
    /// A non-empty result lets the caller skip a fresh scan.
    pub fn query(&self, root: &Path) -> Vec<PathBuf> {
        let mut hits: Vec<PathBuf> = self
            .entries
            .values()
            .filter(|entry| entry.path.starts_with(root) && entry.is_valid())
            .map(|entry| entry.path.clone())
            .collect();
        hits.sort();
        hits
    }

    /// Records an externally reported file, replacing any prior entry.
    pub fn observe(&mut self, path: &Path) {
        if let Some(entry) = CacheEntry::observe(path) {
            self.entries.insert(entry.path.clone(), entry);
        }
    }

    /// Drops a path in response to an externally reported removal.
    pub fn forget(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    /// Empties the cache in memory and on disk.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.save()
    }

    /// Atomically replaces the on-disk document (write-then-rename).
    pub fn save(&self) -> Result<(), CacheError> {
        let document = CacheDocument {
            timestamp: Utc::now().timestamp(),
            entries: self.entries.values().cloned().collect(),
        };
        let serialized = serde_json::to_vec_pretty(&document)?;

        let parent = self
            .cache_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).map_err(|e| CacheError::Io {
            path: self.cache_path.clone(),
            source: e,
        })?;

        // Temp file in the same directory so the rename stays on one
        // filesystem.
        let mut staged = tempfile::NamedTempFile::new_in(&parent).map_err(|e| CacheError::Io {
            path: self.cache_path.clone(),
            source: e,
        })?;
        staged.write_all(&serialized).map_err(|e| CacheError::Io {
            path: self.cache_path.clone(),
            source: e,
        })?;
        staged
            .persist(&self.cache_path)
            .map_err(|e| CacheError::Io {
                path: self.cache_path.clone(),
                source: e.error,
            })?;

        debug!("Saved {} cache entries", self.entries.len());
        Ok(())
    }
}

/// A cooperative filesystem walk that feeds the cache.
///
/// Call [`step`](ScanJob::step) once per tick; each step processes one
/// directory. Hidden directories, a fixed blocklist of system mounts, and
/// symbolic links are never descended into; unreadable directories are
/// skipped silently. When the walk completes the caller should `save()` the
/// cache.
///
/// # Examples
///
/// ```no_run
/// use secview::cache::{FileCache, ScanJob};
/// use std::path::{Path, PathBuf};
///
/// let mut cache = FileCache::load(PathBuf::from("/data/secview/file_cache.json"));
/// let mut job = ScanJob::new(Path::new("/home/user"));
/// while job.step(&mut cache) {
///     let (visited, queued) = job.progress();
///     eprintln!("Scanning... ({}/{})", visited, visited + queued);
/// }
/// let _ = cache.save();
/// ```
#[derive(Debug)]
pub struct ScanJob {
    pending: VecDeque<PathBuf>,
    visited: usize,
    found: usize,
}

impl ScanJob {
    /// Starts a walk rooted at `root`.
    pub fn new(root: &Path) -> ScanJob {
        let mut pending = VecDeque::new();
        pending.push_back(root.to_path_buf());
        ScanJob {
            pending,
            visited: 0,
            found: 0,
        }
    }

    /// Processes one directory; returns `true` while more work remains.
    pub fn step(&mut self, cache: &mut FileCache) -> bool {
        let Some(dir) = self.pending.pop_front() else {
            return false;
        };
        self.visited += 1;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                // Unreadable directories are expected under a home walk.
                debug!("Skipping unreadable directory: {}", e);
                return !self.pending.is_empty();
            }
        };

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            // Never traverse links; a cycle under $HOME would trap the walk.
            if file_type.is_symlink() {
                continue;
            }
            let path = entry.path();
            if file_type.is_dir() {
                if should_skip_directory(&path) {
                    continue;
                }
                self.pending.push_back(path);
            } else if file_type.is_file() && has_encrypted_suffix(&path) {
                cache.observe(&path);
                self.found += 1;
            }
        }

        !self.pending.is_empty()
    }

    /// `(directories visited, directories still queued)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.visited, self.pending.len())
    }

    /// Encrypted files recorded so far.
    pub fn found(&self) -> usize {
        self.found
    }

    /// Whether the walk has finished.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drives the walk to completion and saves the cache.
    ///
    /// Cache save failures are logged, not propagated: the index stays
    /// usable in memory.
    pub fn run_to_completion(mut self, cache: &mut FileCache) -> usize {
        while self.step(cache) {}
        if let Err(e) = cache.save() {
            warn!("Failed to save discovery cache: {}", e);
        }
        self.found
    }
}

/// Case-insensitive `.senc` suffix check; the stored path keeps its case.
pub fn has_encrypted_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase().ends_with(ENCRYPTED_SUFFIX))
        .unwrap_or(false)
}

fn should_skip_directory(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);
    if hidden {
        return true;
    }
    SCAN_EXCLUDED_DIRS
        .iter()
        .any(|excluded| Path::new(excluded) == path)
}

fn epoch_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
