//! Persistent cache of extraction outcomes
//!
//! Keyed by `"{document source identity}:{part number}"`. The whole map is a
//! single JSON file rewritten on every insert (write to a temporary file,
//! then rename). Writers are serialized and each one snapshots the map after
//! taking its turn, so the file on disk always holds the latest state.
//! Empty outcomes are cached too and age out like any other entry.
//!
//! Loading is forgiving. Expired entries are purged, and an entry that no
//! longer deserializes or holds an application outside the configured year
//! bounds is dropped with a warning. A file that is not a JSON object at all
//! is moved aside to `<name>.corrupted`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{StrategyId, VehicleApplication, YearBounds};
use crate::infrastructure::config::CacheConfig;

/// One cached extraction outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub applications: Vec<VehicleApplication>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub strategy: Option<StrategyId>,
    #[serde(default)]
    pub confidence: f64,
}

impl CacheEntry {
    pub fn new(
        applications: Vec<VehicleApplication>,
        vendor: Option<String>,
        strategy: Option<StrategyId>,
        confidence: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            applications,
            vendor,
            strategy,
            confidence,
        }
    }

    pub fn is_expired(&self, retention: Duration, now: DateTime<Utc>) -> bool {
        now - self.timestamp > retention
    }

    /// Cached "nothing found" outcome
    pub fn is_negative(&self) -> bool {
        self.applications.is_empty()
    }
}

pub struct ExtractionCache {
    path: Option<PathBuf>,
    retention: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    // Held from snapshot to rename so concurrent inserts cannot interleave on disk
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for ExtractionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionCache")
            .field("path", &self.path)
            .field("retention_days", &self.retention.num_days())
            .field("entries", &self.len())
            .finish()
    }
}

impl ExtractionCache {
    /// Build the cache from configuration, or `None` when caching is off.
    /// Loaded applications are held to `bounds`.
    pub fn from_config(config: &CacheConfig, bounds: YearBounds) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let path = config.resolved_path()?;
        Ok(Some(Self::open_with_bounds(path, config.retention_days, bounds)))
    }

    /// Cache that lives only as long as the process.
    pub fn in_memory(retention_days: u32) -> Self {
        Self::with_entries(None, retention_days, HashMap::new())
    }

    /// File-backed cache using the default year bounds.
    pub fn open(path: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self::open_with_bounds(path, retention_days, YearBounds::default())
    }

    /// File-backed cache. Never fails: unreadable state starts empty.
    pub fn open_with_bounds(path: impl Into<PathBuf>, retention_days: u32, bounds: YearBounds) -> Self {
        let path = path.into();
        let retention = Duration::days(i64::from(retention_days));
        let entries = load_entries(&path, &bounds, retention);
        info!(
            "Extraction cache loaded from {} ({} entries)",
            path.display(),
            entries.len()
        );
        Self::with_entries(Some(path), retention_days, entries)
    }

    fn with_entries(path: Option<PathBuf>, retention_days: u32, entries: HashMap<String, CacheEntry>) -> Self {
        Self {
            path,
            retention: Duration::days(i64::from(retention_days)),
            entries: Mutex::new(entries),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(source_identity: &str, part_number: &str) -> String {
        format!("{source_identity}:{part_number}")
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh entry for `key`. Expired entries are evicted on the way.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut entries = self.lock();
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.retention, Utc::now()));
        if expired {
            debug!(key, "Cache entry expired");
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }

    /// Store an entry and persist the cache. Expired entries are purged
    /// first so they never reach the file. Persistence failures are logged;
    /// the in-memory entry is kept either way.
    pub fn insert(&self, key: impl Into<String>, entry: CacheEntry) {
        self.lock().insert(key.into(), entry);

        let Some(path) = &self.path else {
            return;
        };

        let _writer = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries before writing");
        }
        let serialized = serde_json::to_string_pretty(&*self.lock());

        let result = serialized
            .context("Failed to serialize extraction cache")
            .and_then(|json| write_atomically(path, &json));
        if let Err(e) = result {
            warn!("Failed to persist extraction cache: {e:#}");
        }
    }

    /// Drop every expired entry, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.retention, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn load_entries(path: &Path, bounds: &YearBounds, retention: Duration) -> HashMap<String, CacheEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!("Failed to read extraction cache {}: {e}", path.display());
            return HashMap::new();
        }
    };

    let raw: HashMap<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            let mut backup = path.as_os_str().to_owned();
            backup.push(".corrupted");
            warn!(
                "Extraction cache {} is corrupted ({e}); moving it to {}",
                path.display(),
                PathBuf::from(&backup).display()
            );
            if let Err(e) = std::fs::rename(path, &backup) {
                warn!("Failed to back up corrupted cache: {e}");
            }
            return HashMap::new();
        }
    };

    let now = Utc::now();
    let total = raw.len();
    let entries: HashMap<String, CacheEntry> = raw
        .into_iter()
        .filter_map(|(key, value)| {
            let entry = match serde_json::from_value::<CacheEntry>(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(key, "Discarding corrupted cache entry: {e}");
                    return None;
                }
            };
            // A partial entry would misreport the outcome, so one bad record drops it all
            if let Some(app) = entry.applications.iter().find(|app| !app.within(bounds)) {
                warn!(
                    key,
                    "Discarding cache entry with out-of-range application {}-{}",
                    app.year_start(),
                    app.year_end()
                );
                return None;
            }
            Some((key, entry))
        })
        .filter(|(_, entry)| !entry.is_expired(retention, now))
        .collect();

    if entries.len() < total {
        debug!("Dropped {} stale or invalid cache entries", total - entries.len());
    }
    entries
}

fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory {}", parent.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move cache into place at {}", path.display()))?;
    Ok(())
}
