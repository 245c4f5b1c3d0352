//! The print cache service
//!
//! `PrintCache` owns every piece of shared state: the current generation
//! (store, indexes and lazily derived set data), the cache epoch, the rulings
//! index and the memo caches. Readers take a cheap `Arc` snapshot of the
//! generation and never wait for index building. Writers build a complete
//! generation off-lock and publish it with one swap, bumping the epoch inside
//! the same critical section.

use crate::bulk::{BulkClient, DownloadOutcome, DownloadStatus};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::index::{IndexSizes, PrintIndex};
use crate::memo::BoundedCache;
use crate::rulings::RulingsIndex;
use crate::set_meta::{build_set_profiles, image_samples, ImageSample, SetMetadata, SetProfile};
use crate::store::read_prints;
use chrono::{DateTime, Utc};
use mtg_common::{CardMetadata, ImageSet, PrintRecord, RulingEntry};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::Duration;

/// Capacity of each memo cache
pub const MEMO_CAPACITY: usize = 32_768;

/// One published state of the print store
#[derive(Debug, Default)]
pub struct PrintGeneration {
    index: PrintIndex,
    source: Option<PathBuf>,
    set_meta: OnceLock<SetMetadata>,
    profiles: OnceLock<HashMap<String, SetProfile>>,
}

impl PrintGeneration {
    fn new(index: PrintIndex, source: PathBuf) -> Self {
        Self {
            index,
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn index(&self) -> &PrintIndex {
        &self.index
    }

    /// File this generation was loaded from (None after a clear or failed load)
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn set_meta(&self) -> &SetMetadata {
        self.set_meta
            .get_or_init(|| SetMetadata::build(self.index.iter()))
    }

    fn profiles(&self) -> &HashMap<String, SetProfile> {
        self.profiles
            .get_or_init(|| build_set_profiles(self.index.iter()))
    }
}

/// A resolved print with the derived values a UI needs to show it
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PrintBundle {
    pub print: Arc<PrintRecord>,
    pub display_name: String,
    pub type_label: String,
    pub image: ImageSet,
}

/// On-disk state of one bulk file
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FileStats {
    pub file: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub stale: bool,
}

impl FileStats {
    fn read(path: &Path, max_age: Duration) -> Self {
        let metadata = std::fs::metadata(path).ok().filter(|m| m.is_file());
        let modified_at: Option<DateTime<Utc>> = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::from);
        let age = modified_at.map(|m| Utc::now() - m);
        let stale = match age {
            // Clock skew can make the file look newer than now
            Some(age) => age.to_std().map(|a| a > max_age).unwrap_or(false),
            None => true,
        };
        Self {
            file: path.to_path_buf(),
            exists: metadata.is_some(),
            size_bytes: metadata.as_ref().map_or(0, |m| m.len()),
            modified_at,
            age_seconds: age.map(|a| a.num_seconds()),
            stale,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PrintStats {
    #[serde(flatten)]
    pub file: FileStats,
    pub records: usize,
    pub unique_sets: usize,
    pub unique_oracles: usize,
    pub index_sizes: IndexSizes,
    pub epoch: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RulingStats {
    #[serde(flatten)]
    pub file: FileStats,
    pub loaded: bool,
    pub oracle_keys: usize,
    pub entries: usize,
}

/// Snapshot of both bulk files and the in-memory indexes
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CacheStats {
    pub prints: PrintStats,
    pub rulings: RulingStats,
}

/// Summary of one dataset refresh
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RefreshReport {
    pub kind: String,
    pub updated_at: Option<String>,
    pub download: DownloadOutcome,
    /// Whether the dataset was loaded into memory afterwards (None for kinds the cache does not index)
    pub loaded: Option<bool>,
    pub records: usize,
    pub epoch: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remove a file, returning whether it existed. Failures other than a missing
/// file are logged.
fn discard_file(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            log::warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Print store, indexes and rulings for one data directory
pub struct PrintCache {
    config: CacheConfig,
    generation: RwLock<Arc<PrintGeneration>>,
    epoch: AtomicU64,
    /// Serialises load/reload/clear
    writer: Mutex<()>,
    /// Serialises dataset refreshes, held across download and reload
    refresh: tokio::sync::Mutex<()>,
    /// None until a rulings load has been attempted
    rulings: RwLock<Option<Arc<RulingsIndex>>>,
    oracle_by_name: Mutex<BoundedCache<String, Option<String>>>,
    oracle_groups: Mutex<BoundedCache<String, Arc<[Arc<PrintRecord>]>>>,
}

impl PrintCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            generation: RwLock::new(Arc::new(PrintGeneration::default())),
            epoch: AtomicU64::new(0),
            writer: Mutex::new(()),
            refresh: tokio::sync::Mutex::new(()),
            rulings: RwLock::new(None),
            oracle_by_name: Mutex::new(BoundedCache::new(MEMO_CAPACITY)),
            oracle_groups: Mutex::new(BoundedCache::new(MEMO_CAPACITY)),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current generation together with the epoch it was published under
    fn snapshot(&self) -> (Arc<PrintGeneration>, u64) {
        let slot = self.generation.read().unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&slot), self.epoch.load(Ordering::SeqCst))
    }

    pub fn generation(&self) -> Arc<PrintGeneration> {
        self.snapshot().0
    }

    /// Swap in a fully built generation; returns the new epoch
    fn publish(&self, generation: PrintGeneration) -> u64 {
        let generation = Arc::new(generation);
        let epoch = {
            let mut slot = self
                .generation
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = generation;
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };
        lock(&self.oracle_by_name).reset_to(epoch);
        lock(&self.oracle_groups).reset_to(epoch);
        log::debug!("Published print cache generation {}", epoch);
        epoch
    }

    fn load_locked(&self, path: &Path) -> bool {
        match read_prints(path) {
            Ok(prints) => {
                let index = PrintIndex::build(prints);
                log::info!(
                    "Indexed {} prints ({} oracle ids) from {}",
                    index.len(),
                    index.oracle_count(),
                    path.display()
                );
                self.publish(PrintGeneration::new(index, path.to_path_buf()));
                true
            }
            Err(e) => {
                log::warn!("Failed to load prints from {}: {}", path.display(), e);
                self.publish(PrintGeneration::default());
                false
            }
        }
    }

    /// Replace the store with the contents of `path`.
    ///
    /// A missing or unreadable file leaves an empty store and returns false.
    pub fn load(&self, path: &Path) -> bool {
        let _guard = lock(&self.writer);
        self.load_locked(path)
    }

    /// Reload from `path`, or from the configured prints file
    pub fn reload(&self, path: Option<&Path>) -> bool {
        let path = path.unwrap_or(&self.config.prints_path);
        self.load(path)
    }

    /// Drop the store and everything derived from it
    pub fn clear(&self) {
        let _guard = lock(&self.writer);
        self.publish(PrintGeneration::default());
        log::info!("Cleared print cache");
    }

    /// Load the configured prints file unless already loaded (or `force`)
    pub fn ensure_loaded(&self, force: bool) -> bool {
        let _guard = lock(&self.writer);
        if !force && self.cache_ready() {
            return true;
        }
        self.load_locked(&self.config.prints_path)
    }

    pub fn cache_ready(&self) -> bool {
        !self.generation().index.is_empty()
    }

    pub fn cache_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // ── print lookups ────────────────────────────────────────────────

    pub fn find_print(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<Arc<PrintRecord>> {
        self.generation()
            .index
            .find_print(set_code, collector_number, name_hint)
            .cloned()
    }

    pub fn find_print_loose(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<Arc<PrintRecord>> {
        self.generation()
            .index
            .find_print_loose(set_code, collector_number, name_hint)
            .cloned()
    }

    pub fn print_by_id(&self, id: &str) -> Option<Arc<PrintRecord>> {
        self.generation().index.print_by_id(id).cloned()
    }

    pub fn candidates_by_set_and_name(&self, set_code: &str, name: &str) -> Vec<Arc<PrintRecord>> {
        self.generation()
            .index
            .candidates_by_set_and_name(set_code, name)
    }

    pub fn search_prints(
        &self,
        name_query: Option<&str>,
        set_code: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Arc<PrintRecord>>, usize) {
        self.generation()
            .index
            .search_prints(name_query, set_code, limit, offset)
    }

    /// Resolve a print and derive its display values in one call
    pub fn resolve_print_bundle(
        &self,
        set_code: &str,
        collector_number: &str,
        name_hint: Option<&str>,
    ) -> Option<PrintBundle> {
        let print = self.find_print(set_code, collector_number, name_hint)?;
        Some(PrintBundle {
            display_name: print.display_name(),
            type_label: print.type_label(),
            image: print.image_set(),
            print,
        })
    }

    /// Every print sharing `oracle_id`, ordered by (set, collector number)
    pub fn prints_for_oracle(&self, oracle_id: &str) -> Vec<Arc<PrintRecord>> {
        let key = oracle_id.trim().to_string();
        if key.is_empty() {
            return Vec::new();
        }
        let (generation, epoch) = self.snapshot();
        if let Some(hit) = lock(&self.oracle_groups).get(&key, epoch) {
            return hit.to_vec();
        }

        let prints = generation.index.prints_for_oracle(&key);
        lock(&self.oracle_groups).insert(key, Arc::from(prints.as_slice()), epoch);
        prints
    }

    /// Oracle id a card name most plausibly refers to
    pub fn unique_oracle_id_by_name(&self, name: &str) -> Option<String> {
        // Keyed by the trimmed raw name: variants depend on "//", "/" and ","
        let key = name.trim().to_string();
        if key.is_empty() {
            return None;
        }
        let (generation, epoch) = self.snapshot();
        if let Some(hit) = lock(&self.oracle_by_name).get(&key, epoch) {
            log::debug!("Oracle name memo hit for {:?}", key);
            return hit;
        }

        let resolved = generation.index.unique_oracle_id_by_name(&key);
        lock(&self.oracle_by_name).insert(key, resolved.clone(), epoch);
        resolved
    }

    pub fn metadata_from_print(&self, print: &PrintRecord) -> CardMetadata {
        mtg_common::metadata_from_print(print)
    }

    // ── set metadata ─────────────────────────────────────────────────

    pub fn set_display_name(&self, code: &str) -> Option<String> {
        self.generation()
            .set_meta()
            .display_name(code)
            .map(str::to_string)
    }

    pub fn set_release_date(&self, code: &str) -> Option<String> {
        self.generation()
            .set_meta()
            .release_date(code)
            .map(str::to_string)
    }

    /// Sorted, lower-cased set codes present in the store
    pub fn all_set_codes(&self) -> Vec<String> {
        self.generation().set_meta().codes()
    }

    /// Profile for one set; unknown sets get a zero-valued profile
    pub fn set_profile(&self, code: &str) -> SetProfile {
        self.generation()
            .profiles()
            .get(&code.trim().to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Profiles for many sets, keyed by lower-cased code
    pub fn set_profiles<S: AsRef<str>>(&self, codes: &[S]) -> HashMap<String, SetProfile> {
        let generation = self.generation();
        let profiles = generation.profiles();
        codes
            .iter()
            .map(|code| code.as_ref().trim().to_lowercase())
            .filter(|code| !code.is_empty())
            .map(|code| {
                let profile = profiles.get(&code).cloned().unwrap_or_default();
                (code, profile)
            })
            .collect()
    }

    pub fn set_profiles_all(&self) -> HashMap<String, SetProfile> {
        self.generation().profiles().clone()
    }

    /// Up to `per_set` prints with artwork from one set
    pub fn set_image_samples(&self, code: &str, per_set: usize) -> Vec<ImageSample> {
        image_samples(self.generation().index.iter(), code, per_set)
    }

    // ── rulings ──────────────────────────────────────────────────────

    fn rulings_snapshot(&self) -> Option<Arc<RulingsIndex>> {
        self.rulings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_rulings(&self, rulings: Option<RulingsIndex>) {
        *self.rulings.write().unwrap_or_else(PoisonError::into_inner) = rulings.map(Arc::new);
    }

    /// Replace the rulings index from `path` (or the configured rulings
    /// file). Returns the number of rulings loaded; 0 on a missing or
    /// malformed file, which also leaves an empty index.
    pub fn load_rulings(&self, path: Option<&Path>) -> usize {
        let path = path.unwrap_or(&self.config.rulings_path);
        match RulingsIndex::load(path) {
            Ok(index) => {
                let count = index.entry_count();
                self.set_rulings(Some(index));
                count
            }
            Err(CacheError::MissingFile(_)) => {
                log::debug!("No rulings file at {}", path.display());
                self.set_rulings(Some(RulingsIndex::default()));
                0
            }
            Err(e) => {
                log::warn!("Failed to load rulings from {}: {}", path.display(), e);
                self.set_rulings(Some(RulingsIndex::default()));
                0
            }
        }
    }

    /// Rulings for an oracle id, oldest first.
    ///
    /// The first call loads the configured rulings file if it exists.
    pub fn rulings_for(&self, oracle_id: &str) -> Vec<RulingEntry> {
        let index = match self.rulings_snapshot() {
            Some(index) => index,
            None if self.config.rulings_path.is_file() => {
                self.load_rulings(None);
                match self.rulings_snapshot() {
                    Some(index) => index,
                    None => return Vec::new(),
                }
            }
            None => return Vec::new(),
        };
        index.rulings_for(oracle_id).to_vec()
    }

    // ── files and stats ──────────────────────────────────────────────

    /// Delete the rulings file (and the prints file when asked) plus their
    /// ETag sidecars, then drop the in-memory store and rulings. Returns the
    /// number of bulk files removed.
    pub fn clear_cache_files(&self, include_bulk_prints: bool) -> usize {
        let mut targets = Vec::new();
        if include_bulk_prints {
            targets.push(self.config.prints_path.clone());
        }
        targets.push(self.config.rulings_path.clone());

        let mut removed = 0;
        for path in &targets {
            if path.is_file() && discard_file(path) {
                log::info!("Removed {}", path.display());
                removed += 1;
            }
            discard_file(&crate::bulk::etag_path_for(path));
        }

        self.clear();
        self.set_rulings(None);
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        let (generation, epoch) = self.snapshot();
        let index = &generation.index;
        let rulings = self.rulings_snapshot();

        CacheStats {
            prints: PrintStats {
                file: FileStats::read(&self.config.prints_path, self.config.max_age),
                records: index.len(),
                unique_sets: if index.is_empty() {
                    0
                } else {
                    generation.set_meta().codes().len()
                },
                unique_oracles: index.oracle_count(),
                index_sizes: index.sizes(),
                epoch,
            },
            rulings: RulingStats {
                file: FileStats::read(&self.config.rulings_path, self.config.max_age),
                loaded: rulings
                    .as_ref()
                    .is_some_and(|r| r.loaded_from().is_some()),
                oracle_keys: rulings.as_ref().map_or(0, |r| r.oracle_count()),
                entries: rulings.as_ref().map_or(0, |r| r.entry_count()),
            },
        }
    }

    /// True when the prints file is missing or older than the max age
    pub fn prints_stale(&self) -> bool {
        FileStats::read(&self.config.prints_path, self.config.max_age).stale
    }

    pub fn rulings_stale(&self) -> bool {
        FileStats::read(&self.config.rulings_path, self.config.max_age).stale
    }

    // ── refresh ──────────────────────────────────────────────────────

    /// Download the latest copy of a bulk dataset and load it.
    ///
    /// `default_cards` replaces the print store and `rulings` the rulings
    /// index; other kinds are only downloaded. Concurrent refreshes run one
    /// after the other.
    pub async fn refresh_dataset(
        &self,
        client: &BulkClient,
        kind: &str,
        force_download: bool,
    ) -> Result<RefreshReport> {
        let _refresh = self.refresh.lock().await;
        let dataset = client
            .fetch_bulk_index()
            .await?
            .into_iter()
            .find(|d| d.kind == kind)
            .ok_or_else(|| CacheError::DatasetNotFound(kind.to_string()))?;
        let uri = dataset
            .download_uri
            .clone()
            .ok_or_else(|| CacheError::NoDownloadUri(kind.to_string()))?;
        let dest = self.config.dataset_path(kind);

        let mut download = client
            .stream_download(&dest, &uri, None, force_download)
            .await?;
        if download.status == DownloadStatus::NotModified && !dest.is_file() {
            log::warn!(
                "{} reported unchanged but {} is missing, downloading again",
                kind,
                dest.display()
            );
            download = client.stream_download(&dest, &uri, None, true).await?;
        }

        let loaded = match kind {
            "default_cards" => Some(self.reload(Some(&dest))),
            "rulings" => Some(self.load_rulings(Some(&dest)) > 0),
            _ => None,
        };
        let report = RefreshReport {
            kind: kind.to_string(),
            updated_at: dataset.updated_at,
            download,
            loaded,
            records: self.generation().index.len(),
            epoch: self.cache_epoch(),
        };
        log::info!(
            "Refreshed {} ({:?}, {} bytes)",
            kind,
            report.download.status,
            report.download.bytes_written
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
