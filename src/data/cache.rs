use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, TryLockError};
use std::time::SystemTime;

use super::error::DataError;
use super::loader::resolve_source;
use super::model::Dataset;
use super::prepare::{prepare_dataset, PrepareOptions};

// ---------------------------------------------------------------------------
// Content-keyed, single-flight dataset cache
// ---------------------------------------------------------------------------

/// Identifies one prepared dataset: the file (by canonical path, size and
/// modification time, so no reread is needed) and the options used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub options: PrepareOptions,
}

impl CacheKey {
    pub fn for_file(path: &Path, options: &PrepareOptions) -> Result<Self, DataError> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: std::fs::canonicalize(path)?,
            len: metadata.len(),
            modified: metadata.modified().ok(),
            options: *options,
        })
    }
}

type Slot = Arc<Mutex<Option<Arc<Dataset>>>>;

/// Memoizes prepared datasets for the lifetime of the process.
///
/// Each key owns a slot. The first caller for a key holds the slot lock
/// while loading; concurrent callers for the same key block on it and then
/// reuse the stored dataset. A failed load drops its slot, so the next
/// call for that key retries.
#[derive(Debug, Default)]
pub struct DatasetCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

static GLOBAL_CACHE: OnceLock<DatasetCache> = OnceLock::new();

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the application.
    pub fn global() -> &'static DatasetCache {
        GLOBAL_CACHE.get_or_init(DatasetCache::new)
    }

    /// Resolve the source among `candidates` and return its prepared
    /// dataset, loading it at most once per key.
    pub fn load(
        &self,
        candidates: &[PathBuf],
        options: &PrepareOptions,
    ) -> Result<Arc<Dataset>, DataError> {
        let source = resolve_source(candidates)?;
        let key = CacheKey::for_file(&source, options)?;
        self.get_or_load(key, || prepare_dataset(&[source.clone()], options))
    }

    /// Return the cached dataset for `key`, or run `load` to produce it.
    pub fn get_or_load<F>(&self, key: CacheKey, load: F) -> Result<Arc<Dataset>, DataError>
    where
        F: FnOnce() -> Result<Dataset, DataError>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.clone()).or_default().clone()
        };

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dataset) = guard.as_ref() {
            log::debug!("Dataset cache hit for {}", key.path.display());
            return Ok(Arc::clone(dataset));
        }

        log::debug!("Dataset cache miss for {}", key.path.display());
        match load() {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                *guard = Some(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(err) => {
                drop(guard);
                self.discard_empty_slot(&key, &slot);
                Err(err)
            }
        }
    }

    /// Forget `slot` after a failed load, unless another caller has since
    /// filled it or replaced it.
    fn discard_empty_slot(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = slots.get(key) else {
            return;
        };
        // A locked slot belongs to a caller that is loading it right now.
        let still_empty = match current.try_lock() {
            Ok(s) => s.is_none(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_none(),
            Err(TryLockError::WouldBlock) => false,
        };
        if Arc::ptr_eq(current, slot) && still_empty {
            slots.remove(key);
        }
    }

    /// Number of keys with a slot, filled or currently loading.
    #[cfg(test)]
    pub(super) fn slot_count(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of datasets currently held.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| {
                slot.lock()
                    .map(|s| s.is_some())
                    .unwrap_or_else(|poisoned| poisoned.into_inner().is_some())
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
