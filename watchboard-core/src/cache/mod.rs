//! Staged-commit snapshot cache.
//!
//! Readers only ever see the Live snapshot, held as an `Arc` that is
//! replaced wholesale. A refresh cycle stages every category into a private
//! map and swaps it in with one pointer replacement on commit, so a reader
//! sees either the old generation or the new one, never a mix.
//!
//! All mutations (direct sets, refresh transitions, flag updates) go
//! through a single writer lock, so a flag update can never interleave with
//! a staging-map swap.

pub mod keys;
pub mod store;

pub use keys::KeyScheme;
pub use store::{central_time_stamp, CacheError, CacheStore, Entries};

use crate::domain::{CategoryRecord, OWNED_CATEGORY};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// An immutable generation of the cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: Entries,
    pub last_updated: String,
}

/// Records for one key plus the cache-wide timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub records: Vec<CategoryRecord>,
    pub last_updated: String,
}

/// Refresh protocol state.
#[derive(Debug)]
enum CacheState {
    Live,
    Staging {
        entries: Entries,
        /// Flag changes made since `start_refresh`, symbol → flag. Replayed
        /// over every later staged write and once more before commit.
        pending_flags: BTreeMap<String, bool>,
    },
}

impl CacheState {
    fn staging() -> Self {
        CacheState::Staging {
            entries: Entries::new(),
            pending_flags: BTreeMap::new(),
        }
    }
}

/// Source of `last_updated` stamps.
pub type Clock = Box<dyn Fn() -> String + Send + Sync>;

pub struct StagedCache {
    live: RwLock<Arc<Snapshot>>,
    state: Mutex<CacheState>,
    store: CacheStore,
    keys: KeyScheme,
    clock: Clock,
}

impl StagedCache {
    /// Open the cache, loading the persisted document if there is one.
    pub fn open(store: CacheStore, keys: KeyScheme) -> Self {
        Self::open_with_clock(store, keys, Box::new(central_time_stamp))
    }

    /// Open with a custom timestamp source.
    pub fn open_with_clock(store: CacheStore, keys: KeyScheme, clock: Clock) -> Self {
        let loaded = store.load();
        let snapshot = Snapshot {
            entries: loaded.entries,
            last_updated: loaded.last_updated.unwrap_or_else(|| clock()),
        };
        Self {
            live: RwLock::new(Arc::new(snapshot)),
            state: Mutex::new(CacheState::Live),
            store,
            keys,
            clock,
        }
    }

    pub fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Records under `key` from the Live snapshot.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let snapshot = self.snapshot();
        snapshot.entries.get(key).map(|records| CacheEntry {
            records: records.clone(),
            last_updated: snapshot.last_updated.clone(),
        })
    }

    /// The current Live generation, for consistent multi-key reads.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.live.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn last_updated(&self) -> String {
        self.snapshot().last_updated.clone()
    }

    pub fn is_staging(&self) -> bool {
        matches!(*self.lock_state(), CacheState::Staging { .. })
    }

    /// Number of keys staged so far, or `None` when not staging.
    pub fn staged_len(&self) -> Option<usize> {
        match &*self.lock_state() {
            CacheState::Live => None,
            CacheState::Staging { entries, .. } => Some(entries.len()),
        }
    }

    /// Store `records` under `key`.
    ///
    /// Live: written into a new Live generation and persisted immediately.
    /// An `Err` means only the file write failed; the in-memory update has
    /// already happened. Staging: written to the staging map only.
    pub fn set(&self, key: impl Into<String>, records: Vec<CategoryRecord>) -> Result<(), CacheError> {
        let key = key.into();
        let mut state = self.lock_state();
        match &mut *state {
            CacheState::Staging {
                entries,
                pending_flags,
            } => {
                debug!(%key, records = records.len(), "staged");
                entries.insert(key, records);
                replay_flags(entries, pending_flags, &self.keys);
                Ok(())
            }
            CacheState::Live => {
                let next = self.modify_live(|snapshot| {
                    snapshot.entries.insert(key, records);
                    snapshot.last_updated = (self.clock)();
                });
                self.store.save_logged(&next.entries, &next.last_updated)
            }
        }
    }

    /// Enter Staging with an empty staging map. Restarting while already
    /// Staging discards what was staged.
    pub fn start_refresh(&self) {
        let mut state = self.lock_state();
        if let CacheState::Staging { entries, .. } = &*state {
            warn!(discarded = entries.len(), "refresh restarted, discarding staged entries");
        }
        *state = CacheState::staging();
        info!("started refresh");
    }

    /// Swap the staged map in as the new Live generation.
    ///
    /// Returns false, leaving Live untouched, when not staging or when
    /// nothing was staged. An empty stage stays open.
    pub fn commit_refresh(&self) -> bool {
        let mut state = self.lock_state();
        let staged = match &mut *state {
            CacheState::Staging {
                entries,
                pending_flags,
            } if !entries.is_empty() => {
                replay_flags(entries, pending_flags, &self.keys);
                std::mem::take(entries)
            }
            CacheState::Staging { .. } => {
                warn!("commit requested with nothing staged; keeping live data");
                return false;
            }
            CacheState::Live => {
                warn!("commit requested while not refreshing");
                return false;
            }
        };
        *state = CacheState::Live;

        let next = Arc::new(Snapshot {
            entries: staged,
            last_updated: (self.clock)(),
        });
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        info!(entries = next.entries.len(), "committed refresh");

        let _ = self.store.save_logged(&next.entries, &next.last_updated);
        true
    }

    /// Leave Staging without touching Live. Returns whether a stage was open.
    pub fn abort_refresh(&self) -> bool {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, CacheState::Live) {
            CacheState::Staging { entries, .. } => {
                info!(discarded = entries.len(), "aborted refresh");
                true
            }
            CacheState::Live => false,
        }
    }

    /// Apply an ownership-flag change directly to Live.
    ///
    /// Every live record of `symbol` gets the new flag. Setting the flag adds
    /// a copy to the `Owned` list; clearing it removes the symbol from `Owned`
    /// and makes sure its origin category lists it. Touched lists are
    /// re-sorted and the cache is persisted. During a refresh the change is
    /// also applied to the staged entries, including any staged after this
    /// call, so the commit keeps it.
    ///
    /// Returns false when neither Live nor the open stage holds `symbol`.
    pub fn update_flag(&self, symbol: &str, flag: bool) -> bool {
        let mut state = self.lock_state();

        let mut staged_found = false;
        if let CacheState::Staging {
            entries,
            pending_flags,
        } = &mut *state
        {
            pending_flags.insert(symbol.to_string(), flag);
            staged_found = relocate(entries, &self.keys, symbol, flag);
            if staged_found {
                debug!(symbol, flag, "flag applied to staged entries");
            }
        }

        let live_found = self
            .snapshot()
            .entries
            .values()
            .flatten()
            .any(|r| r.symbol == symbol);
        if !live_found {
            if !staged_found {
                warn!(symbol, "flag update: symbol not in cache");
            }
            return staged_found;
        }

        let next = self.modify_live(|snapshot| {
            relocate(&mut snapshot.entries, &self.keys, symbol, flag);
        });
        info!(symbol, flag, "moved record and updated flag");
        let _ = self.store.save_logged(&next.entries, &next.last_updated);
        true
    }

    /// Copy-on-write update of the Live generation. Callers hold the state lock.
    fn modify_live(&self, f: impl FnOnce(&mut Snapshot)) -> Arc<Snapshot> {
        let mut next = (*self.snapshot()).clone();
        f(&mut next);
        let next = Arc::new(next);
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        next
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Re-apply every pending flag change to a staging map.
fn replay_flags(entries: &mut Entries, pending: &BTreeMap<String, bool>, keys: &KeyScheme) {
    for (symbol, &flag) in pending {
        relocate(entries, keys, symbol, flag);
    }
}

/// Move `symbol` between `Owned` and its origin list inside one entry map.
fn relocate(entries: &mut Entries, keys: &KeyScheme, symbol: &str, flag: bool) -> bool {
    let owned_key = keys.owned_key();
    let mut touched = BTreeSet::new();
    let mut template: Option<CategoryRecord> = None;

    for (key, records) in entries.iter_mut() {
        for record in records.iter_mut().filter(|r| r.symbol == symbol) {
            record.flag = flag;
            template.get_or_insert_with(|| record.clone());
            touched.insert(key.clone());
        }
    }
    let Some(template) = template else {
        return false;
    };

    if flag {
        let owned = entries.entry(owned_key.clone()).or_default();
        if !owned.iter().any(|r| r.symbol == symbol) {
            owned.push(template);
            touched.insert(owned_key);
        }
    } else {
        if let Some(owned) = entries.get_mut(&owned_key) {
            owned.retain(|r| r.symbol != symbol);
        }
        if template.category != OWNED_CATEGORY {
            let origin_key = keys.key_for(&template.category);
            let origin = entries.entry(origin_key.clone()).or_default();
            if !origin.iter().any(|r| r.symbol == symbol) {
                origin.push(template);
                touched.insert(origin_key);
            }
        }
    }

    for key in touched {
        if let Some(records) = entries.get_mut(&key) {
            keys.sort_policy(&key).sort(records);
        }
    }
    true
}
