//! Owner of the live property store and the transactional change protocol
//!
//! Every mutation runs in three phases:
//!
//! 1. **before**: listeners inspect each [`ChangeEvent`] and may drop it
//!    ([`Rollback::Operation`]) or abandon everything ([`Rollback::Batch`]);
//!    reload listeners then see the surviving batch and may abandon it.
//! 2. **commit**: surviving changes are written under the store's write lock,
//!    together with cache invalidation. Readers see all of the batch or none.
//! 3. **after**: property listeners, then reload listeners, are notified.
//!
//! Mutations are serialized by a separate mutex so the write lock is only held
//! for the commit itself. Listeners run with no store lock held and may read
//! the configuration, but must not mutate it: calling `set_property`,
//! `remove_property`, `clear` or `reload` from a listener deadlocks.

use super::cache::ResultCache;
use super::load::LoadType;
use crate::cache::CacheStrategy;
use crate::error::{Error, Result};
use crate::events::{ChangeEvent, EventManager, ReloadEvent, Rollback};
use crate::loaders::LoadersManager;
use crate::sources::Source;
use crate::store::{PropertyStore, PropertyValue};
use crate::sync::{MutexExt, RwLockExt};
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, TryLockError};

/// Everything that feeds a load, fixed at build time
pub(crate) struct LoadPlan {
    pub sources: Vec<Source>,
    pub load_type: LoadType,
    pub loaders: Arc<LoadersManager>,
    /// Descriptor defaults, already key-expanded
    pub defaults: Vec<(String, String)>,
    /// Caller-supplied stores; the first has the highest priority
    pub imports: Vec<PropertyStore>,
}

/// Clears the loading flag even when loading fails
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Live property store with reload, set, remove and clear transactions
pub struct ReloadCoordinator {
    store: RwLock<PropertyStore>,
    /// Serializes mutations; held across the before/commit/after phases
    mutation: Mutex<()>,
    loading: AtomicBool,
    plan: LoadPlan,
    events: EventManager,
    cache: ResultCache,
}

impl ReloadCoordinator {
    pub(crate) fn new(plan: LoadPlan, cache_strategy: CacheStrategy) -> Self {
        Self {
            store: RwLock::new(PropertyStore::new()),
            mutation: Mutex::new(()),
            loading: AtomicBool::new(false),
            plan,
            events: EventManager::new(),
            cache: ResultCache::new(cache_strategy),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Resolved sources, in declaration order
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.plan.sources
    }

    #[must_use]
    pub fn load_type(&self) -> LoadType {
        self.plan.load_type
    }

    /// Is a load in progress right now?
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// A copy of the current store
    #[must_use]
    pub fn snapshot(&self) -> PropertyStore {
        self.store.read_recovered().clone()
    }

    /// Number of converted values currently cached
    #[must_use]
    pub fn cached_values(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, PropertyStore> {
        self.store.read_recovered()
    }

    pub(crate) fn cache(&self) -> &ResultCache {
        &self.cache
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Build a fresh store: sources per load type, then imports, then
    /// defaults for whatever is still missing
    fn load_store(&self) -> Result<PropertyStore> {
        self.loading.store(true, Ordering::Release);
        let _loading = LoadingGuard(&self.loading);

        let mut store = self
            .plan
            .load_type
            .load(&self.plan.sources, &self.plan.loaders)?;
        for import in self.plan.imports.iter().rev() {
            store.merge(import.clone());
        }
        for (key, default) in &self.plan.defaults {
            if store.get(key).is_none() {
                store.put(key.clone(), default.clone());
            }
        }
        Ok(store)
    }

    /// Initial load; replaces the store without notifying anyone
    pub(crate) fn load(&self) -> Result<()> {
        let _mutation = self.mutation.lock_recovered();
        let store = self.load_store()?;
        debug!("Initial load produced {} top-level keys", store.len());
        *self.store.write_recovered() = store;
        self.cache.invalidate();
        Ok(())
    }

    /// Reload every source and commit the differences
    ///
    /// Returns `false` when a listener rolled the batch back.
    ///
    /// # Errors
    ///
    /// Returns the load error (parse failure, missing loader); the store is
    /// left untouched in that case.
    pub fn reload(&self) -> Result<bool> {
        let _mutation = self.mutation.lock_recovered();
        self.reload_locked()
    }

    /// Reload unless another mutation is in progress, in which case `None`
    ///
    /// `on_acquired` runs once the mutation lock is held, before loading.
    /// A listener reading the configuration while a reload or set is being
    /// notified ends up here through the inline staleness check, on the
    /// thread that already holds the lock.
    pub(crate) fn try_reload(&self, on_acquired: impl FnOnce()) -> Result<Option<bool>> {
        let _mutation = match self.mutation.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Ok(None),
        };
        on_acquired();
        self.reload_locked().map(Some)
    }

    fn reload_locked(&self) -> Result<bool> {
        let loaded = self.load_store()?;
        let current = self.snapshot();
        let committed = self.commit_batch(current, loaded);
        if committed {
            info!("Configuration reloaded from {} sources", self.plan.sources.len());
        }
        Ok(committed)
    }

    /// Remove every key, as one batch
    ///
    /// Returns `false` when a listener rolled the batch back.
    pub fn clear(&self) -> bool {
        let _mutation = self.mutation.lock_recovered();
        let current = self.snapshot();
        self.commit_batch(current, PropertyStore::new())
    }

    // =========================================================================
    // Single-key mutations
    // =========================================================================

    /// Store `value` under the literal `key`
    ///
    /// Returns the value previously stored under the literal `key`; a value
    /// nested under a dotted path is shadowed, not replaced. An unchanged
    /// value is a no-op, and so is a vetoed change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn set_property(
        &self,
        key: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<Option<PropertyValue>> {
        check_key(key)?;
        let _mutation = self.mutation.lock_recovered();
        let old = literal(&self.store.read_recovered(), key).cloned();
        let new = Some(value.into());
        if old != new {
            self.commit_single(ChangeEvent::new(key, old.clone(), new));
        }
        Ok(old)
    }

    /// Remove the literal `key`
    ///
    /// Returns the removed value, or `None` if the literal key was not set.
    /// Values nested under a dotted path are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn remove_property(&self, key: &str) -> Result<Option<PropertyValue>> {
        check_key(key)?;
        let _mutation = self.mutation.lock_recovered();
        let old = literal(&self.store.read_recovered(), key).cloned();
        if old.is_some() {
            self.commit_single(ChangeEvent::new(key, old.clone(), None));
        }
        Ok(old)
    }

    fn commit_single(&self, event: ChangeEvent) -> bool {
        if let Err(rollback) = self.events.before_change(&event) {
            debug!("Change of '{}' rolled back ({rollback:?})", event.key);
            return false;
        }
        {
            let mut store = self.store.write_recovered();
            apply(&mut store, &event);
            self.cache.invalidate();
        }
        self.events.after_change(&event);
        true
    }

    // =========================================================================
    // Batch protocol
    // =========================================================================

    fn commit_batch(&self, old: PropertyStore, new: PropertyStore) -> bool {
        let mut events = Vec::new();
        for event in diff(&old, &new) {
            match self.events.before_change(&event) {
                Ok(()) => events.push(event),
                Err(Rollback::Operation) => {
                    debug!("Change of '{}' rolled back by listener", event.key);
                }
                Err(Rollback::Batch) => {
                    info!("Batch of changes rolled back by listener at '{}'", event.key);
                    return false;
                }
            }
        }

        let reload = ReloadEvent::new(events, old, new);
        if self.events.before_reload(&reload).is_err() {
            info!("Batch of {} changes rolled back by reload listener", reload.events().len());
            return false;
        }

        {
            let mut store = self.store.write_recovered();
            for event in reload.events() {
                apply(&mut store, event);
            }
            self.cache.invalidate();
        }
        debug!("Committed {} changes", reload.events().len());

        for event in reload.events() {
            self.events.after_change(event);
        }
        self.events.after_reload(&reload);
        true
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("key must not be empty".into()));
    }
    Ok(())
}

fn literal<'a>(store: &'a PropertyStore, key: &str) -> Option<&'a PropertyValue> {
    if store.contains_key(key) {
        store.get(key)
    } else {
        None
    }
}

fn apply(store: &mut PropertyStore, event: &ChangeEvent) {
    match &event.new_value {
        Some(value) => {
            store.put(event.key.clone(), value.clone());
        }
        None => {
            store.remove(&event.key);
        }
    }
}

/// One event per top-level key whose value differs, in key order
fn diff(old: &PropertyStore, new: &PropertyStore) -> Vec<ChangeEvent> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let before = literal(old, key);
            let after = literal(new, key);
            (before != after).then(|| ChangeEvent::new(key.as_str(), before.cloned(), after.cloned()))
        })
        .collect()
}
