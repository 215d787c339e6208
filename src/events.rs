//! Event system for property changes
//!
//! Every mutation of a [`Config`](crate::Config) (reload, set, remove, clear)
//! runs as a batch of [`ChangeEvent`]s. Listeners are asked first and may veto
//! a single change or the whole batch, then notified after the commit.

use crate::store::{PropertyStore, PropertyValue};
use crate::sync::RwLockExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

// =============================================================================
// Events
// =============================================================================

/// A single key changing value
///
/// `None` on either side means the key is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    pub old_value: Option<PropertyValue>,
    pub new_value: Option<PropertyValue>,
}

impl ChangeEvent {
    pub fn new(
        key: impl Into<String>,
        old_value: Option<PropertyValue>,
        new_value: Option<PropertyValue>,
    ) -> Self {
        Self {
            key: key.into(),
            old_value,
            new_value,
        }
    }
}

/// A batch of changes about to be (or just) committed
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    events: Vec<ChangeEvent>,
    old_properties: PropertyStore,
    new_properties: PropertyStore,
    time: OffsetDateTime,
}

impl ReloadEvent {
    pub(crate) fn new(
        events: Vec<ChangeEvent>,
        old_properties: PropertyStore,
        new_properties: PropertyStore,
    ) -> Self {
        Self {
            events,
            old_properties,
            new_properties,
            time: OffsetDateTime::now_utc(),
        }
    }

    /// The changes that survived the per-key vetoes
    #[must_use]
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    #[must_use]
    pub fn old_properties(&self) -> &PropertyStore {
        &self.old_properties
    }

    #[must_use]
    pub fn new_properties(&self) -> &PropertyStore {
        &self.new_properties
    }

    /// When the batch was assembled
    #[must_use]
    pub fn time(&self) -> OffsetDateTime {
        self.time
    }
}

// =============================================================================
// Listeners
// =============================================================================

/// Veto returned from a `before_*` hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// Drop only the change being inspected
    Operation,
    /// Abandon the whole batch
    Batch,
}

/// Veto returned from [`ReloadListener::before_reload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackBatch;

impl From<RollbackBatch> for Rollback {
    fn from(_: RollbackBatch) -> Self {
        Rollback::Batch
    }
}

/// Listener for individual key changes
///
/// Any `Fn(&ChangeEvent)` closure is a listener that never vetoes.
pub trait PropertyChangeListener: Send + Sync {
    /// Inspect a change before it is committed
    ///
    /// # Errors
    ///
    /// Return [`Rollback::Operation`] to drop this change or
    /// [`Rollback::Batch`] to abandon every change in the batch.
    fn before_change(&self, _event: &ChangeEvent) -> Result<(), Rollback> {
        Ok(())
    }

    /// Called after the change was committed
    fn after_change(&self, event: &ChangeEvent);
}

impl<F> PropertyChangeListener for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn after_change(&self, event: &ChangeEvent) {
        self(event);
    }
}

/// Listener for whole batches
///
/// Any `Fn(&ReloadEvent)` closure is a listener that never vetoes.
pub trait ReloadListener: Send + Sync {
    /// Inspect the surviving batch before it is committed
    ///
    /// # Errors
    ///
    /// Return [`RollbackBatch`] to abandon the batch.
    fn before_reload(&self, _event: &ReloadEvent) -> Result<(), RollbackBatch> {
        Ok(())
    }

    /// Called after the batch was committed
    fn after_reload(&self, event: &ReloadEvent);
}

impl<F> ReloadListener for F
where
    F: Fn(&ReloadEvent) + Send + Sync,
{
    fn after_reload(&self, event: &ReloadEvent) {
        self(event);
    }
}

/// Handle returned on registration, used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct PropertyEntry {
    id: ListenerId,
    /// Only events for this key reach the listener
    key: Option<String>,
    listener: Arc<dyn PropertyChangeListener>,
}

impl PropertyEntry {
    fn accepts(&self, event: &ChangeEvent) -> bool {
        self.key.as_deref().is_none_or(|key| key == event.key)
    }
}

// =============================================================================
// Event Manager
// =============================================================================

/// Registry of change and reload listeners
///
/// Registration and removal may happen from any thread, including from within
/// a listener callback: every dispatch iterates over a snapshot of the list.
pub struct EventManager {
    next_id: AtomicU64,
    property_listeners: RwLock<Vec<Arc<PropertyEntry>>>,
    reload_listeners: RwLock<Vec<(ListenerId, Arc<dyn ReloadListener>)>>,
}

impl EventManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            property_listeners: RwLock::new(Vec::new()),
            reload_listeners: RwLock::new(Vec::new()),
        }
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a listener for every key
    pub fn on_change<L>(&self, listener: L) -> ListenerId
    where
        L: PropertyChangeListener + 'static,
    {
        self.push_property(None, Arc::new(listener))
    }

    /// Register a listener for a single key
    pub fn watch<L>(&self, key: &str, listener: L) -> ListenerId
    where
        L: PropertyChangeListener + 'static,
    {
        self.push_property(Some(key.to_string()), Arc::new(listener))
    }

    fn push_property(
        &self,
        key: Option<String>,
        listener: Arc<dyn PropertyChangeListener>,
    ) -> ListenerId {
        let id = self.next_id();
        self.property_listeners
            .write_recovered()
            .push(Arc::new(PropertyEntry { id, key, listener }));
        id
    }

    /// Register a batch listener
    pub fn on_reload<L>(&self, listener: L) -> ListenerId
    where
        L: ReloadListener + 'static,
    {
        let id = self.next_id();
        self.reload_listeners
            .write_recovered()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns `false` if it was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.property_listeners.write_recovered().retain(|entry| {
            let keep = entry.id != id;
            removed |= !keep;
            keep
        });
        self.reload_listeners.write_recovered().retain(|(entry, _)| {
            let keep = *entry != id;
            removed |= !keep;
            keep
        });
        removed
    }

    /// Remove all listeners
    pub fn clear(&self) {
        self.property_listeners.write_recovered().clear();
        self.reload_listeners.write_recovered().clear();
    }

    fn property_snapshot(&self) -> Vec<Arc<PropertyEntry>> {
        self.property_listeners.read_recovered().clone()
    }

    fn reload_snapshot(&self) -> Vec<Arc<dyn ReloadListener>> {
        self.reload_listeners
            .read_recovered()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn has_reload_listeners(&self) -> bool {
        !self.reload_listeners.read_recovered().is_empty()
    }

    /// Ask every interested listener about one change
    ///
    /// Stops at the first veto.
    pub(crate) fn before_change(&self, event: &ChangeEvent) -> Result<(), Rollback> {
        for entry in self.property_snapshot() {
            if entry.accepts(event) {
                entry.listener.before_change(event)?;
            }
        }
        Ok(())
    }

    pub(crate) fn after_change(&self, event: &ChangeEvent) {
        for entry in self.property_snapshot() {
            if entry.accepts(event) {
                entry.listener.after_change(event);
            }
        }
    }

    pub(crate) fn before_reload(&self, event: &ReloadEvent) -> Result<(), RollbackBatch> {
        for listener in self.reload_snapshot() {
            listener.before_reload(event)?;
        }
        Ok(())
    }

    pub(crate) fn after_reload(&self, event: &ReloadEvent) {
        for listener in self.reload_snapshot() {
            listener.after_reload(event);
        }
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn event(key: &str) -> ChangeEvent {
        ChangeEvent::new(key, None, Some("v".into()))
    }

    #[test]
    fn test_global_listener() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.on_change(move |_: &ChangeEvent| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        events.after_change(&event("test.key"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_specific_listener() {
        let events = EventManager::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        events.watch("theme", move |_: &ChangeEvent| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        events.after_change(&event("theme"));
        events.after_change(&event("language"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    struct Veto(Rollback);

    impl PropertyChangeListener for Veto {
        fn before_change(&self, _event: &ChangeEvent) -> Result<(), Rollback> {
            Err(self.0)
        }

        fn after_change(&self, _event: &ChangeEvent) {}
    }

    #[test]
    fn test_veto_only_applies_to_watched_key() {
        let events = EventManager::new();
        events.watch("locked", Veto(Rollback::Operation));

        assert_eq!(events.before_change(&event("locked")), Err(Rollback::Operation));
        assert_eq!(events.before_change(&event("free")), Ok(()));
    }

    #[test]
    fn test_remove_listener() {
        let events = EventManager::new();
        let id = events.on_change(Veto(Rollback::Batch));

        assert!(events.before_change(&event("a")).is_err());
        assert!(events.remove(id));
        assert!(!events.remove(id));
        assert!(events.before_change(&event("a")).is_ok());
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let events = Arc::new(EventManager::new());
        let inner = Arc::clone(&events);

        events.on_change(move |_: &ChangeEvent| {
            inner.on_change(|_: &ChangeEvent| {});
        });

        events.after_change(&event("a"));
        assert_eq!(events.property_snapshot().len(), 2);
    }

    #[test]
    fn test_reload_listener_receives_batch() {
        let events = EventManager::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        events.on_reload(move |batch: &ReloadEvent| {
            seen_clone.fetch_add(batch.events().len(), Ordering::SeqCst);
        });

        let batch = ReloadEvent::new(
            vec![event("a"), event("b")],
            PropertyStore::new(),
            PropertyStore::new(),
        );
        assert!(events.before_reload(&batch).is_ok());
        events.after_reload(&batch);

        assert!(events.has_reload_listeners());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
