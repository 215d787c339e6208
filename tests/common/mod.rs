//! Common test utilities for rcprops integration tests
//!
//! Provides source fixtures in a temporary directory and counting listeners.

#![allow(dead_code)]

use rcprops::{
    ChangeEvent, Config, ConfigBuilder, Environment, PropertyChangeListener, ReloadEvent,
    ReloadListener, Rollback, RollbackBatch, Source,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Source Fixtures
// =============================================================================

/// A temporary directory holding source files
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name`, creating parent directories
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Rewrite `name` and push its timestamp forward so the change is visible
    pub fn touch_with(&self, name: &str, content: &str, age: u64) {
        let path = self.write(name, content);
        set_mtime(&path, SystemTime::now() + Duration::from_secs(age));
    }

    /// `file:` spec for a file in this fixture
    pub fn spec(&self, name: &str) -> String {
        file_spec(&self.path(name))
    }

    /// Builder with an empty environment, so tests are independent of the host
    pub fn builder(&self, name: &str) -> ConfigBuilder {
        Config::builder(name)
            .environment(Environment::empty())
            .classpath_root(self.dir.path())
    }
}

pub fn file_spec(path: &Path) -> String {
    Source::from_path(path).unwrap().url().to_string()
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// =============================================================================
// Listeners
// =============================================================================

/// Records every committed change
#[derive(Default)]
pub struct Recorder {
    pub before: AtomicUsize,
    pub changes: Mutex<Vec<ChangeEvent>>,
}

impl Recorder {
    pub fn keys(&self) -> Vec<String> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.key.clone())
            .collect()
    }
}

impl PropertyChangeListener for Recorder {
    fn before_change(&self, _event: &ChangeEvent) -> Result<(), Rollback> {
        self.before.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn after_change(&self, event: &ChangeEvent) {
        self.changes.lock().unwrap().push(event.clone());
    }
}

/// Counts committed batches and their sizes
#[derive(Default)]
pub struct BatchCounter {
    pub batches: AtomicUsize,
    pub events: AtomicUsize,
}

impl ReloadListener for BatchCounter {
    fn after_reload(&self, event: &ReloadEvent) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.events.fetch_add(event.events().len(), Ordering::SeqCst);
    }
}

/// Vetoes changes of one key with the configured rollback
pub struct Veto {
    pub key: &'static str,
    pub rollback: Rollback,
}

impl PropertyChangeListener for Veto {
    fn before_change(&self, event: &ChangeEvent) -> Result<(), Rollback> {
        if event.key == self.key {
            return Err(self.rollback);
        }
        Ok(())
    }

    fn after_change(&self, _event: &ChangeEvent) {}
}

/// Abandons every batch
pub struct RefuseBatches;

impl ReloadListener for RefuseBatches {
    fn before_reload(&self, _event: &ReloadEvent) -> Result<(), RollbackBatch> {
        Err(RollbackBatch)
    }

    fn after_reload(&self, _event: &ReloadEvent) {}
}

/// Registers a listener while the test keeps a handle to it
pub struct Shared<T>(pub Arc<T>);

impl<T> Shared<T> {
    pub fn of(inner: &Arc<T>) -> Self {
        Self(Arc::clone(inner))
    }
}

impl<T: PropertyChangeListener> PropertyChangeListener for Shared<T> {
    fn before_change(&self, event: &ChangeEvent) -> Result<(), Rollback> {
        self.0.before_change(event)
    }

    fn after_change(&self, event: &ChangeEvent) {
        self.0.after_change(event);
    }
}

impl<T: ReloadListener> ReloadListener for Shared<T> {
    fn before_reload(&self, event: &ReloadEvent) -> Result<(), RollbackBatch> {
        self.0.before_reload(event)
    }

    fn after_reload(&self, event: &ReloadEvent) {
        self.0.after_reload(event);
    }
}
