//! Reload on source file changes
//!
//! A [`StalenessWatcher`] remembers the modification time of every local
//! source file. When asked, and at most once per interval, it compares them
//! with the file system and reloads the configuration if any differ.
//!
//! In [`ReloadMode::Sync`] the check runs before each read; in
//! [`ReloadMode::Async`] a background thread runs it on a fixed schedule.

use crate::error::{Error, Result};
use crate::manager::ReloadCoordinator;
use crate::sync::MutexExt;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, TryLockError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

/// When the staleness check runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadMode {
    /// Inline, before every read (default)
    #[default]
    Sync,
    /// On a background thread, every interval
    Async,
}

/// Hot reload settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotReload {
    /// Minimum time between two checks
    pub interval: Duration,
    pub mode: ReloadMode,
}

impl HotReload {
    /// Check before reads, at most once per `interval`
    #[must_use]
    pub fn sync(interval: Duration) -> Self {
        Self {
            interval,
            mode: ReloadMode::Sync,
        }
    }

    /// Check on a background thread every `interval`
    #[must_use]
    pub fn background(interval: Duration) -> Self {
        Self {
            interval,
            mode: ReloadMode::Async,
        }
    }

    /// # Errors
    ///
    /// Background checks need a non-zero interval.
    pub fn validate(&self) -> Result<()> {
        if self.mode == ReloadMode::Async && self.interval.is_zero() {
            return Err(Error::Config(
                "Background hot reload needs an interval greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for HotReload {
    fn default() -> Self {
        Self::sync(Duration::from_secs(5))
    }
}

// =============================================================================
// Staleness Watcher
// =============================================================================

struct WatchedFile {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl WatchedFile {
    fn new(path: PathBuf) -> Self {
        let modified = modified(&path);
        Self { path, modified }
    }

    fn is_changed(&self) -> bool {
        modified(&self.path) != self.modified
    }

    fn refresh(&mut self) {
        self.modified = modified(&self.path);
    }
}

/// `None` for missing files, so creating or deleting one counts as a change
fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

struct WatchState {
    last_check: Instant,
    files: Vec<WatchedFile>,
}

/// Tracks source file modification times
pub struct StalenessWatcher {
    interval: Duration,
    state: Mutex<WatchState>,
}

impl StalenessWatcher {
    /// Start watching `paths`; their current timestamps are the baseline
    #[must_use]
    pub fn new(interval: Duration, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let files: Vec<_> = paths.into_iter().map(WatchedFile::new).collect();
        debug!("Watching {} files for changes", files.len());
        Self {
            interval,
            state: Mutex::new(WatchState {
                last_check: Instant::now(),
                files,
            }),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.state
            .lock_recovered()
            .files
            .iter()
            .map(|file| file.path.clone())
            .collect()
    }

    /// Reload `coordinator` if any watched file changed
    ///
    /// Skipped (returning `Ok(false)`) while a load or another mutation is
    /// running, while another check is in progress, or when the interval has
    /// not yet elapsed. All timestamps are refreshed whenever a change is
    /// reloaded, even if the reload then fails.
    ///
    /// # Errors
    ///
    /// Propagates the reload error.
    pub fn check_and_reload(&self, coordinator: &ReloadCoordinator) -> Result<bool> {
        if coordinator.is_loading() {
            return Ok(false);
        }
        // A listener reading the config during our own reload lands here
        let mut state = match self.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Ok(false),
        };

        let now = Instant::now();
        if now.duration_since(state.last_check) < self.interval {
            return Ok(false);
        }
        state.last_check = now;

        let Some(changed) = state.files.iter().find(|file| file.is_changed()) else {
            return Ok(false);
        };
        let changed = changed.path.clone();

        // Busy with another mutation: timestamps stay stale so the next check retries
        let reloaded = coordinator.try_reload(|| {
            info!("Source {} changed, reloading", changed.display());
            state.files.iter_mut().for_each(WatchedFile::refresh);
        })?;
        Ok(reloaded.unwrap_or(false))
    }
}

// =============================================================================
// Background Scheduler
// =============================================================================

/// Runs the staleness check on its own thread until dropped
pub(crate) struct ReloadScheduler {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReloadScheduler {
    pub(crate) fn start(
        watcher: Arc<StalenessWatcher>,
        coordinator: Weak<ReloadCoordinator>,
    ) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let interval = watcher.interval();

        let handle = thread::Builder::new()
            .name("rcprops-hot-reload".into())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(interval) {
                    let Some(coordinator) = coordinator.upgrade() else {
                        break;
                    };
                    if let Err(e) = watcher.check_and_reload(&coordinator) {
                        warn!("Background reload failed: {e}");
                    }
                }
                debug!("Hot reload thread stopped");
            })
            .map_err(|e| Error::Config(format!("Cannot start hot reload thread: {e}")))?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Hot reload thread panicked");
            }
        }
    }
}
