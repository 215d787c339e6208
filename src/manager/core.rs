use crate::config::{ConfigSchema, ConfigSettings, MethodDescriptor};
use crate::convert::ConversionPipeline;
use crate::error::Result;
use crate::events::{ListenerId, PropertyChangeListener, ReloadListener};
use crate::expand::VariableExpander;
use crate::hot_reload::{ReloadMode, ReloadScheduler, StalenessWatcher};
use crate::manager::coordinator::ReloadCoordinator;
use crate::manager::ConfigBuilder;
use log::warn;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A loaded configuration with typed, transactional access.
///
/// The `Config` ties the pieces together:
///
/// - **Sources**: loaded per [`LoadType`](crate::LoadType), with imports and defaults
/// - **Typed reads**: `${...}` expansion plus the conversion pipeline
/// - **Mutations**: set, remove, clear and reload as vetoable transactions
/// - **Change Events**: property and reload listeners
/// - **Caching**: converted values, dropped on every commit
/// - **Hot Reload**: on read or on a background thread
///
/// # Example
///
/// ```rust
/// use rcprops::{Config, MethodDescriptor, PropertyStore, TargetType};
///
/// let overrides: PropertyStore = [("server.hosts", "a, b, c")].into_iter().collect();
/// let config = Config::builder("my_app::Server")
///     .import(overrides)
///     .with_descriptor(MethodDescriptor::of::<u16>().key("server.port").default_value("8080"))
///     .build()
///     .unwrap();
///
/// let port: Option<u16> = config.get_by_key("server.port").unwrap();
/// assert_eq!(port, Some(8080));
///
/// let hosts = MethodDescriptor::new(TargetType::list(TargetType::string())).key("server.hosts");
/// let hosts: Option<Vec<String>> = config.get(&hosts).unwrap();
/// assert_eq!(hosts.unwrap(), ["a", "b", "c"]);
/// ```
pub struct Config {
    /// Settings the configuration was built from
    pub(crate) settings: ConfigSettings,

    /// Live store and mutation protocol
    pub(crate) coordinator: Arc<ReloadCoordinator>,

    /// `${...}` expansion over the environment snapshot
    pub(crate) expander: VariableExpander,

    /// Raw value to typed value
    pub(crate) pipeline: ConversionPipeline,

    /// Registered descriptors keyed by full key
    pub(crate) descriptors: HashMap<String, MethodDescriptor>,

    /// Source file watcher (when hot reload is enabled)
    pub(crate) watcher: Option<Arc<StalenessWatcher>>,

    /// Background reload thread, stopped on drop
    pub(crate) _scheduler: Option<ReloadScheduler>,
}

impl Config {
    /// Create a builder for `Config` with a fluent API.
    ///
    /// This is the recommended way to create a `Config`.
    #[must_use]
    pub fn builder(qualified_name: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(qualified_name)
    }

    /// Build a configuration entirely from a schema type
    ///
    /// # Errors
    ///
    /// See [`ConfigBuilder::build`].
    pub fn from_schema<S: ConfigSchema>() -> Result<Self> {
        ConfigBuilder::new(S::qualified_name()).with_schema::<S>().build()
    }

    /// Get the settings this configuration was built from
    #[must_use]
    pub fn settings(&self) -> &ConfigSettings {
        &self.settings
    }

    /// Get the reload coordinator owning the live store
    #[must_use]
    pub fn coordinator(&self) -> &ReloadCoordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn descriptor(&self, key: &str) -> Option<&MethodDescriptor> {
        self.descriptors.get(key)
    }

    /// Local files watched for hot reload
    #[must_use]
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.watcher
            .as_ref()
            .map(|watcher| watcher.watched_files())
            .unwrap_or_default()
    }

    // =========================================================================
    // Hot reload
    // =========================================================================

    /// Run the staleness check now, regardless of the reload mode
    ///
    /// Returns `true` if a reload was committed.
    ///
    /// # Errors
    ///
    /// Propagates the reload error.
    pub fn check_and_reload(&self) -> Result<bool> {
        match &self.watcher {
            Some(watcher) => watcher.check_and_reload(&self.coordinator),
            None => Ok(false),
        }
    }

    /// The inline check run before reads in [`ReloadMode::Sync`]
    ///
    /// A failed reload keeps the current values and is only logged.
    pub(crate) fn sync_reload_check(&self) {
        let sync = self
            .settings
            .hot_reload
            .is_some_and(|hot_reload| hot_reload.mode == ReloadMode::Sync);
        if sync {
            if let Err(e) = self.check_and_reload() {
                warn!("Hot reload failed, keeping current values: {e}");
            }
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Listen to changes of every key
    ///
    /// # Example
    ///
    /// ```
    /// # use rcprops::*;
    /// # let config = Config::builder("app").build().unwrap();
    /// config.add_property_change_listener(|event: &ChangeEvent| {
    ///     println!("{}: {:?} -> {:?}", event.key, event.old_value, event.new_value);
    /// });
    /// config.set_property("theme", "dark").unwrap();
    /// ```
    pub fn add_property_change_listener<L>(&self, listener: L) -> ListenerId
    where
        L: PropertyChangeListener + 'static,
    {
        self.coordinator.events().on_change(listener)
    }

    /// Listen to changes of one key
    pub fn add_property_change_listener_for<L>(&self, key: &str, listener: L) -> ListenerId
    where
        L: PropertyChangeListener + 'static,
    {
        self.coordinator.events().watch(key, listener)
    }

    /// Listen to whole batches (reload and clear)
    pub fn add_reload_listener<L>(&self, listener: L) -> ListenerId
    where
        L: ReloadListener + 'static,
    {
        self.coordinator.events().on_reload(listener)
    }

    /// Remove a listener; returns `false` if it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.coordinator.events().remove(id)
    }
}
