//! Builder for Config
//!
//! This module contains [`ConfigBuilder`] which provides a fluent API
//! for creating a [`Config`](super::Config).

use crate::cache::CacheStrategy;
use crate::config::{ConfigSchema, ConfigSettingsBuilder, MethodDescriptor};
use crate::convert::{ConversionPipeline, TypeRegistry};
use crate::error::Result;
use crate::expand::{Environment, VariableExpander};
use crate::hot_reload::{HotReload, ReloadMode, ReloadScheduler, StalenessWatcher};
use crate::loaders::{Loader, LoadersManager};
use crate::manager::coordinator::{LoadPlan, ReloadCoordinator};
use crate::manager::LoadType;
use crate::sources::{classpath_prefix, ResourcesPathResolver, Source, SourceResolver};
use crate::store::PropertyStore;
use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::Config;

/// Builder for creating a [`Config`] with a fluent API.
///
/// # Example
///
/// ```rust,no_run
/// use rcprops::{Config, HotReload, LoadType, MethodDescriptor};
/// use std::time::Duration;
///
/// let config = Config::builder("my_app::Server")
///     .source("file:${user.home}/.server.properties")
///     .source("file:/etc/server.properties")
///     .load_type(LoadType::Merge)
///     .with_descriptor(MethodDescriptor::of::<u16>().key("port").default_value("8080"))
///     .hot_reload(HotReload::sync(Duration::from_secs(5)))
///     .build()
///     .unwrap();
///
/// let port: Option<u16> = config.get_by_key("port").unwrap();
/// ```
pub struct ConfigBuilder {
    settings: ConfigSettingsBuilder,
    descriptors: HashMap<String, MethodDescriptor>,
    loaders: Vec<Arc<dyn Loader>>,
    resources: Option<Arc<dyn ResourcesPathResolver>>,
    registry: TypeRegistry,
}

impl ConfigBuilder {
    /// Create a new builder; `qualified_name` names the default sources
    #[must_use]
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            settings: ConfigSettingsBuilder::new(qualified_name),
            descriptors: HashMap::new(),
            loaders: Vec::new(),
            resources: None,
            registry: TypeRegistry::new(),
        }
    }

    /// Append a source spec (URL, `classpath:` or `resources:`)
    #[must_use]
    pub fn source(mut self, spec: impl Into<String>) -> Self {
        self.settings = self.settings.source(spec);
        self
    }

    #[must_use]
    pub fn sources<I, S>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for spec in specs {
            self.settings = self.settings.source(spec);
        }
        self
    }

    #[must_use]
    pub fn load_type(mut self, load_type: LoadType) -> Self {
        self.settings = self.settings.load_type(load_type);
        self
    }

    /// Register a property; its default seeds the store on every load
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: MethodDescriptor) -> Self {
        self.descriptors.insert(descriptor.full_key(), descriptor);
        self
    }

    /// Take name, sources, load type, hot reload, tokenizer and descriptors
    /// from a schema type
    ///
    /// Settings applied afterwards override the schema's.
    #[must_use]
    pub fn with_schema<S: ConfigSchema>(mut self) -> Self {
        self.settings = self.settings.qualified_name(S::qualified_name());
        for spec in S::sources() {
            self.settings = self.settings.source(spec);
        }
        self.settings = self.settings.load_type(S::load_type());
        if let Some(hot_reload) = S::hot_reload() {
            self.settings = self.settings.hot_reload(hot_reload);
        }

        let type_tokenizer = S::tokenizer();
        for descriptor in S::descriptors().into_values() {
            let mut descriptor = descriptor;
            if descriptor.type_tokenizer.is_empty() {
                descriptor.type_tokenizer = type_tokenizer.clone();
            }
            self = self.with_descriptor(descriptor);
        }
        self
    }

    /// Merge a store over the loaded sources; earlier imports win
    #[must_use]
    pub fn import(mut self, props: PropertyStore) -> Self {
        self.settings = self.settings.import(props);
        self
    }

    #[must_use]
    pub fn hot_reload(mut self, hot_reload: HotReload) -> Self {
        self.settings = self.settings.hot_reload(hot_reload);
        self
    }

    #[must_use]
    pub fn cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.settings = self.settings.cache_strategy(strategy);
        self
    }

    /// Use an explicit environment snapshot (default: the process environment)
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.settings = self.settings.environment(environment);
        self
    }

    #[must_use]
    pub fn system_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings = self.settings.system_property(name, value);
        self
    }

    /// Add a search root for `classpath:` sources
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn classpath_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.classpath_root(path);
        self
    }

    #[must_use]
    pub fn resources_resolver(mut self, resolver: Arc<dyn ResourcesPathResolver>) -> Self {
        self.resources = Some(resolver);
        self
    }

    /// Register a loader; the newest loader is consulted first
    #[must_use]
    pub fn register_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Register editors, parsers, factories or collections
    ///
    /// ```rust
    /// use rcprops::{Config, Value};
    ///
    /// let config = Config::builder("app")
    ///     .register_types(|types| {
    ///         types.register_factory("Level", |text| Some(Value::from(text.to_uppercase())));
    ///     })
    ///     .build()
    ///     .unwrap();
    /// # drop(config);
    /// ```
    #[must_use]
    pub fn register_types<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut TypeRegistry),
    {
        register(&mut self.registry);
        self
    }

    /// Build the [`Config`].
    ///
    /// Resolves every source, performs the initial load and starts the
    /// background reload thread if requested.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The cache or hot reload settings are invalid
    /// - A source spec is malformed, or uses `resources:` with no resolver set
    /// - A source cannot be parsed
    pub fn build(self) -> Result<Config> {
        let settings = self.settings.build();
        settings.cache_strategy.validate()?;
        if let Some(hot_reload) = &settings.hot_reload {
            hot_reload.validate()?;
        }

        let expander = VariableExpander::new(settings.environment.clone());

        // Imports are visible to `${...}` in source specs and default keys
        let mut imported = PropertyStore::new();
        for import in settings.imports.iter().rev() {
            imported.merge(import.clone());
        }

        let loaders = Arc::new(LoadersManager::with_defaults());
        for loader in self.loaders {
            loaders.register(loader);
        }

        let mut resolver = SourceResolver::new(expander.clone()).with_properties(imported.clone());
        for root in &settings.classpath_roots {
            resolver = resolver.with_classpath_root(root);
        }
        if let Some(resources) = self.resources {
            resolver = resolver.with_resources_resolver(resources);
        }

        let specs = if settings.sources.is_empty() {
            let defaults = loaders.default_specs(&classpath_prefix(&settings.qualified_name));
            debug!("No sources declared, trying defaults {defaults:?}");
            defaults
        } else {
            settings.sources.clone()
        };
        let mut sources = Vec::with_capacity(specs.len());
        for spec in &specs {
            if let Some(source) = resolver.resolve(spec)? {
                sources.push(source);
            }
        }

        let defaults = self
            .descriptors
            .values()
            .filter_map(|descriptor| {
                let default = descriptor.default_value.clone()?;
                let key = if descriptor.variable_expansion {
                    expander.expand(&descriptor.full_key(), &imported)
                } else {
                    descriptor.full_key()
                };
                Some((key, default))
            })
            .collect();

        let plan = LoadPlan {
            sources,
            load_type: settings.load_type,
            loaders,
            defaults,
            imports: settings.imports.clone(),
        };
        let coordinator = Arc::new(ReloadCoordinator::new(plan, settings.cache_strategy));
        coordinator.load()?;

        let watcher = settings.hot_reload.map(|hot_reload| {
            let files = coordinator.sources().iter().filter_map(Source::local_path);
            Arc::new(StalenessWatcher::new(hot_reload.interval, files))
        });
        let scheduler = match (&settings.hot_reload, &watcher) {
            (Some(hot_reload), Some(watcher)) if hot_reload.mode == ReloadMode::Async => Some(
                ReloadScheduler::start(Arc::clone(watcher), Arc::downgrade(&coordinator))?,
            ),
            _ => None,
        };

        info!(
            "Initialized configuration '{}' from {} of {} sources",
            settings.qualified_name,
            coordinator.sources().len(),
            specs.len()
        );

        Ok(Config {
            settings,
            coordinator,
            expander,
            pipeline: ConversionPipeline::new(Arc::new(self.registry)),
            descriptors: self.descriptors,
            watcher,
            _scheduler: scheduler,
        })
    }
}

impl std::fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("settings", &self.settings)
            .field("descriptors", &self.descriptors.keys().collect::<Vec<_>>())
            .field("loaders", &self.loaders.len())
            .field("has_resources_resolver", &self.resources.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}
