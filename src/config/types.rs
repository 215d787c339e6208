//! Builder-side settings for a configuration instance

use crate::cache::CacheStrategy;
use crate::expand::Environment;
use crate::hot_reload::HotReload;
use crate::manager::LoadType;
use crate::store::PropertyStore;
use std::path::PathBuf;

/// Everything a [`Config`](crate::Config) needs besides descriptors and
/// pluggable components
#[derive(Debug, Clone)]
pub struct ConfigSettings {
    /// Name the default sources are derived from (e.g. `my_app::Server`)
    pub qualified_name: String,

    /// Source specs in priority order; empty means the default sources
    pub sources: Vec<String>,

    /// How multiple sources are combined
    pub load_type: LoadType,

    /// Reload on source file changes, if set
    pub hot_reload: Option<HotReload>,

    /// Caching of converted values
    pub cache_strategy: CacheStrategy,

    /// Environment variables and system properties for `${...}` expansion
    pub environment: Environment,

    /// Search roots for the `classpath:` scheme (default: current directory)
    pub classpath_roots: Vec<PathBuf>,

    /// Stores merged over the loaded sources; the first has the highest priority
    pub imports: Vec<PropertyStore>,
}

impl ConfigSettings {
    /// Create a new builder for `ConfigSettings`
    ///
    /// # Example
    /// ```rust
    /// use rcprops::{ConfigSettings, LoadType};
    ///
    /// let settings = ConfigSettings::builder("my_app::Server")
    ///     .source("file:~/.server.properties")
    ///     .load_type(LoadType::Merge)
    ///     .build();
    ///
    /// assert_eq!(settings.sources.len(), 1);
    /// ```
    #[must_use]
    pub fn builder(qualified_name: impl Into<String>) -> ConfigSettingsBuilder {
        ConfigSettingsBuilder::new(qualified_name)
    }
}

/// Builder for creating [`ConfigSettings`] with a fluent API
#[derive(Debug, Clone)]
pub struct ConfigSettingsBuilder {
    qualified_name: String,
    sources: Vec<String>,
    load_type: LoadType,
    hot_reload: Option<HotReload>,
    cache_strategy: CacheStrategy,
    environment: Option<Environment>,
    system_properties: Vec<(String, String)>,
    classpath_roots: Vec<PathBuf>,
    imports: Vec<PropertyStore>,
}

impl ConfigSettingsBuilder {
    #[must_use]
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            sources: Vec::new(),
            load_type: LoadType::First,
            hot_reload: None,
            cache_strategy: CacheStrategy::Full,
            environment: None,
            system_properties: Vec::new(),
            classpath_roots: Vec::new(),
            imports: Vec::new(),
        }
    }

    #[must_use]
    pub fn qualified_name(mut self, name: impl Into<String>) -> Self {
        self.qualified_name = name.into();
        self
    }

    /// Append a source spec
    #[must_use]
    pub fn source(mut self, spec: impl Into<String>) -> Self {
        self.sources.push(spec.into());
        self
    }

    #[must_use]
    pub fn load_type(mut self, load_type: LoadType) -> Self {
        self.load_type = load_type;
        self
    }

    #[must_use]
    pub fn hot_reload(mut self, hot_reload: HotReload) -> Self {
        self.hot_reload = Some(hot_reload);
        self
    }

    #[must_use]
    pub fn cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    /// Use an explicit environment snapshot instead of capturing the process
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set a system property, on top of whatever environment is used
    #[must_use]
    pub fn system_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.push((name.into(), value.into()));
        self
    }

    /// Add a search root for `classpath:` sources
    ///
    /// Supports `~` expansion for home directory.
    #[must_use]
    pub fn classpath_root(mut self, path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        let expanded = if path.starts_with("~") {
            if let Some(home) = dirs::home_dir() {
                home.join(path.strip_prefix("~").unwrap_or(&path))
            } else {
                path
            }
        } else {
            path
        };
        self.classpath_roots.push(expanded);
        self
    }

    #[must_use]
    pub fn import(mut self, props: PropertyStore) -> Self {
        self.imports.push(props);
        self
    }

    /// Build the settings, capturing the process environment if none was given
    #[must_use]
    pub fn build(self) -> ConfigSettings {
        let mut environment = self.environment.unwrap_or_else(Environment::capture);
        for (name, value) in self.system_properties {
            environment.set_system_property(name, value);
        }

        ConfigSettings {
            qualified_name: self.qualified_name,
            sources: self.sources,
            load_type: self.load_type,
            hot_reload: self.hot_reload,
            cache_strategy: self.cache_strategy,
            environment,
            classpath_roots: self.classpath_roots,
            imports: self.imports,
        }
    }
}
