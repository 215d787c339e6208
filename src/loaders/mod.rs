//! Source format loaders
//!
//! A [`Loader`] turns the text of one source into a [`PropertyStore`]. The
//! [`LoadersManager`] picks the loader for each source and owns the I/O:
//! unreadable sources are skipped, while unparseable ones are errors.

mod properties;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "toml")]
mod toml;
#[cfg(feature = "yaml")]
mod yaml;

pub use properties::PropertiesLoader;

#[cfg(feature = "json")]
pub use json::JsonLoader;
#[cfg(feature = "toml")]
pub use self::toml::TomlLoader;
#[cfg(feature = "yaml")]
pub use yaml::YamlLoader;

use crate::error::{Error, Result};
use crate::sources::Source;
use crate::store::PropertyStore;
use crate::sync::RwLockExt;
use log::{debug, warn};
use std::sync::{Arc, RwLock};
use url::Url;

/// Trait for source format implementations
pub trait Loader: Send + Sync {
    /// Whether this loader understands the source, usually by extension
    fn accept(&self, url: &Url) -> bool;

    /// Parse the full text of a source
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] (or [`Error::Json`]) for malformed content.
    fn load(&self, content: &str) -> Result<PropertyStore>;

    /// Default source spec for a `classpath:` prefix, or `None` to opt out
    fn default_spec(&self, prefix: &str) -> Option<String>;
}

/// Does the URL path end with one of `extensions` (case-insensitive)?
pub(crate) fn has_extension(url: &Url, extensions: &[&str]) -> bool {
    let path = url.path().to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}

// =============================================================================
// Loaders Manager
// =============================================================================

/// Ordered loader registry; the most recently registered loader wins
pub struct LoadersManager {
    loaders: RwLock<Vec<Arc<dyn Loader>>>,
}

impl LoadersManager {
    /// A registry with no loaders
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: RwLock::new(Vec::new()),
        }
    }

    /// A registry with every loader enabled by crate features
    ///
    /// `PropertiesLoader` accepts any source, so it is registered first and
    /// consulted last.
    #[must_use]
    pub fn with_defaults() -> Self {
        let manager = Self::new();
        manager.register(Arc::new(PropertiesLoader));
        #[cfg(feature = "yaml")]
        manager.register(Arc::new(YamlLoader));
        #[cfg(feature = "toml")]
        manager.register(Arc::new(TomlLoader));
        #[cfg(feature = "json")]
        manager.register(Arc::new(JsonLoader));
        manager
    }

    /// Register a loader ahead of all existing ones
    pub fn register(&self, loader: Arc<dyn Loader>) {
        self.loaders.write_recovered().insert(0, loader);
    }

    /// Remove every loader
    pub fn clear(&self) {
        self.loaders.write_recovered().clear();
    }

    fn find(&self, url: &Url) -> Option<Arc<dyn Loader>> {
        self.loaders
            .read_recovered()
            .iter()
            .find(|loader| loader.accept(url))
            .cloned()
    }

    /// Default specs for `prefix`, in loader priority order
    #[must_use]
    pub fn default_specs(&self, prefix: &str) -> Vec<String> {
        self.loaders
            .read_recovered()
            .iter()
            .filter_map(|loader| loader.default_spec(prefix))
            .collect()
    }

    /// Read and parse one source
    ///
    /// Returns `Ok(None)` when the source cannot be read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoLoader`] when no loader accepts a readable source,
    /// or the loader's error when the content is malformed.
    pub fn load(&self, source: &Source) -> Result<Option<PropertyStore>> {
        let content = match source.read() {
            Ok(content) => content,
            Err(Error::FileRead { path, source: err })
                if err.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!("Skipping missing source {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                warn!("Skipping unreadable source: {e}");
                return Ok(None);
            }
        };

        let loader = self
            .find(source.url())
            .ok_or_else(|| Error::NoLoader(source.to_string()))?;
        let store = loader.load(&content)?;
        debug!("Loaded {} top-level keys from {source}", store.len());
        Ok(Some(store))
    }
}

impl Default for LoadersManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
