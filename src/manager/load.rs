//! Load strategies for combining several sources into one store

use crate::error::Result;
use crate::loaders::LoadersManager;
use crate::sources::Source;
use crate::store::PropertyStore;
use log::debug;

/// How multiple sources are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadType {
    /// Use the first source that can be read (default)
    #[default]
    First,
    /// Read every source; on conflicting keys the earlier source wins
    Merge,
}

impl LoadType {
    /// Load `sources` according to this strategy
    ///
    /// Unreadable sources are skipped; if none can be read the result is an
    /// empty store.
    ///
    /// # Errors
    ///
    /// Propagates parse errors and [`Error::NoLoader`](crate::Error::NoLoader).
    pub fn load(self, sources: &[Source], loaders: &LoadersManager) -> Result<PropertyStore> {
        match self {
            LoadType::First => {
                for source in sources {
                    if let Some(store) = loaders.load(source)? {
                        debug!("Using first readable source {source}");
                        return Ok(store);
                    }
                }
                debug!("None of {} sources could be read", sources.len());
                Ok(PropertyStore::new())
            }
            LoadType::Merge => {
                let mut merged = PropertyStore::new();
                for source in sources.iter().rev() {
                    if let Some(store) = loaders.load(source)? {
                        merged.merge(store);
                    }
                }
                Ok(merged)
            }
        }
    }
}
