use crate::config::MethodDescriptor;
use crate::convert::{FromValue, Value};
use crate::error::{Error, Result};
use crate::manager::cache::CacheKey;
use crate::manager::core::Config;
use crate::store::{PropertyStore, PropertyValue};
use log::trace;
use std::collections::BTreeSet;
use std::fmt;
use std::io;

impl Config {
    // =========================================================================
    // Typed reads
    // =========================================================================

    /// Read and convert the property described by `method`.
    ///
    /// Runs the sync hot reload check, expands `${...}` in the key and in text
    /// values, then converts through the pipeline. Results are cached per
    /// descriptor unless caching is off for it.
    ///
    /// Returns `Ok(None)` for an absent key or a converter signalling "no
    /// value".
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key expands to the empty string
    /// - No conversion strategy applies, or a declared converter or tokenizer fails
    pub fn value(&self, method: &MethodDescriptor) -> Result<Option<Value>> {
        self.sync_reload_check();

        let (cache_key, raw, generation) = {
            let store = self.coordinator.read();
            let key = self.resolve_key(method, &store)?;
            let cache_key = method.caching.then(|| CacheKey::new(&key, method));
            if let Some(cached) = cache_key.as_ref().and_then(|k| self.coordinator.cache().get(k)) {
                trace!("Cache hit for '{key}'");
                return Ok(Some(cached));
            }

            let Some(raw) = store.get(&key) else {
                return Ok(None);
            };
            let raw = match raw {
                PropertyValue::Text(text) if method.variable_expansion => {
                    PropertyValue::Text(self.expander.expand_value(&key, text, &store))
                }
                other => other.clone(),
            };
            // Taken under the read lock, so it names the store `raw` came from
            let generation = self.coordinator.cache().generation();
            (cache_key, raw, generation)
        };

        // Converters run without the store lock and may read the configuration
        let value = self.pipeline.convert(method, &raw)?;
        if let (Some(cache_key), Some(value)) = (cache_key, &value) {
            if !self.coordinator.cache().insert(generation, cache_key, value.clone()) {
                trace!("Store changed during conversion, result not cached");
            }
        }
        Ok(value)
    }

    /// Read, convert and extract the property described by `method`
    ///
    /// # Errors
    ///
    /// See [`value`](Self::value); also fails when the converted value does
    /// not fit `T`.
    pub fn get<T: FromValue>(&self, method: &MethodDescriptor) -> Result<Option<T>> {
        self.value(method)?.map(T::from_value).transpose()
    }

    /// [`value`](Self::value) for a registered descriptor
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if no descriptor is registered under `key`.
    pub fn value_by_key(&self, key: &str) -> Result<Option<Value>> {
        let method = self
            .descriptors
            .get(key)
            .ok_or_else(|| Error::InvalidKey(format!("no descriptor registered for '{key}'")))?;
        self.value(method)
    }

    /// [`get`](Self::get) for a registered descriptor
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if no descriptor is registered under `key`.
    pub fn get_by_key<T: FromValue>(&self, key: &str) -> Result<Option<T>> {
        self.value_by_key(key)?.map(T::from_value).transpose()
    }

    fn resolve_key(&self, method: &MethodDescriptor, store: &PropertyStore) -> Result<String> {
        let key = method.full_key();
        let key = if method.variable_expansion {
            self.expander.expand(&key, store)
        } else {
            key
        };
        if key.is_empty() {
            return Err(Error::InvalidKey(format!(
                "'{}' resolves to an empty key",
                method.full_key()
            )));
        }
        Ok(key)
    }

    // =========================================================================
    // Raw access
    // =========================================================================

    /// Text stored under `key`, without expansion or conversion
    ///
    /// Nested mappings are not text; use [`property`](Self::property) for them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn get_property(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .property(key)?
            .and_then(|value| value.as_text().map(str::to_string)))
    }

    /// Like [`get_property`](Self::get_property) with a fallback
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn get_property_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_property(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Raw value under a possibly dotted `key`, text or mapping
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn property(&self, key: &str) -> Result<Option<PropertyValue>> {
        if key.is_empty() {
            return Err(Error::InvalidKey("key must not be empty".into()));
        }
        self.sync_reload_check();
        Ok(self.coordinator.read().get(key).cloned())
    }

    /// Every key, nested ones flattened with dots
    #[must_use]
    pub fn property_names(&self) -> BTreeSet<String> {
        self.sync_reload_check();
        self.coordinator.read().keys_recursive()
    }

    /// A copy of the current store
    #[must_use]
    pub fn snapshot(&self) -> PropertyStore {
        self.sync_reload_check();
        self.coordinator.snapshot()
    }

    /// Print every text property as `key=value`, one per line
    ///
    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        let store = self.snapshot();
        writeln!(out, "-- listing properties --")?;
        for key in store.keys_recursive() {
            if let Some(text) = store.get_text(&key) {
                writeln!(out, "{key}={text}")?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set `key` to `value`, as a vetoable transaction
    ///
    /// Both mutations work on literal keys. Setting `server.port` over a
    /// source that nests `port` under `server` stores a separate entry that
    /// shadows the nested one for reads; the nested value is reported as no
    /// previous value.
    ///
    /// Returns the previous text value. Must not be called from a listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn set_property(&self, key: &str, value: impl Into<String>) -> Result<Option<String>> {
        let old = self.coordinator.set_property(key, value.into())?;
        Ok(old.and_then(|value| value.as_text().map(str::to_string)))
    }

    /// Remove `key`, as a vetoable transaction
    ///
    /// Only literal keys are removed. After removing a `server.port` set
    /// through [`set_property`](Self::set_property), a nested `server.port`
    /// from a source becomes visible again; a key that only exists nested
    /// cannot be removed and yields `None`.
    ///
    /// Returns the removed text value. Must not be called from a listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an empty key.
    pub fn remove_property(&self, key: &str) -> Result<Option<String>> {
        let old = self.coordinator.remove_property(key)?;
        Ok(old.and_then(|value| value.as_text().map(str::to_string)))
    }

    /// Remove every key as one batch; `false` if a listener rolled it back
    pub fn clear(&self) -> bool {
        self.coordinator.clear()
    }

    /// Reload all sources; `false` if a listener rolled the batch back
    ///
    /// # Errors
    ///
    /// Returns the load error; the current values are kept in that case.
    pub fn reload(&self) -> Result<bool> {
        self.coordinator.reload()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.settings.qualified_name,
            self.coordinator.snapshot()
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.settings.qualified_name)
            .field("sources", &self.coordinator.sources())
            .field("load_type", &self.coordinator.load_type())
            .field("descriptors", &self.descriptors.len())
            .finish_non_exhaustive()
    }
}
