//! Nested property store with dotted-path lookups and deep merge
//!
//! Values are either plain text or a nested mapping. Lists only exist after
//! conversion; loaders flatten them into delimited text.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Separator for dotted (e.g. "server.http.port") keys
pub const KEY_SEPARATOR: char = '.';

/// A raw entry value as stored before conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Flat textual value
    Text(String),
    /// Nested mapping of key to value
    Map(PropertyStore),
}

impl PropertyValue {
    /// The textual content, if this is a flat value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            PropertyValue::Map(_) => None,
        }
    }

    /// The nested mapping, if this is one
    #[must_use]
    pub fn as_map(&self) -> Option<&PropertyStore> {
        match self {
            PropertyValue::Map(map) => Some(map),
            PropertyValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, PropertyValue::Map(_))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<PropertyStore> for PropertyValue {
    fn from(value: PropertyStore) -> Self {
        PropertyValue::Map(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.write_str(text),
            PropertyValue::Map(map) => map.fmt(f),
        }
    }
}

/// Mapping from key to [`PropertyValue`]
///
/// Lookups accept dotted paths: `get("a.b")` first tries the literal key
/// `"a.b"` and only then descends into the mapping stored under `"a"`.
///
/// There is no locking here; the owning
/// [`ReloadCoordinator`](crate::ReloadCoordinator) provides exclusivity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a possibly dotted key.
    ///
    /// A non-mapping value on the way down yields `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        if let Some(value) = self.entries.get(key) {
            return Some(value);
        }
        let (base, rest) = key.split_once(KEY_SEPARATOR)?;
        match self.entries.get(base)? {
            PropertyValue::Map(nested) => nested.get(rest),
            PropertyValue::Text(_) => None,
        }
    }

    /// Resolve a key and return it only if it holds text
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_text)
    }

    /// Exact-match check; dotted paths are not resolved
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value under the literal key, returning the previous one
    pub fn put(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove the literal key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    /// Deep-merge `from` into this store.
    ///
    /// Where both sides hold a mapping the merge descends; otherwise the
    /// incoming value replaces the existing one. Keys present on only one
    /// side are always kept.
    pub fn merge(&mut self, from: PropertyStore) {
        for (key, incoming) in from.entries {
            match (self.entries.get_mut(&key), incoming) {
                (Some(PropertyValue::Map(existing)), PropertyValue::Map(nested)) => {
                    existing.merge(nested);
                }
                (_, incoming) => {
                    self.entries.insert(key, incoming);
                }
            }
        }
    }

    /// All keys, flattened: every parent key plus every descendant key
    #[must_use]
    pub fn keys_recursive(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.collect_keys(None, &mut keys);
        keys
    }

    fn collect_keys(&self, prefix: Option<&str>, into: &mut BTreeSet<String>) {
        for (key, value) in &self.entries {
            let full = match prefix {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}{KEY_SEPARATOR}{key}"),
                _ => key.clone(),
            };
            if let PropertyValue::Map(nested) = value {
                nested.collect_keys(Some(&full), into);
            }
            into.insert(full);
        }
    }

    /// Top-level keys
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Top-level entries
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyStore
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = PropertyStore::new();
        for (key, value) in iter {
            store.put(key, value);
        }
        store
    }
}

impl IntoIterator for PropertyStore {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for PropertyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

// =============================================================================
// Deserialization (shared by the structured loaders)
// =============================================================================
// Scalars of any kind become text, sequences become comma-joined text and
// nulls are dropped, so JSON, TOML and YAML all land in the same shape.

const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

impl<'de> Deserialize<'de> for PropertyStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PropertyValue::deserialize(deserializer)? {
            PropertyValue::Map(store) => Ok(store),
            PropertyValue::Text(_) => Err(de::Error::custom("expected a mapping at top level")),
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PropertyValueVisitor)
    }
}

struct PropertyValueVisitor;

impl<'de> Visitor<'de> for PropertyValueVisitor {
    type Value = PropertyValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, a list of scalars or a mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<PropertyValue, E> {
        Ok(PropertyValue::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PropertyValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Option<PropertyValue>>()? {
            match item {
                Some(PropertyValue::Text(text)) => items.push(text),
                Some(PropertyValue::Map(_)) => {
                    return Err(de::Error::custom("lists of mappings are not supported"));
                }
                None => {}
            }
        }
        Ok(PropertyValue::Text(items.join(",")))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PropertyValue, A::Error> {
        let mut store = PropertyStore::new();
        while let Some(key) = map.next_key::<PropertyValue>()? {
            let PropertyValue::Text(key) = key else {
                return Err(de::Error::custom("mapping keys must be scalars"));
            };
            if let Some(value) = map.next_value::<Option<PropertyValue>>()? {
                store.put(key, value);
            }
        }
        // TOML datetimes arrive as a single-field marker table
        if store.len() == 1 {
            if let Some(PropertyValue::Text(datetime)) = store.get(TOML_DATETIME_FIELD) {
                return Ok(PropertyValue::Text(datetime.clone()));
            }
        }
        Ok(PropertyValue::Map(store))
    }
}

// =============================================================================
// Tests
// =============================================================================
