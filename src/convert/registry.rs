//! Named constructors consulted by the single-value conversion strategies

use super::value::Value;
use crate::error::Result;
use crate::store::PropertyValue;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type Editor = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;
type Parser = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
type Constructor = Arc<dyn Fn(&PropertyValue) -> Option<Value> + Send + Sync>;
type CollectionBuilder = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Lookup tables for the conversion pipeline, keyed by type name
///
/// Each table backs one strategy:
///
/// | table | strategy | on failure |
/// |-------|----------|------------|
/// | editors | text editor | error propagates |
/// | parsers | single-string constructor | falls through |
/// | factories | static factory (`value_of`) | falls through |
/// | constructors | constructor taking the raw value | falls through |
///
/// Primitive Rust types and `String` come pre-registered as parsers.
#[derive(Clone)]
pub struct TypeRegistry {
    editors: HashMap<String, Editor>,
    parsers: HashMap<String, Parser>,
    factories: HashMap<String, Parser>,
    constructors: HashMap<String, Constructor>,
    collections: HashMap<String, CollectionBuilder>,
    type_names: HashSet<String>,
}

impl TypeRegistry {
    /// A registry with the primitive types pre-registered
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_primitive::<bool>();
        registry.register_primitive::<char>();
        registry.register_primitive::<i8>();
        registry.register_primitive::<i16>();
        registry.register_primitive::<i32>();
        registry.register_primitive::<i64>();
        registry.register_primitive::<isize>();
        registry.register_primitive::<u8>();
        registry.register_primitive::<u16>();
        registry.register_primitive::<u32>();
        registry.register_primitive::<u64>();
        registry.register_primitive::<usize>();
        registry.register_primitive::<f32>();
        registry.register_primitive::<f64>();
        registry.register_primitive::<String>();
        registry.register_type_name(std::any::type_name::<std::path::PathBuf>());
        registry
    }

    /// A registry that knows no types at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            editors: HashMap::new(),
            parsers: HashMap::new(),
            factories: HashMap::new(),
            constructors: HashMap::new(),
            collections: HashMap::new(),
            type_names: HashSet::new(),
        }
    }

    fn register_primitive<T>(&mut self)
    where
        T: FromStr + Into<Value> + 'static,
    {
        let name = std::any::type_name::<T>().to_string();
        self.type_names.insert(name.clone());
        self.parsers.insert(
            name,
            Arc::new(|text: &str| text.parse::<T>().ok().map(Into::into)),
        );
    }

    /// Make a type name resolvable by the type-reference strategy
    pub fn register_type_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.type_names.insert(name.into());
        self
    }

    /// Register a text editor for the named type
    ///
    /// Editors run before every other single-value strategy; their errors are
    /// reported to the caller.
    pub fn register_editor<F>(&mut self, name: impl Into<String>, editor: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.type_names.insert(name.clone());
        self.editors.insert(name, Arc::new(editor));
        self
    }

    /// Register `T`'s [`FromStr`] as its single-string constructor
    ///
    /// Values are wrapped with [`Value::custom`]; a parse failure lets the
    /// next strategy try.
    pub fn register_from_str<T>(&mut self) -> &mut Self
    where
        T: FromStr + Any + Send + Sync,
    {
        let name = std::any::type_name::<T>().to_string();
        self.type_names.insert(name.clone());
        self.parsers.insert(
            name,
            Arc::new(|text: &str| text.parse::<T>().ok().map(Value::custom)),
        );
        self
    }

    /// Register a named static factory taking the text value
    ///
    /// Returning `None` lets the next strategy try.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.type_names.insert(name.clone());
        self.factories.insert(name, Arc::new(factory));
        self
    }

    /// Register a constructor receiving the raw value, text or mapping
    ///
    /// Returning `None` lets the next strategy try.
    pub fn register_constructor<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&PropertyValue) -> Option<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.type_names.insert(name.clone());
        self.constructors.insert(name, Arc::new(constructor));
        self
    }

    /// Register a collection type that is built empty and then extended
    pub fn register_collection<C>(&mut self, name: impl Into<String>) -> &mut Self
    where
        C: Default + Extend<Value> + Any + Send + Sync,
    {
        self.collections.insert(
            name.into(),
            Arc::new(|items: Vec<Value>| {
                let mut collection = C::default();
                collection.extend(items);
                Value::custom(collection)
            }),
        );
        self
    }

    #[must_use]
    pub fn knows_type(&self, name: &str) -> bool {
        self.type_names.contains(name)
    }

    pub(crate) fn edit(&self, name: &str, text: &str) -> Option<Result<Value>> {
        self.editors.get(name).map(|editor| editor(text))
    }

    pub(crate) fn parse(&self, name: &str, text: &str) -> Option<Value> {
        self.parsers.get(name).and_then(|parser| parser(text))
    }

    pub(crate) fn value_of(&self, name: &str, text: &str) -> Option<Value> {
        self.factories.get(name).and_then(|factory| factory(text))
    }

    pub(crate) fn construct(&self, name: &str, raw: &PropertyValue) -> Option<Value> {
        self.constructors
            .get(name)
            .and_then(|constructor| constructor(raw))
    }

    pub(crate) fn build_collection(&self, name: &str, items: Vec<Value>) -> Option<Value> {
        self.collections.get(name).map(|builder| builder(items))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.type_names.iter().collect();
        names.sort();
        f.debug_struct("TypeRegistry")
            .field("types", &names)
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .finish()
    }
}
