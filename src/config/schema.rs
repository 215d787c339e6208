//! Property descriptors and the schema trait
//!
//! A [`MethodDescriptor`] says everything needed to read one property: the
//! key, the default, the target type and how to split or convert the raw
//! value. Descriptors are plain data; a [`ConfigSchema`] groups them with the
//! type-level settings (sources, load policy, hot reload, tokenizer).
//!
//! ```rust
//! use rcprops::{descriptors, ConfigSchema, MethodDescriptor, TargetType};
//! use std::collections::HashMap;
//!
//! struct ServerConfig;
//!
//! impl ConfigSchema for ServerConfig {
//!     fn descriptors() -> HashMap<String, MethodDescriptor> {
//!         descriptors! {
//!             "port" => MethodDescriptor::of::<u16>().default_value("8080"),
//!             "hosts" => MethodDescriptor::new(TargetType::list(TargetType::string()))
//!                 .separator(";"),
//!         }
//!     }
//!
//!     fn sources() -> Vec<String> {
//!         vec!["file:~/.server.properties".into()]
//!     }
//! }
//!
//! assert_eq!(ServerConfig::descriptors()["port"].full_key(), "port");
//! ```

use crate::convert::{ConverterRef, TargetType, TokenizerRef, TokenizerSpec};
use crate::hot_reload::HotReload;
use crate::manager::LoadType;
use crate::store::KEY_SEPARATOR;
use std::collections::HashMap;

// =============================================================================
// Method Descriptor
// =============================================================================

/// Everything needed to read and convert one property
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// Property key; may contain `${...}` placeholders
    pub key: String,

    /// Prefix joined to the key with a `.`
    pub group: Option<String>,

    /// Value used when no source provides the key
    pub default_value: Option<String>,

    /// Declared result type
    pub target: TargetType,

    /// Custom conversion, tried right after array splitting
    pub converter: Option<ConverterRef>,

    /// Tokenizer declared on the property itself
    pub tokenizer: TokenizerSpec,

    /// Tokenizer declared on the owning type
    pub type_tokenizer: TokenizerSpec,

    /// Cache converted results until the next change (default: on)
    pub caching: bool,

    /// Expand `${...}` in the key and in text values (default: on)
    pub variable_expansion: bool,
}

impl MethodDescriptor {
    /// Descriptor for the given target, with an empty key
    #[must_use]
    pub fn new(target: TargetType) -> Self {
        Self {
            key: String::new(),
            group: None,
            default_value: None,
            target,
            converter: None,
            tokenizer: TokenizerSpec::default(),
            type_tokenizer: TokenizerSpec::default(),
            caching: true,
            variable_expansion: true,
        }
    }

    /// Descriptor for the Rust type `T`
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TargetType::of::<T>())
    }

    /// Descriptor for plain text
    #[must_use]
    pub fn string() -> Self {
        Self::new(TargetType::string())
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Prefix the key, e.g. `in_group("server")` turns `port` into `server.port`
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: ConverterRef) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Split array and collection values on `separator`
    #[must_use]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.tokenizer.separator = Some(separator.into());
        self
    }

    #[must_use]
    pub fn tokenizer(mut self, tokenizer: TokenizerRef) -> Self {
        self.tokenizer.tokenizer = Some(tokenizer);
        self
    }

    /// Separator declared on the owning type
    #[must_use]
    pub fn type_separator(mut self, separator: impl Into<String>) -> Self {
        self.type_tokenizer.separator = Some(separator.into());
        self
    }

    /// Tokenizer declared on the owning type
    #[must_use]
    pub fn type_tokenizer(mut self, tokenizer: TokenizerRef) -> Self {
        self.type_tokenizer.tokenizer = Some(tokenizer);
        self
    }

    #[must_use]
    pub fn no_caching(mut self) -> Self {
        self.caching = false;
        self
    }

    #[must_use]
    pub fn no_variable_expansion(mut self) -> Self {
        self.variable_expansion = false;
        self
    }

    /// The key with its group prefix, before variable expansion
    #[must_use]
    pub fn full_key(&self) -> String {
        match &self.group {
            Some(group) if group.ends_with(KEY_SEPARATOR) => format!("{group}{}", self.key),
            Some(group) => format!("{group}{KEY_SEPARATOR}{}", self.key),
            None => self.key.clone(),
        }
    }
}

// =============================================================================
// Schema Trait
// =============================================================================

/// Trait for types that declare a set of properties
///
/// Only [`descriptors`](Self::descriptors) is required. The remaining
/// methods mirror the type-level declarations and have sensible defaults.
pub trait ConfigSchema {
    /// Descriptors keyed by property key
    fn descriptors() -> HashMap<String, MethodDescriptor>;

    /// Name used to derive the default sources
    ///
    /// `my_app::config::Server` looks for `classpath:my_app/config/Server.<ext>`.
    #[must_use]
    fn qualified_name() -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Source specs in priority order; empty means the default sources
    #[must_use]
    fn sources() -> Vec<String> {
        Vec::new()
    }

    #[must_use]
    fn load_type() -> LoadType {
        LoadType::First
    }

    #[must_use]
    fn hot_reload() -> Option<HotReload> {
        None
    }

    /// Separator or tokenizer declared for the whole type
    #[must_use]
    fn tokenizer() -> TokenizerSpec {
        TokenizerSpec::default()
    }
}

// Unit schema for configurations assembled purely through the builder
impl ConfigSchema for () {
    fn descriptors() -> HashMap<String, MethodDescriptor> {
        HashMap::new()
    }

    fn qualified_name() -> String {
        "config".into()
    }
}

/// Build a descriptor map, setting each descriptor's key from the map key
///
/// ```rust
/// use rcprops::{descriptors, MethodDescriptor};
///
/// let map = descriptors! {
///     "server.port" => MethodDescriptor::of::<u16>().default_value("80"),
///     "server.name" => MethodDescriptor::string(),
/// };
/// assert_eq!(map["server.port"].key, "server.port");
/// ```
#[macro_export]
macro_rules! descriptors {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = std::collections::HashMap::new();
        $(
            let key: String = $key.to_string();
            map.insert(key.clone(), $value.key(key));
        )*
        map
    }};
}
