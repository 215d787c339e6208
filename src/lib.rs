//! # rcprops - Typed Configuration Properties
//!
//! A Rust library for reading typed configuration properties from layered
//! sources, with `${...}` expansion, pluggable conversion and transactional
//! hot reload.
//!
//! ## Features
//!
//! - **Layered Sources**: Properties, JSON, TOML and YAML files behind URL-like specs
//! - **Load Strategies**: First readable source wins, or merge them all
//! - **Variable Expansion**: `${name}` against properties, system properties and environment
//! - **Conversion Pipeline**: Arrays, collections, editors, `FromStr`, factories, custom converters
//! - **Transactions**: Vetoable set, remove, clear and reload with change events
//! - **Hot Reload**: Inline checks on read, or a background thread
//! - **Performance**: Converted values are cached until the next change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rcprops::{Config, LoadType, MethodDescriptor};
//!
//! let config = Config::builder("my_app::Server")
//!     .source("file:~/.server.properties")
//!     .source("classpath:my_app/Server.properties")
//!     .load_type(LoadType::Merge)
//!     .with_descriptor(MethodDescriptor::of::<u16>().key("port").default_value("8080"))
//!     .build()
//!     .unwrap();
//!
//! let port: Option<u16> = config.get_by_key("port").unwrap();
//! ```
//!
//! ## Defining a Schema
//!
//! ```rust
//! use rcprops::{descriptors, Config, ConfigSchema, MethodDescriptor, TargetType};
//! use std::collections::HashMap;
//!
//! struct ServerConfig;
//!
//! impl ConfigSchema for ServerConfig {
//!     fn qualified_name() -> String {
//!         "my_app::ServerConfig".into()
//!     }
//!
//!     fn descriptors() -> HashMap<String, MethodDescriptor> {
//!         descriptors! {
//!             "port" => MethodDescriptor::of::<u16>().default_value("8080"),
//!             "hosts" => MethodDescriptor::new(TargetType::list(TargetType::string()))
//!                 .default_value("localhost"),
//!         }
//!     }
//! }
//!
//! let config = Config::from_schema::<ServerConfig>().unwrap();
//! let hosts: Option<Vec<String>> = config.get_by_key("hosts").unwrap();
//! assert_eq!(hosts.unwrap(), ["localhost"]);
//! ```
//!
//! ## Change Events
//!
//! Listeners see every change before it is committed and may veto it.
//!
//! ```rust
//! use rcprops::{ChangeEvent, Config, PropertyChangeListener, Rollback};
//!
//! struct Lock;
//!
//! impl PropertyChangeListener for Lock {
//!     fn before_change(&self, event: &ChangeEvent) -> Result<(), Rollback> {
//!         if event.key == "locked" {
//!             return Err(Rollback::Operation);
//!         }
//!         Ok(())
//!     }
//!
//!     fn after_change(&self, _event: &ChangeEvent) {}
//! }
//!
//! let config = Config::builder("app").build().unwrap();
//! config.add_property_change_listener(Lock);
//!
//! config.set_property("locked", "yes").unwrap();
//! assert_eq!(config.get_property("locked").unwrap(), None);
//! ```

// Core modules
mod error;
mod store;
mod sync;

// Grouped modules
pub mod cache;
pub mod config;
pub mod convert;
pub mod events;
pub mod expand;
pub mod hot_reload;
pub mod loaders;
pub mod manager;
pub mod sources;

// Re-exports from core
pub use error::{Error, Result};
pub use store::{KEY_SEPARATOR, PropertyStore, PropertyValue};

pub use cache::CacheStrategy;
pub use config::{ConfigSchema, ConfigSettings, ConfigSettingsBuilder, MethodDescriptor};
pub use convert::{
    CollectionKind, ConversionPipeline, Converter, ConverterRef, DEFAULT_SEPARATOR, FromValue,
    SplitAndTrimTokenizer, TargetType, Tokenizer, TokenizerRef, TokenizerSpec, TypeRegistry, Value,
    resolve_tokenizer,
};
pub use events::{
    ChangeEvent, EventManager, ListenerId, PropertyChangeListener, ReloadEvent, ReloadListener,
    Rollback, RollbackBatch,
};
pub use expand::{EnvSource, Environment, ProcessEnv, VariableExpander};
pub use hot_reload::{HotReload, ReloadMode, StalenessWatcher};
pub use loaders::{Loader, LoadersManager, PropertiesLoader};
pub use manager::{Config, ConfigBuilder, LoadType, ReloadCoordinator};
pub use sources::{ResourcesPathResolver, Source, SourceResolver, classpath_prefix};

// Format loader re-exports (feature-gated)
#[cfg(feature = "json")]
pub use loaders::JsonLoader;
#[cfg(feature = "toml")]
pub use loaders::TomlLoader;
#[cfg(feature = "yaml")]
pub use loaders::YamlLoader;
