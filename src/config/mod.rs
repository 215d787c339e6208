//! Core configuration types and traits
//!
//! This module contains the declarative side of a configuration:
//! - `MethodDescriptor` - How one property is keyed, defaulted and converted
//! - `ConfigSchema` - Trait grouping descriptors with type-level settings
//! - `ConfigSettings` - Builder-side settings (sources, load type, caching)

mod schema;
mod types;

pub use schema::{ConfigSchema, MethodDescriptor};

pub use types::{ConfigSettings, ConfigSettingsBuilder};
