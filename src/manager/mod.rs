//! Main configuration module
//!
//! This module contains the [`Config`] struct which is the primary entry point
//! for reading typed properties, and the [`ReloadCoordinator`] that owns the
//! live store and its change protocol.

mod builder;
mod cache;
pub(crate) mod coordinator;
mod core;
mod load;
mod operations;

pub use builder::ConfigBuilder;
pub use coordinator::ReloadCoordinator;
pub use core::Config;
pub use load::LoadType;
