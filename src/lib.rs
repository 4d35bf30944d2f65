//! # company-resolver
//!
//! Concrete collaborators and host surface for the [`entity_match`]
//! resolution engine:
//!
//! - [`store`]: SQLite record store with alias search and JSON seeding
//! - [`provider`]: HTTP and offline fixture augmentation providers
//! - [`cache`]: TTL result cache in front of the resolver
//! - [`config`]: TOML configuration
//! - [`host`]: newline-delimited JSON command bridge

pub mod app_dirs;
pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod provider;
pub mod store;

pub use config::ResolverConfig;
pub use error::{ResolverError, Result};
