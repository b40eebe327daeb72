//! Shared types, error model, and configuration for itemsync.
//!
//! This crate is the foundation depended on by all other itemsync crates.
//! It provides:
//! - [`ItemSyncError`], the unified error type
//! - Domain types ([`Category`], [`ItemId`], [`ItemRecord`])
//! - Configuration ([`AppConfig`], [`SourceConfig`], [`EnricherConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EnricherConfig, EnricherSection, OutputSection, SourceConfig, SourceSection,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ItemSyncError, Result};
pub use types::{Category, ItemId, ItemRecord};
