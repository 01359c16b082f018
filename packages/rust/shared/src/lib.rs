//! Shared types, error model, and configuration for fbcorpus.
//!
//! This crate is the foundation depended on by the other fbcorpus crates.
//! It provides:
//! - [`FbCorpusError`]: the unified error type
//! - Domain types ([`SmokeArgs`], [`StageKind`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PathsConfig, RuntimeConfig, ScriptsConfig, SmokeConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{FbCorpusError, Result};
pub use types::{RunId, SmokeArgs, StageKind};
