//! Configuration module for the bindle build system
//!
//! Provides types, discovery, and parsing for `bindle.toml` project
//! configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    default_config, find_config, find_config_from, load_config, merge_cli_overrides, resolve_path,
    CliOverrides, ConfigError, CONFIG_FILENAME,
};
pub use schema::*;
