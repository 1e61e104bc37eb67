//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the TOML configuration file from an explicit
//! path or the platform-appropriate directory, falls back to defaults when the
//! file does not exist, and converts it into the options the application
//! layer consumes.

pub mod config;
