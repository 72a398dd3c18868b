//! # statuspulse-core
//!
//! Event model, configuration, and shared utilities for statuspulse.
//!
//! This crate holds the pure data that every other statuspulse crate agrees on:
//!
//! - **Types**: the [`NotificationEvent`] sum type and its payloads
//! - **Configuration**: loading, `env:NAME` resolution, and validation of config files
//! - **Utilities**: path resolution and secret handling

pub mod config;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use secret::SecretString;
pub use types::*;
