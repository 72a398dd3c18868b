//! CLI command implementations.

pub mod channels;
pub mod config;
pub mod send;
