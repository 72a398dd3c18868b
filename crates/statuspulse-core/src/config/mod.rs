//! Configuration loading and management.

mod env;
mod loader;
mod schema;

pub use env::*;
pub use loader::*;
pub use schema::*;
