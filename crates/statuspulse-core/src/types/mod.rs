//! Core types for statuspulse.

mod event;
mod payload;

pub use event::*;
pub use payload::*;
