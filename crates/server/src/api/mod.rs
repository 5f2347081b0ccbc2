//! HTTP handlers.

mod health;
mod trigger;

pub use health::*;
pub use trigger::*;
