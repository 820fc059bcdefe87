//! Order aggregate wiring: actions, permission rules and the entity impl.

mod access;
mod actions;
pub mod entity;
pub mod error;

pub use access::*;
pub use actions::*;
pub use error::*;
