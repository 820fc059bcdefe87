//! Catalog domain logic: status, options, images and pricing actions.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
