//! Payment reconciliation: gateway verification, cancellation and the
//! background worker and webhook built on them.

pub mod error;
pub mod reconciler;
pub mod webhook;
pub mod worker;

pub use error::*;
pub use reconciler::*;
pub use webhook::*;
pub use worker::*;
