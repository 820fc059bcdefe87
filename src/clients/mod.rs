//! Typed clients over the resource actors.
//!
//! Simple stores get their boilerplate from the macros; the order and payment
//! clients orchestrate several actors and are written out by hand.

#[macro_use]
mod macros;

pub mod cart_client;
pub mod order_client;
pub mod payment_client;
pub mod product_client;
pub mod user_client;

pub use cart_client::CartClient;
pub use order_client::{BuyerQuery, OrderClient};
pub use payment_client::PaymentClient;
pub use product_client::ProductClient;
pub use user_client::UserClient;
