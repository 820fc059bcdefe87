pub mod user;
pub mod caller;
pub mod product;
pub mod cart;
pub mod order;
pub mod payment;

pub use user::*;
pub use caller::*;
pub use product::*;
pub use cart::*;
pub use order::*;
pub use payment::*;
