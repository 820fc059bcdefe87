use crate::domain::CartProduct;

/// Custom actions for Cart entities.
#[derive(Debug, Clone)]
pub enum CartAction {
    /// Changes the quantity of a product/option row by a signed delta.
    Adjust {
        product_id: String,
        option_id: Option<u64>,
        delta: i64,
    },
    Remove(u64),
    /// Removes the listed rows for checkout, all or nothing.
    Take(Vec<u64>),
    /// Puts rows back after a failed checkout.
    Restore(Vec<CartProduct>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartActionResult {
    /// The row after adjusting, or `None` when it was removed.
    Adjusted(Option<CartProduct>),
    Removed(CartProduct),
    Taken(Vec<CartProduct>),
    Restored,
}
