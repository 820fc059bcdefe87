use crate::domain::{ProductOption, ProductStatus};

/// Custom actions for Product entities.
///
/// These actions represent catalog operations beyond the field patch:
/// status changes, options, images and option-aware pricing.
#[derive(Debug, Clone)]
pub enum ProductAction {
    SetStatus(ProductStatus),
    /// Adds an option priced `additional_price` above the base price.
    AddOption { name: String, additional_price: u64 },
    AddImage(String),
    /// Prices one unit of the product with an optional option. Read only.
    UnitPrice(Option<u64>),
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone, PartialEq)]
pub enum ProductActionResult {
    SetStatus(ProductStatus),
    AddOption(ProductOption),
    AddImage(usize),
    UnitPrice(u64),
}
