use serde::{Deserialize, Serialize};
use std::fmt;

use crate::product_actor::ProductError;

/// Sale status of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    SoldOut,
    Obsolete,
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::SoldOut => "sold_out",
            ProductStatus::Obsolete => "obsolete",
        };
        f.write_str(label)
    }
}

/// A purchasable variant of a product, priced on top of the base price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: u64,
    pub name: String,
    pub additional_price: u64,
}

/// Represents a catalog item.
///
/// Prices are integer amounts in the shop currency's smallest unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub price: u64,
    pub category: Option<String>,
    pub status: ProductStatus,
    pub options: Vec<ProductOption>,
    pub images: Vec<String>,
    pub(crate) next_option_id: u64,
}

impl Product {
    pub fn new(id: impl Into<String>, seller_id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            seller_id: seller_id.into(),
            name: name.into(),
            price,
            category: None,
            status: ProductStatus::Active,
            options: Vec::new(),
            images: Vec::new(),
            next_option_id: 1,
        }
    }

    pub fn option(&self, option_id: u64) -> Option<&ProductOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    /// Base price plus the option surcharge, or `None` when the option does
    /// not belong to this product.
    pub fn unit_price(&self, option_id: Option<u64>) -> Option<u64> {
        match option_id {
            None => Some(self.price),
            Some(id) => self
                .option(id)
                .and_then(|option| self.price.checked_add(option.additional_price)),
        }
    }

    pub fn is_orderable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Fails with `Unavailable` unless the product is on sale.
    pub fn ensure_orderable(&self) -> Result<(), ProductError> {
        if self.is_orderable() {
            return Ok(());
        }
        Err(ProductError::Unavailable {
            product_id: self.id.clone(),
            status: self.status,
        })
    }
}

/// Payload for creating a new product.
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub seller_id: String,
    pub name: String,
    pub price: u64,
    pub category: Option<String>,
}

/// Payload for updating an existing product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<u64>,
    pub category: Option<String>,
}
