use crate::actor_framework::Entity;
use crate::domain::{Product, ProductCreate, ProductOption, ProductUpdate};
use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;

fn validate_name(name: &str) -> Result<(), ProductError> {
    if name.trim().is_empty() {
        return Err(ProductError::ValidationError("Product name cannot be empty".to_string()));
    }
    Ok(())
}

impl Entity for Product {
    type Id = String;
    type CreateParams = ProductCreate;
    type Update = ProductUpdate;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;
    type Error = ProductError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new active Product from creation parameters.
    ///
    /// # Arguments
    /// * `id` - Unique identifier for the product
    /// * `params` - Seller, name, base price and optional category
    fn from_create_params(id: String, params: ProductCreate) -> Result<Self, ProductError> {
        validate_name(&params.name)?;
        let mut product = Product::new(id, params.seller_id, params.name, params.price);
        product.category = params.category;
        Ok(product)
    }

    /// Updates the product's name, price and/or category.
    fn on_update(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        if let Some(name) = update.name {
            validate_name(&name)?;
            self.name = name;
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(category) = update.category {
            self.category = Some(category);
        }
        Ok(())
    }

    /// Handles product-specific actions.
    ///
    /// # Errors
    /// `UnitPrice` fails for options the product does not have, or when the
    /// surcharge overflows the price.
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, ProductError> {
        match action {
            ProductAction::SetStatus(status) => {
                self.status = status;
                Ok(ProductActionResult::SetStatus(status))
            }
            ProductAction::AddOption { name, additional_price } => {
                validate_name(&name)?;
                if self.price.checked_add(additional_price).is_none() {
                    return Err(ProductError::ValidationError(format!(
                        "Option price {} overflows the product price",
                        additional_price
                    )));
                }
                let option = ProductOption {
                    id: self.next_option_id,
                    name,
                    additional_price,
                };
                self.next_option_id += 1;
                self.options.push(option.clone());
                Ok(ProductActionResult::AddOption(option))
            }
            ProductAction::AddImage(url) => {
                self.images.push(url);
                Ok(ProductActionResult::AddImage(self.images.len()))
            }
            ProductAction::UnitPrice(option_id) => self
                .unit_price(option_id)
                .map(ProductActionResult::UnitPrice)
                .ok_or_else(|| ProductError::OptionNotFound {
                    product_id: self.id.clone(),
                    option_id: option_id.unwrap_or_default(),
                }),
        }
    }
}
