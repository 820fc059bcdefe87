use crate::cart_actor::CartError;

/// One row of a cart: a product/option pair and how many of it.
#[derive(Debug, Clone, PartialEq)]
pub struct CartProduct {
    pub id: u64,
    pub product_id: String,
    pub option_id: Option<u64>,
    pub quantity: u32,
}

/// A user's cart. Each `(product, option)` pair appears at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub user_id: String,
    items: Vec<CartProduct>,
    next_item_id: u64,
}

/// Payload for opening a cart for a user.
#[derive(Debug, Clone)]
pub struct CartCreate {
    pub user_id: String,
}

impl Cart {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            items: Vec::new(),
            next_item_id: 1,
        }
    }

    pub fn items(&self) -> &[CartProduct] {
        &self.items
    }

    /// Adds `delta` to the row for `(product, option)`, creating it if needed.
    ///
    /// A row whose quantity drops to zero or below is removed and `None` is
    /// returned.
    pub fn adjust(
        &mut self,
        product_id: &str,
        option_id: Option<u64>,
        delta: i64,
    ) -> Result<Option<CartProduct>, CartError> {
        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.product_id == product_id && item.option_id == option_id)
        {
            let quantity = i64::from(self.items[index].quantity).saturating_add(delta);
            if quantity <= 0 {
                self.items.remove(index);
                return Ok(None);
            }
            let quantity = u32::try_from(quantity)
                .map_err(|_| CartError::ValidationError(format!("Quantity {} is too large", quantity)))?;
            self.items[index].quantity = quantity;
            return Ok(Some(self.items[index].clone()));
        }

        if delta < 1 {
            return Err(CartError::ValidationError("Quantity must be at least 1".to_string()));
        }
        let quantity = u32::try_from(delta)
            .map_err(|_| CartError::ValidationError(format!("Quantity {} is too large", delta)))?;
        let item = CartProduct {
            id: self.next_item_id,
            product_id: product_id.to_string(),
            option_id,
            quantity,
        };
        self.next_item_id += 1;
        self.items.push(item.clone());
        Ok(Some(item))
    }

    pub fn remove(&mut self, item_id: u64) -> Result<CartProduct, CartError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(CartError::ItemNotFound(item_id))?;
        Ok(self.items.remove(index))
    }

    /// Rows whose ids are listed, in cart order. Unknown ids are ignored.
    pub fn select(&self, item_ids: &[u64]) -> Vec<CartProduct> {
        self.items
            .iter()
            .filter(|item| item_ids.contains(&item.id))
            .cloned()
            .collect()
    }

    /// Removes and returns every listed row. Fails without removing anything
    /// if the list is empty or mentions a row that is not in the cart.
    pub fn take(&mut self, item_ids: &[u64]) -> Result<Vec<CartProduct>, CartError> {
        if item_ids.is_empty() {
            return Err(CartError::ValidationError("No cart items selected".to_string()));
        }
        if let Some(missing) = item_ids.iter().find(|id| !self.items.iter().any(|item| item.id == **id)) {
            return Err(CartError::ItemNotFound(*missing));
        }
        let (taken, kept): (Vec<CartProduct>, Vec<CartProduct>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item_ids.contains(&item.id));
        self.items = kept;
        Ok(taken)
    }

    /// Puts previously taken rows back, merging with rows added since.
    pub fn restore(&mut self, items: Vec<CartProduct>) {
        for item in items {
            match self
                .items
                .iter_mut()
                .find(|existing| existing.product_id == item.product_id && existing.option_id == item.option_id)
            {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
                None => {
                    self.next_item_id = self.next_item_id.max(item.id + 1);
                    self.items.push(item);
                }
            }
        }
    }
}
