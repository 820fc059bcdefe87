use tracing::{debug, instrument};
use crate::domain::{Caller, Cart, CartCreate, CartProduct};
use crate::cart_actor::{CartAction, CartActionResult, CartError};
use crate::clients::ProductClient;
use crate::actor_framework::ResourceClient;

/// Client for interacting with the Cart actor.
///
/// Every operation acts on the caller's own cart.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
    product_client: ProductClient,
}

fn unexpected() -> CartError {
    CartError::ActorCommunicationError("Unexpected result".to_string())
}

impl CartClient {
    pub fn new(inner: ResourceClient<Cart>, product_client: ProductClient) -> Self {
        Self { inner, product_client }
    }

    /// The user's cart, or `None` before anything was added to it.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: String) -> Result<Option<Cart>, CartError> {
        debug!("Sending request");
        self.inner.get(user_id).await
    }

    /// Opens the cart on first use.
    async fn ensure_cart(&self, user_id: &str) -> Result<(), CartError> {
        match self.inner.create(CartCreate { user_id: user_id.to_string() }).await {
            Ok(_) | Err(CartError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Adds `delta` units of a product/option; negative deltas shrink the row.
    ///
    /// Growing a row needs the product to be on sale. Shrinking works for any
    /// product so rows for withdrawn products can still be cleared.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        caller: &Caller,
        product_id: String,
        option_id: Option<u64>,
        delta: i64,
    ) -> Result<Option<CartProduct>, CartError> {
        debug!("Sending request");
        let product = self
            .product_client
            .get_product(product_id.clone())
            .await
            .map_err(|e| CartError::ValidationError(format!("Product lookup failed: {}", e)))?
            .ok_or_else(|| CartError::ValidationError(format!("Unknown product {}", product_id)))?;
        if delta > 0 {
            product
                .ensure_orderable()
                .map_err(|e| CartError::ValidationError(e.to_string()))?;
        }
        if let Some(option_id) = option_id {
            if product.option(option_id).is_none() {
                return Err(CartError::ValidationError(format!(
                    "Option {} does not belong to product {}",
                    option_id, product_id
                )));
            }
        }

        self.ensure_cart(&caller.user_id).await?;
        let action = CartAction::Adjust {
            product_id,
            option_id,
            delta,
        };
        match self.inner.perform_action(caller.user_id.clone(), action).await? {
            CartActionResult::Adjusted(item) => Ok(item),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, caller: &Caller, item_id: u64) -> Result<CartProduct, CartError> {
        debug!("Sending request");
        match self.inner.perform_action(caller.user_id.clone(), CartAction::Remove(item_id)).await? {
            CartActionResult::Removed(item) => Ok(item),
            _ => Err(unexpected()),
        }
    }

    pub(crate) async fn take_items(&self, user_id: &str, item_ids: Vec<u64>) -> Result<Vec<CartProduct>, CartError> {
        match self.inner.perform_action(user_id.to_string(), CartAction::Take(item_ids)).await? {
            CartActionResult::Taken(items) => Ok(items),
            _ => Err(unexpected()),
        }
    }

    pub(crate) async fn restore_items(&self, user_id: &str, items: Vec<CartProduct>) -> Result<(), CartError> {
        match self.inner.perform_action(user_id.to_string(), CartAction::Restore(items)).await? {
            CartActionResult::Restored => Ok(()),
            _ => Err(unexpected()),
        }
    }
}
