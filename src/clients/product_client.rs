use tracing::{debug, instrument, warn};
use crate::domain::{Caller, Product, ProductCreate, ProductOption, ProductStatus, ProductUpdate, Role};
use crate::product_actor::{ProductAction, ProductActionResult, ProductError};
use crate::actor_framework::ResourceClient;

/// Client for interacting with the Product actor.
///
/// Sellers manage their own products; admins may manage any.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl_basic_client!(ProductClient, Product, ProductError, product);

fn unexpected() -> ProductError {
    ProductError::ActorCommunicationError("Unexpected result".to_string())
}

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn create_product(&self, caller: &Caller, params: ProductCreate) -> Result<String, ProductError> {
        debug!("Sending request");
        let allowed = caller.is_admin() || (caller.role == Role::Seller && caller.is(&params.seller_id));
        if !allowed {
            warn!("Caller may not list products for this seller");
            return Err(ProductError::PermissionDenied(format!(
                "{} may not create products for {}",
                caller.user_id, params.seller_id
            )));
        }
        self.inner.create(params).await
    }

    async fn require_owned(&self, caller: &Caller, id: &str) -> Result<Product, ProductError> {
        let product = self.require_product(id.to_string()).await?;
        if !caller.is_admin() && !caller.is(&product.seller_id) {
            return Err(ProductError::PermissionDenied(format!(
                "{} does not sell {}",
                caller.user_id, id
            )));
        }
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product(&self, caller: &Caller, id: String, update: ProductUpdate) -> Result<Product, ProductError> {
        debug!("Sending request");
        self.require_owned(caller, &id).await?;
        self.inner.update(id, update).await
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, caller: &Caller, id: String, status: ProductStatus) -> Result<ProductStatus, ProductError> {
        debug!("Sending request");
        self.require_owned(caller, &id).await?;
        match self.inner.perform_action(id, ProductAction::SetStatus(status)).await? {
            ProductActionResult::SetStatus(status) => Ok(status),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn add_option(
        &self,
        caller: &Caller,
        id: String,
        name: String,
        additional_price: u64,
    ) -> Result<ProductOption, ProductError> {
        debug!("Sending request");
        self.require_owned(caller, &id).await?;
        match self
            .inner
            .perform_action(id, ProductAction::AddOption { name, additional_price })
            .await?
        {
            ProductActionResult::AddOption(option) => Ok(option),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn add_image(&self, caller: &Caller, id: String, url: String) -> Result<usize, ProductError> {
        debug!("Sending request");
        self.require_owned(caller, &id).await?;
        match self.inner.perform_action(id, ProductAction::AddImage(url)).await? {
            ProductActionResult::AddImage(count) => Ok(count),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn unit_price(&self, id: String, option_id: Option<u64>) -> Result<u64, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::UnitPrice(option_id)).await? {
            ProductActionResult::UnitPrice(price) => Ok(price),
            _ => Err(unexpected()),
        }
    }
}
