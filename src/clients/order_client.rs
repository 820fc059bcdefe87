use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use crate::domain::{Caller, LineSnapshot, Order, OrderCreate, OrderStatus, OrderedProduct};
use crate::order_actor::{Access, OrderAction, OrderActionResult, OrderError};
use crate::actor_framework::ResourceClient;
use crate::clients::{CartClient, ProductClient, UserClient};
use crate::reconciliation::CancellationQueue;

/// How a seller looks up a buyer's orders.
#[derive(Debug, Clone)]
pub enum BuyerQuery {
    UserId(String),
    Email(String),
}

/// Client for interacting with the Order actor.
///
/// This client handles the orchestration around the order aggregate:
/// checkout from the cart, permission-checked reads, and queueing payment
/// cancellations once an order cancellation is approved.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    cart_client: CartClient,
    product_client: ProductClient,
    user_client: UserClient,
    cancellations: CancellationQueue,
}

fn unexpected() -> OrderError {
    OrderError::ActorCommunicationError("Unexpected result".to_string())
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        cart_client: CartClient,
        product_client: ProductClient,
        user_client: UserClient,
        cancellations: CancellationQueue,
    ) -> Self {
        Self {
            inner,
            cart_client,
            product_client,
            user_client,
            cancellations,
        }
    }

    /// Turns the selected rows of the caller's cart into a REQUESTED order.
    ///
    /// Rows are priced before anything is removed from the cart, and put back
    /// if the order cannot be stored.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn create_from_cart(&self, caller: &Caller, item_ids: Vec<u64>) -> Result<String, OrderError> {
        info!("Processing create_from_cart request (Client Side)");

        // Step 1: Validate user
        match self.user_client.get_user(caller.user_id.clone()).await {
            Ok(Some(user)) => info!(user_name = %user.name, "User validation successful"),
            Ok(None) => {
                error!("User not found");
                return Err(OrderError::InvalidUser(caller.user_id.clone()));
            }
            Err(e) => {
                error!(error = %e, "User validation failed");
                return Err(OrderError::InvalidUser(format!("User validation failed: {}", e)));
            }
        }

        // Step 2: Select cart rows
        let cart = self
            .cart_client
            .get_cart(caller.user_id.clone())
            .await
            .map_err(|e| OrderError::ActorCommunicationError(e.to_string()))?;
        let rows = cart.map(|cart| cart.select(&item_ids)).unwrap_or_default();
        if rows.is_empty() {
            warn!("No cart items selected");
            return Err(OrderError::ValidationError("No cart items selected".to_string()));
        }

        // Step 3: Price each row from the catalog
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = match self.product_client.get_product(row.product_id.clone()).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    error!(product_id = %row.product_id, "Product not found");
                    return Err(OrderError::InvalidProduct(row.product_id.clone()));
                }
                Err(e) => {
                    error!(error = %e, "Product validation failed");
                    return Err(OrderError::InvalidProduct(format!("Product validation failed: {}", e)));
                }
            };
            product
                .ensure_orderable()
                .map_err(|e| OrderError::InvalidProduct(e.to_string()))?;
            let price = product.unit_price(row.option_id).ok_or_else(|| {
                OrderError::InvalidProduct(format!(
                    "Option {:?} is not available for {}",
                    row.option_id, product.id
                ))
            })?;
            lines.push(LineSnapshot {
                product_id: product.id.clone(),
                option_id: row.option_id,
                seller_id: product.seller_id.clone(),
                name: product.name.clone(),
                price,
                quantity: row.quantity,
            });
        }
        info!(lines = lines.len(), "Cart rows priced");

        // Step 4: Take the rows out of the cart
        let row_ids: Vec<u64> = rows.iter().map(|row| row.id).collect();
        let taken = self
            .cart_client
            .take_items(&caller.user_id, row_ids)
            .await
            .map_err(|e| OrderError::ValidationError(format!("Cart changed during checkout: {}", e)))?;

        // Step 5: Create order in ResourceActor, restoring the cart on failure
        let payload = OrderCreate {
            user_id: caller.user_id.clone(),
            lines,
        };
        match self.inner.create(payload).await {
            Ok(order_id) => {
                info!(order_id = %order_id, "Order created");
                Ok(order_id)
            }
            Err(e) => {
                error!(error = %e, "Order creation failed, restoring cart");
                if let Err(restore_err) = self.cart_client.restore_items(&caller.user_id, taken).await {
                    error!(error = %restore_err, "Cart restore failed");
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, caller: &Caller, id: String) -> Result<Order, OrderError> {
        let order = self
            .inner
            .get(id.clone())
            .await?
            .ok_or(OrderError::NotFound(id))?;
        Access::Participant.check(&order, caller)?;
        Ok(order)
    }

    /// Orders the caller bought or sells into; every order for admins.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<Order>, OrderError> {
        let viewer = caller.clone();
        let mut orders = self
            .inner
            .query(move |order: &Order| Access::Participant.check(order, &viewer).is_ok())
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// A buyer's orders that contain at least one of the calling seller's lines.
    #[instrument(skip(self))]
    pub async fn search_seller_orders(&self, caller: &Caller, query: BuyerQuery) -> Result<Vec<Order>, OrderError> {
        let buyer_id = match query {
            BuyerQuery::UserId(id) => id,
            BuyerQuery::Email(email) => match self.user_client.find_by_email(&email).await {
                Ok(Some(user)) => user.id,
                Ok(None) => return Ok(Vec::new()),
                Err(e) => return Err(OrderError::InvalidUser(format!("User lookup failed: {}", e))),
            },
        };
        let seller_id = caller.user_id.clone();
        let mut orders = self
            .inner
            .query(move |order: &Order| order.user_id == buyer_id && order.has_seller(&seller_id))
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn status_action(&self, id: String, action: OrderAction) -> Result<OrderStatus, OrderError> {
        match self.inner.perform_action(id, action).await? {
            OrderActionResult::Status(status) => Ok(status),
            _ => Err(unexpected()),
        }
    }

    async fn line_action(&self, id: String, action: OrderAction) -> Result<OrderedProduct, OrderError> {
        match self.inner.perform_action(id, action).await? {
            OrderActionResult::Line(line) => Ok(line),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, caller: &Caller, id: String, reason: &str) -> Result<OrderStatus, OrderError> {
        info!("Cancellation requested");
        self.status_action(id, OrderAction::Cancel { caller: caller.clone() }).await
    }

    /// Cancels the order and its lines, then queues one gateway
    /// cancellation per payment. Returns the queued payment ids.
    ///
    /// The order stays CANCELLED if queueing fails; the error names every
    /// payment that was not queued so it can be cancelled by hand.
    #[instrument(skip(self))]
    pub async fn approve_cancellation(&self, caller: &Caller, id: String, reason: &str) -> Result<Vec<Uuid>, OrderError> {
        let payments = match self
            .inner
            .perform_action(id.clone(), OrderAction::ApproveCancellation { caller: caller.clone() })
            .await?
        {
            OrderActionResult::CancellationApproved { payments } => payments,
            _ => return Err(unexpected()),
        };
        let mut unqueued = Vec::new();
        for payment_uid in &payments {
            if let Err(e) = self.cancellations.enqueue(*payment_uid, reason.to_string()).await {
                error!(payment_uid = %payment_uid, error = %e, "Could not queue payment cancellation");
                unqueued.push(payment_uid.to_string());
            }
        }
        if !unqueued.is_empty() {
            return Err(OrderError::ActorCommunicationError(format!(
                "Order {} cancelled but cancellation not queued for payments: {}",
                id,
                unqueued.join(", ")
            )));
        }
        info!(order_id = %id, payments = payments.len(), "Cancellation approved");
        Ok(payments)
    }

    #[instrument(skip(self))]
    pub async fn request_return(&self, caller: &Caller, id: String) -> Result<Vec<u64>, OrderError> {
        match self
            .inner
            .perform_action(id, OrderAction::RequestReturn { caller: caller.clone() })
            .await?
        {
            OrderActionResult::ReturnRequested { lines } => Ok(lines),
            _ => Err(unexpected()),
        }
    }

    #[instrument(skip(self))]
    pub async fn mark_as_prepared(&self, caller: &Caller, id: String) -> Result<OrderStatus, OrderError> {
        self.status_action(id, OrderAction::MarkAsPrepared { caller: caller.clone() }).await
    }

    #[instrument(skip(self))]
    pub async fn mark_as_shipped(&self, caller: &Caller, id: String) -> Result<OrderStatus, OrderError> {
        self.status_action(id, OrderAction::MarkAsShipped { caller: caller.clone() }).await
    }

    #[instrument(skip(self))]
    pub async fn mark_as_delivered(&self, caller: &Caller, id: String) -> Result<OrderStatus, OrderError> {
        self.status_action(id, OrderAction::MarkAsDelivered { caller: caller.clone() }).await
    }

    #[instrument(skip(self))]
    pub async fn request_line_cancel(&self, caller: &Caller, id: String, line_id: u64) -> Result<OrderedProduct, OrderError> {
        let caller = caller.clone();
        self.line_action(id, OrderAction::RequestLineCancel { caller, line_id }).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_line(&self, caller: &Caller, id: String, line_id: u64) -> Result<OrderedProduct, OrderError> {
        let caller = caller.clone();
        self.line_action(id, OrderAction::CancelLine { caller, line_id }).await
    }

    #[instrument(skip(self))]
    pub async fn request_line_return(&self, caller: &Caller, id: String, line_id: u64) -> Result<OrderedProduct, OrderError> {
        let caller = caller.clone();
        self.line_action(id, OrderAction::RequestLineReturn { caller, line_id }).await
    }

    #[instrument(skip(self))]
    pub async fn process_line_return(&self, caller: &Caller, id: String, line_id: u64) -> Result<OrderedProduct, OrderError> {
        let caller = caller.clone();
        self.line_action(id, OrderAction::ProcessLineReturn { caller, line_id }).await
    }

    #[instrument(skip(self))]
    pub async fn process_line_refund(&self, caller: &Caller, id: String, line_id: u64) -> Result<OrderedProduct, OrderError> {
        let caller = caller.clone();
        self.line_action(id, OrderAction::ProcessLineRefund { caller, line_id }).await
    }
}
