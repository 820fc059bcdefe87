use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use super::{AppConfig, SystemError};
use crate::actor_framework::ResourceActor;
use crate::clients::{CartClient, OrderClient, PaymentClient, ProductClient, UserClient};
use crate::domain::{Cart, Order, Product, User};
use crate::gateway::{PaymentGateway, PortOneClient};
use crate::reconciliation::{CancellationQueue, CancellationWorker, PaymentReconciler, WebhookHandler};

fn sequential_ids(prefix: &'static str) -> impl Fn() -> String + Send + Sync + 'static {
    let counter = Arc::new(AtomicU64::new(1));
    move || format!("{}_{}", prefix, counter.fetch_add(1, Ordering::SeqCst))
}

/// The main application system that orchestrates all actors.
///
/// Responsible for starting up actors and the cancellation worker, wiring
/// them together, and handling shutdown.
pub struct OrderSystem {
    pub user_client: UserClient,
    pub product_client: ProductClient,
    pub cart_client: CartClient,
    pub order_client: OrderClient,
    pub payment_client: PaymentClient,
    pub webhook: WebhookHandler,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl OrderSystem {
    /// Starts the system against the PortOne gateway.
    pub fn new(config: AppConfig) -> Result<Self, SystemError> {
        let gateway = PortOneClient::new(
            config.portone_api_base.clone(),
            config.portone_api_secret.clone(),
            config.gateway_timeout,
        )?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Starts the system against any gateway implementation.
    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let buffer = config.actor_buffer;

        // 1. User store
        let (user_actor, user_resource_client) = ResourceActor::<User>::new(buffer, sequential_ids("user"));
        let user_client = UserClient::new(user_resource_client);
        let user_handle = tokio::spawn(user_actor.run());

        // 2. Catalog
        let (product_actor, product_resource_client) = ResourceActor::<Product>::new(buffer, sequential_ids("product"));
        let product_client = ProductClient::new(product_resource_client);
        let product_handle = tokio::spawn(product_actor.run());

        // 3. Carts, keyed by owner
        let (cart_actor, cart_resource_client) = ResourceActor::<Cart>::new(buffer, sequential_ids("cart"));
        let cart_client = CartClient::new(cart_resource_client, product_client.clone());
        let cart_handle = tokio::spawn(cart_actor.run());

        // 4. Orders and the payment reconciliation around them
        let (order_actor, order_resource_client) = ResourceActor::<Order>::new(buffer, sequential_ids("order"));
        let order_handle = tokio::spawn(order_actor.run());

        let reconciler = PaymentReconciler::new(order_resource_client.clone(), gateway);
        let (cancellations, cancellation_rx) = CancellationQueue::channel(buffer);
        let worker = CancellationWorker::new(
            cancellation_rx,
            reconciler.clone(),
            config.cancellation_max_attempts,
            config.cancellation_backoff,
        );
        let worker_handle = tokio::spawn(worker.run());

        let order_client = OrderClient::new(
            order_resource_client.clone(),
            cart_client.clone(),
            product_client.clone(),
            user_client.clone(),
            cancellations.clone(),
        );
        let payment_client = PaymentClient::new(
            order_resource_client,
            user_client.clone(),
            reconciler.clone(),
            cancellations,
        );
        let webhook = WebhookHandler::new(config.allowed_webhook_ips.clone(), reconciler);

        info!(buffer, "Order system started");
        Self {
            user_client,
            product_client,
            cart_client,
            order_client,
            payment_client,
            webhook,
            handles: vec![user_handle, product_handle, cart_handle, order_handle, worker_handle],
        }
    }

    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        // Every actor and the worker stop once all handles to their channels
        // are gone. The worker drains queued jobs first.
        drop(self.order_client);
        drop(self.payment_client);
        drop(self.webhook);
        drop(self.cart_client);
        drop(self.user_client);
        drop(self.product_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Task failed: {:?}", e);
                return Err(SystemError::TaskFailed(format!("{:?}", e)));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
