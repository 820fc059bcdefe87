use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use crate::domain::{Caller, Order, OrderPayment};
use crate::order_actor::{Access, OrderAction, OrderActionResult, OrderError};
use crate::actor_framework::ResourceClient;
use crate::clients::UserClient;
use crate::reconciliation::{CancellationQueue, PaymentError, PaymentReconciler, Verification};

/// Client for the payment side of the order aggregate.
#[derive(Clone)]
pub struct PaymentClient {
    orders: ResourceClient<Order>,
    user_client: UserClient,
    reconciler: PaymentReconciler,
    cancellations: CancellationQueue,
}

impl PaymentClient {
    pub fn new(
        orders: ResourceClient<Order>,
        user_client: UserClient,
        reconciler: PaymentReconciler,
        cancellations: CancellationQueue,
    ) -> Self {
        Self {
            orders,
            user_client,
            reconciler,
            cancellations,
        }
    }

    /// Opens a READY payment for the full order amount, snapshotting the
    /// buyer's name and email.
    #[instrument(skip(self))]
    pub async fn create_payment(&self, caller: &Caller, order_id: String) -> Result<OrderPayment, PaymentError> {
        let order = self
            .orders
            .get(order_id.clone())
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id.clone()))?;
        Access::BuyerOrAdmin.check(&order, caller)?;

        let buyer = self
            .user_client
            .require_user(order.user_id.clone())
            .await
            .map_err(|e| {
                error!(error = %e, "Buyer lookup failed");
                PaymentError::InvalidUser(e.to_string())
            })?;

        let payment = OrderPayment::new(order.name(), order.total_amount, buyer.name, buyer.email);
        let action = OrderAction::AddPayment {
            caller: caller.clone(),
            payment,
        };
        match self.orders.perform_action(order_id, action).await? {
            OrderActionResult::PaymentAdded(payment) => {
                info!(payment_uid = %payment.uid, amount = payment.desired_amount, "Payment created");
                Ok(payment)
            }
            _ => Err(OrderError::ActorCommunicationError("Unexpected result".to_string()).into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_payment(&self, caller: &Caller, payment_uid: Uuid) -> Result<OrderPayment, PaymentError> {
        let order = self.reconciler.find_order_by_payment(payment_uid).await?;
        Access::Participant.check(&order, caller)?;
        order
            .payment(&payment_uid)
            .cloned()
            .ok_or_else(|| PaymentError::NotFound(payment_uid.to_string()))
    }

    /// Polls the gateway for a payment and applies the answer.
    #[instrument(skip(self))]
    pub async fn portone_check(&self, payment_uid: Uuid) -> Result<Verification, PaymentError> {
        debug!("Sending request");
        self.reconciler.verify_payment(payment_uid).await
    }

    /// Cancels a paid payment now, waiting for the gateway.
    #[instrument(skip(self))]
    pub async fn cancel_payment(&self, payment_uid: Uuid, reason: &str) -> Result<(), PaymentError> {
        debug!("Sending request");
        self.reconciler.cancel_payment(payment_uid, reason).await
    }

    /// Queues the cancellation for the background worker and returns.
    #[instrument(skip(self))]
    pub async fn request_cancellation(&self, payment_uid: Uuid, reason: &str) -> Result<(), PaymentError> {
        self.cancellations.enqueue(payment_uid, reason.to_string()).await
    }
}
