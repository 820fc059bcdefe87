use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::PaymentError;
use crate::actor_framework::ResourceClient;
use crate::domain::{Order, PayStatus, RelatedStatusUpdate};
use crate::gateway::PaymentGateway;
use crate::order_actor::{OrderAction, OrderActionResult};

/// Result of checking one payment against the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub paid_ok: bool,
    pub status: PayStatus,
}

/// Talks to the gateway on behalf of the order store.
///
/// Gateway calls happen outside the order actor; their results are applied
/// back as order actions so the aggregate stays a single writer.
#[derive(Clone)]
pub struct PaymentReconciler {
    orders: ResourceClient<Order>,
    gateway: Arc<dyn PaymentGateway>,
    on_cancelled: RelatedStatusUpdate,
}

impl PaymentReconciler {
    pub fn new(orders: ResourceClient<Order>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            orders,
            gateway,
            on_cancelled: RelatedStatusUpdate::default(),
        }
    }

    /// Replaces what happens to the order once a payment is cancelled.
    pub fn with_status_update(mut self, on_cancelled: RelatedStatusUpdate) -> Self {
        self.on_cancelled = on_cancelled;
        self
    }

    pub async fn find_order_by_payment(&self, payment_uid: Uuid) -> Result<Order, PaymentError> {
        self.orders
            .query(move |order: &Order| order.payment(&payment_uid).is_some())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PaymentError::NotFound(payment_uid.to_string()))
    }

    /// Fetches the gateway's view of a payment and applies it to its order.
    /// Repeating this with an unchanged gateway answer changes nothing.
    ///
    /// Any gateway failure, transport errors included, comes back as
    /// `PaymentError::NotFound` carrying the gateway's message.
    #[instrument(skip(self), fields(payment_uid = %payment_uid))]
    pub async fn verify_payment(&self, payment_uid: Uuid) -> Result<Verification, PaymentError> {
        let order = self.find_order_by_payment(payment_uid).await?;
        let report = self
            .gateway
            .get_payment(&payment_uid.to_string())
            .await
            .map_err(|e| {
                warn!(error = %e, "Gateway lookup failed");
                PaymentError::NotFound(format!("{} ({})", payment_uid, e))
            })?;

        match self
            .orders
            .perform_action(order.id.clone(), OrderAction::ApplyVerification { payment_uid, report })
            .await?
        {
            OrderActionResult::Verified { paid_ok, status } => {
                info!(order_id = %order.id, paid_ok, status = %status, "Payment verified");
                Ok(Verification { paid_ok, status })
            }
            _ => Err(PaymentError::ActorCommunicationError("Unexpected result".to_string())),
        }
    }

    /// Cancels a PAID payment at the gateway, then marks it cancelled and
    /// runs the status-update strategy on its order.
    #[instrument(skip(self), fields(payment_uid = %payment_uid))]
    pub async fn cancel_payment(&self, payment_uid: Uuid, reason: &str) -> Result<(), PaymentError> {
        let order = self.find_order_by_payment(payment_uid).await?;
        self.orders
            .perform_action(order.id.clone(), OrderAction::EnsurePaymentCancellable { payment_uid })
            .await?;

        self.gateway.cancel_payment(&payment_uid.to_string(), reason).await?;

        self.orders
            .perform_action(
                order.id.clone(),
                OrderAction::ApplyPaymentCancelled {
                    payment_uid,
                    cascade: self.on_cancelled,
                },
            )
            .await?;
        info!(order_id = %order.id, "Payment cancelled");
        Ok(())
    }
}
