use tracing::debug;

use super::{Access, OrderAction, OrderActionResult, OrderError};
use crate::actor_framework::Entity;
use crate::domain::{Order, OrderCreate};

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    type Update = ();
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Error = OrderError;

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a REQUESTED order from priced checkout lines.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        Order::from_snapshot(id, params)
    }

    /// Orders are only changed through actions.
    fn on_update(&mut self, _update: ()) -> Result<(), OrderError> {
        Err(OrderError::ValidationError(
            "Orders cannot be patched; use an order action".to_string(),
        ))
    }

    /// Handles order-specific actions.
    ///
    /// Permission is checked before any transition runs, and the actor only
    /// commits the draft when this returns `Ok`.
    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, OrderError> {
        let result = match action {
            OrderAction::Cancel { caller } => {
                Access::Participant.check(self, &caller)?;
                if !self.cancel()? {
                    debug!(order_id = %self.id, "Cancel already requested");
                }
                OrderActionResult::Status(self.status())
            }
            OrderAction::ApproveCancellation { caller } => {
                Access::Seller.check(self, &caller)?;
                let payments = self.approve_cancellation()?;
                OrderActionResult::CancellationApproved { payments }
            }
            OrderAction::RequestReturn { caller } => {
                Access::Buyer.check(self, &caller)?;
                let lines = self.request_return()?;
                OrderActionResult::ReturnRequested { lines }
            }
            OrderAction::MarkAsPrepared { caller } => {
                Access::Seller.check(self, &caller)?;
                self.mark_as_prepared()?;
                OrderActionResult::Status(self.status())
            }
            OrderAction::MarkAsShipped { caller } => {
                Access::Seller.check(self, &caller)?;
                self.mark_as_shipped()?;
                OrderActionResult::Status(self.status())
            }
            OrderAction::MarkAsDelivered { caller } => {
                Access::Seller.check(self, &caller)?;
                self.mark_as_delivered()?;
                OrderActionResult::Status(self.status())
            }
            OrderAction::RequestLineCancel { caller, line_id } => {
                Access::Buyer.check(self, &caller)?;
                OrderActionResult::Line(self.request_line_cancel(line_id)?.clone())
            }
            OrderAction::CancelLine { caller, line_id } => {
                Access::LineSeller(line_id).check(self, &caller)?;
                OrderActionResult::Line(self.cancel_line(line_id)?.clone())
            }
            OrderAction::RequestLineReturn { caller, line_id } => {
                Access::Buyer.check(self, &caller)?;
                OrderActionResult::Line(self.request_line_return(line_id)?.clone())
            }
            OrderAction::ProcessLineReturn { caller, line_id } => {
                Access::LineSeller(line_id).check(self, &caller)?;
                OrderActionResult::Line(self.process_line_return(line_id)?.clone())
            }
            OrderAction::ProcessLineRefund { caller, line_id } => {
                Access::LineSeller(line_id).check(self, &caller)?;
                OrderActionResult::Line(self.process_line_refund(line_id)?.clone())
            }
            OrderAction::AddPayment { caller, payment } => {
                Access::BuyerOrAdmin.check(self, &caller)?;
                self.add_payment(payment.clone())?;
                OrderActionResult::PaymentAdded(payment)
            }
            OrderAction::ApplyVerification { payment_uid, report } => {
                let paid_ok = self.apply_verification(&payment_uid, &report)?;
                OrderActionResult::Verified {
                    paid_ok,
                    status: report.status,
                }
            }
            OrderAction::EnsurePaymentCancellable { payment_uid } => {
                self.ensure_payment_cancellable(&payment_uid)?;
                return Ok(OrderActionResult::Done);
            }
            OrderAction::ApplyPaymentCancelled { payment_uid, cascade } => {
                self.apply_payment_cancelled(&payment_uid, cascade)?;
                OrderActionResult::Done
            }
        };
        self.touch();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Caller, LineSnapshot, OrderStatus};

    fn order() -> Order {
        let line = |product_id: &str, seller_id: &str| LineSnapshot {
            product_id: product_id.into(),
            option_id: None,
            seller_id: seller_id.into(),
            name: product_id.into(),
            price: 1_000,
            quantity: 1,
        };
        Order::from_create_params(
            "order_1".into(),
            OrderCreate {
                user_id: "buyer".into(),
                lines: vec![line("p1", "seller_a"), line("p2", "seller_b")],
            },
        )
        .unwrap()
    }

    #[test]
    fn strangers_cannot_cancel() {
        let mut order = order();
        let err = order
            .handle_action(OrderAction::Cancel {
                caller: Caller::shopper("stranger"),
            })
            .unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));
        assert_eq!(order.status(), OrderStatus::Requested);

        let result = order
            .handle_action(OrderAction::Cancel {
                caller: Caller::seller("seller_b"),
            })
            .unwrap();
        assert_eq!(result, OrderActionResult::Status(OrderStatus::CancelRequested));
    }

    #[test]
    fn line_actions_are_scoped_to_the_line_seller() {
        let mut order = order();
        let err = order
            .handle_action(OrderAction::CancelLine {
                caller: Caller::seller("seller_b"),
                line_id: 1,
            })
            .unwrap_err();
        assert!(matches!(err, OrderError::PermissionDenied(_)));

        let result = order
            .handle_action(OrderAction::CancelLine {
                caller: Caller::seller("seller_a"),
                line_id: 1,
            })
            .unwrap();
        assert!(matches!(result, OrderActionResult::Line(line) if line.id == 1));
        assert_eq!(order.status(), OrderStatus::PartialRefunded);
    }

    #[test]
    fn only_the_buyer_requests_line_cancellation() {
        let mut order = order();
        assert!(order
            .handle_action(OrderAction::RequestLineCancel {
                caller: Caller::admin("root"),
                line_id: 2,
            })
            .is_err());
        assert!(order
            .handle_action(OrderAction::RequestLineCancel {
                caller: Caller::shopper("buyer"),
                line_id: 2,
            })
            .is_ok());
    }

    #[test]
    fn orders_reject_patches() {
        let mut order = order();
        assert!(matches!(order.on_update(()), Err(OrderError::ValidationError(_))));
    }
}
