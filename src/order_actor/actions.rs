use uuid::Uuid;

use crate::domain::{Caller, OrderPayment, OrderStatus, OrderedProduct, PayStatus, RelatedStatusUpdate};
use crate::gateway::GatewayPayment;

/// Custom actions for Order entities.
///
/// Caller-driven actions carry the caller and are permission checked inside
/// the actor. The payment variants are issued by the reconciliation engine.
#[derive(Debug, Clone)]
pub enum OrderAction {
    Cancel { caller: Caller },
    ApproveCancellation { caller: Caller },
    RequestReturn { caller: Caller },
    MarkAsPrepared { caller: Caller },
    MarkAsShipped { caller: Caller },
    MarkAsDelivered { caller: Caller },
    RequestLineCancel { caller: Caller, line_id: u64 },
    CancelLine { caller: Caller, line_id: u64 },
    RequestLineReturn { caller: Caller, line_id: u64 },
    ProcessLineReturn { caller: Caller, line_id: u64 },
    ProcessLineRefund { caller: Caller, line_id: u64 },
    AddPayment { caller: Caller, payment: OrderPayment },
    ApplyVerification { payment_uid: Uuid, report: GatewayPayment },
    EnsurePaymentCancellable { payment_uid: Uuid },
    ApplyPaymentCancelled { payment_uid: Uuid, cascade: RelatedStatusUpdate },
}

/// Results from OrderActions.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderActionResult {
    /// The order status after the transition.
    Status(OrderStatus),
    /// Payments that still need cancelling at the gateway.
    CancellationApproved { payments: Vec<Uuid> },
    ReturnRequested { lines: Vec<u64> },
    Line(OrderedProduct),
    PaymentAdded(OrderPayment),
    Verified { paid_ok: bool, status: PayStatus },
    Done,
}
