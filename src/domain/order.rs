use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{OrderPayment, PayStatus, RelatedStatusUpdate};
use crate::gateway::GatewayPayment;
use crate::order_actor::OrderError;

/// Lifecycle of an order as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Requested,
    Paid,
    PreparedProduct,
    Shipped,
    Delivered,
    PartialRefunded,
    FullRefunded,
    Cancelled,
    CancelRequested,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Requested => "REQUESTED",
            OrderStatus::Paid => "PAID",
            OrderStatus::PreparedProduct => "PREPARED_PRODUCT",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::PartialRefunded => "PARTIAL_REFUNDED",
            OrderStatus::FullRefunded => "FULL_REFUNDED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::CancelRequested => "CANCEL_REQUESTED",
        };
        f.write_str(label)
    }
}

/// Lifecycle of a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Ordered,
    Shipped,
    Delivered,
    ReturnRequested,
    Returned,
    Refunded,
    CancelRequested,
    Cancelled,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LineStatus::Ordered => "ORDERED",
            LineStatus::Shipped => "SHIPPED",
            LineStatus::Delivered => "DELIVERED",
            LineStatus::ReturnRequested => "RETURN_REQUESTED",
            LineStatus::Returned => "RETURNED",
            LineStatus::Refunded => "REFUNDED",
            LineStatus::CancelRequested => "CANCEL_REQUESTED",
            LineStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// Priced copy of a cart row, taken at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSnapshot {
    pub product_id: String,
    pub option_id: Option<u64>,
    pub seller_id: String,
    pub name: String,
    pub price: u64,
    pub quantity: u32,
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: String,
    pub lines: Vec<LineSnapshot>,
}

/// A line item. Name and unit price are frozen at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedProduct {
    pub id: u64,
    pub product_id: String,
    pub option_id: Option<u64>,
    pub seller_id: String,
    pub name: String,
    pub price: u64,
    pub quantity: u32,
    status: LineStatus,
}

impl OrderedProduct {
    pub fn status(&self) -> LineStatus {
        self.status
    }

    fn transition(&mut self, allowed: &[LineStatus], to: LineStatus, action: &'static str) -> Result<(), OrderError> {
        if !allowed.contains(&self.status) {
            return Err(OrderError::InvalidLineTransition {
                line_id: self.id,
                from: self.status,
                action,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn request_cancel(&mut self) -> Result<(), OrderError> {
        self.transition(&[LineStatus::Ordered], LineStatus::CancelRequested, "request_cancel")
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition(
            &[LineStatus::Ordered, LineStatus::CancelRequested],
            LineStatus::Cancelled,
            "cancel",
        )
    }

    pub fn request_return(&mut self) -> Result<(), OrderError> {
        self.transition(&[LineStatus::Delivered], LineStatus::ReturnRequested, "request_return")
    }

    pub fn process_return(&mut self) -> Result<(), OrderError> {
        self.transition(&[LineStatus::ReturnRequested], LineStatus::Returned, "process_return")
    }

    pub fn process_refund(&mut self) -> Result<(), OrderError> {
        self.transition(&[LineStatus::Returned], LineStatus::Refunded, "process_refund")
    }
}

/// The order aggregate: header, line items and payment attempts.
///
/// Every status change goes through one of the transition methods below.
/// A transition that returns an error has not touched the order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub uid: Uuid,
    pub user_id: String,
    pub total_amount: u64,
    status: OrderStatus,
    line_items: Vec<OrderedProduct>,
    payments: Vec<OrderPayment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a REQUESTED order from checkout snapshots.
    pub fn from_snapshot(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        if params.lines.is_empty() {
            return Err(OrderError::ValidationError("Order has no line items".to_string()));
        }

        let mut total: u64 = 0;
        let mut line_items: Vec<OrderedProduct> = Vec::with_capacity(params.lines.len());
        for (index, line) in params.lines.into_iter().enumerate() {
            if line.quantity == 0 {
                return Err(OrderError::ValidationError(format!(
                    "Quantity for {} must be at least 1",
                    line.product_id
                )));
            }
            if line_items
                .iter()
                .any(|existing| existing.product_id == line.product_id && existing.option_id == line.option_id)
            {
                return Err(OrderError::ValidationError(format!(
                    "Product {} appears twice with the same option",
                    line.product_id
                )));
            }
            total = line
                .price
                .checked_mul(u64::from(line.quantity))
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| OrderError::ValidationError("Order total overflows".to_string()))?;

            line_items.push(OrderedProduct {
                id: index as u64 + 1,
                product_id: line.product_id,
                option_id: line.option_id,
                seller_id: line.seller_id,
                name: line.name,
                price: line.price,
                quantity: line.quantity,
                status: LineStatus::Ordered,
            });
        }

        let now = Utc::now();
        Ok(Self {
            id,
            uid: Uuid::new_v4(),
            user_id: params.user_id,
            total_amount: total,
            status: OrderStatus::Requested,
            line_items,
            payments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[OrderedProduct] {
        &self.line_items
    }

    pub fn line(&self, line_id: u64) -> Option<&OrderedProduct> {
        self.line_items.iter().find(|line| line.id == line_id)
    }

    fn line_mut(&mut self, line_id: u64) -> Result<&mut OrderedProduct, OrderError> {
        self.line_items
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(OrderError::LineNotFound(line_id))
    }

    /// Whether `seller_id` sells at least one line of this order.
    pub fn has_seller(&self, seller_id: &str) -> bool {
        self.line_items.iter().any(|line| line.seller_id == seller_id)
    }

    /// Display name: the first line, plus a count of the others.
    pub fn name(&self) -> String {
        match self.line_items.split_first() {
            None => String::new(),
            Some((first, [])) => first.name.clone(),
            Some((first, rest)) => format!("{} and {} more", first.name, rest.len()),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn require(&self, expected: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.status != expected {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    // --- Fulfillment ---

    pub fn mark_as_prepared(&mut self) -> Result<(), OrderError> {
        self.require(OrderStatus::Paid, "mark_as_prepared")?;
        self.status = OrderStatus::PreparedProduct;
        Ok(())
    }

    pub fn mark_as_shipped(&mut self) -> Result<(), OrderError> {
        self.require(OrderStatus::PreparedProduct, "mark_as_shipped")?;
        self.status = OrderStatus::Shipped;
        for line in self.line_items.iter_mut().filter(|line| line.status == LineStatus::Ordered) {
            line.status = LineStatus::Shipped;
        }
        Ok(())
    }

    pub fn mark_as_delivered(&mut self) -> Result<(), OrderError> {
        self.require(OrderStatus::Shipped, "mark_as_delivered")?;
        self.status = OrderStatus::Delivered;
        for line in self.line_items.iter_mut().filter(|line| line.status == LineStatus::Shipped) {
            line.status = LineStatus::Delivered;
        }
        Ok(())
    }

    // --- Cancellation ---

    /// Moves the order to CANCEL_REQUESTED. Returns `false` when it already was.
    pub fn cancel(&mut self) -> Result<bool, OrderError> {
        match self.status {
            OrderStatus::CancelRequested => Ok(false),
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::FullRefunded => {
                Err(OrderError::InvalidTransition {
                    from: self.status,
                    action: "cancel",
                })
            }
            _ => {
                self.status = OrderStatus::CancelRequested;
                Ok(true)
            }
        }
    }

    /// Cancels every open line and the order itself, returning the payments
    /// that now need cancelling at the gateway.
    pub fn approve_cancellation(&mut self) -> Result<Vec<Uuid>, OrderError> {
        self.require(OrderStatus::CancelRequested, "approve_cancellation")?;
        if let Some(blocking) = self.line_items.iter().find(|line| {
            !matches!(
                line.status,
                LineStatus::Ordered | LineStatus::CancelRequested | LineStatus::Cancelled
            )
        }) {
            return Err(OrderError::InvalidLineTransition {
                line_id: blocking.id,
                from: blocking.status,
                action: "cancel",
            });
        }
        for line in self.line_items.iter_mut().filter(|line| line.status != LineStatus::Cancelled) {
            line.cancel()?;
        }
        self.status = OrderStatus::Cancelled;
        Ok(self.payments.iter().map(|payment| payment.uid).collect())
    }

    /// Re-derives the order status from its lines: CANCELLED when every line
    /// is cancelled, otherwise PARTIAL_REFUNDED.
    // TODO: FULL_REFUNDED is never produced here; refunded lines should be
    // counted once the refund flow settles on its own order status.
    pub fn check_and_update_order_status(&mut self) {
        self.status = if self.line_items.iter().all(|line| line.status == LineStatus::Cancelled) {
            OrderStatus::Cancelled
        } else {
            OrderStatus::PartialRefunded
        };
    }

    /// Applied by a payment-cancelled strategy.
    pub fn mark_cancelled_by_payment(&mut self) {
        self.status = OrderStatus::Cancelled;
    }

    // --- Returns ---

    /// Moves every delivered line to RETURN_REQUESTED and returns their ids.
    pub fn request_return(&mut self) -> Result<Vec<u64>, OrderError> {
        self.require(OrderStatus::Delivered, "request_return")?;
        let mut requested = Vec::new();
        for line in self.line_items.iter_mut().filter(|line| line.status == LineStatus::Delivered) {
            line.status = LineStatus::ReturnRequested;
            requested.push(line.id);
        }
        if requested.is_empty() {
            return Err(OrderError::ValidationError(format!(
                "Order {} has no delivered items to return",
                self.id
            )));
        }
        Ok(requested)
    }

    // --- Line items ---

    pub fn request_line_cancel(&mut self, line_id: u64) -> Result<&OrderedProduct, OrderError> {
        let line = self.line_mut(line_id)?;
        line.request_cancel()?;
        Ok(&*line)
    }

    pub fn cancel_line(&mut self, line_id: u64) -> Result<&OrderedProduct, OrderError> {
        self.line_mut(line_id)?.cancel()?;
        self.check_and_update_order_status();
        self.line(line_id).ok_or(OrderError::LineNotFound(line_id))
    }

    pub fn request_line_return(&mut self, line_id: u64) -> Result<&OrderedProduct, OrderError> {
        let line = self.line_mut(line_id)?;
        line.request_return()?;
        Ok(&*line)
    }

    pub fn process_line_return(&mut self, line_id: u64) -> Result<&OrderedProduct, OrderError> {
        let line = self.line_mut(line_id)?;
        line.process_return()?;
        Ok(&*line)
    }

    pub fn process_line_refund(&mut self, line_id: u64) -> Result<&OrderedProduct, OrderError> {
        let line = self.line_mut(line_id)?;
        line.process_refund()?;
        Ok(&*line)
    }

    // --- Payments ---

    pub fn can_pay(&self) -> bool {
        self.status == OrderStatus::Requested
    }

    pub fn payments(&self) -> &[OrderPayment] {
        &self.payments
    }

    pub fn payment(&self, uid: &Uuid) -> Option<&OrderPayment> {
        self.payments.iter().find(|payment| &payment.uid == uid)
    }

    fn payment_mut(&mut self, uid: &Uuid) -> Result<&mut OrderPayment, OrderError> {
        self.payments
            .iter_mut()
            .find(|payment| &payment.uid == uid)
            .ok_or_else(|| OrderError::PaymentNotFound(uid.to_string()))
    }

    pub fn add_payment(&mut self, payment: OrderPayment) -> Result<(), OrderError> {
        if !self.can_pay() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                action: "create_payment",
            });
        }
        self.payments.push(payment);
        Ok(())
    }

    /// Records a gateway report for one payment. When it is paid-ok the
    /// other attempts are dropped and a REQUESTED order becomes PAID.
    pub fn apply_verification(&mut self, uid: &Uuid, report: &GatewayPayment) -> Result<bool, OrderError> {
        let paid_ok = self.payment_mut(uid)?.record_gateway_report(report);
        if paid_ok {
            self.payments.retain(|payment| &payment.uid == uid);
            if self.status == OrderStatus::Requested {
                self.status = OrderStatus::Paid;
            }
        }
        Ok(paid_ok)
    }

    pub fn ensure_payment_cancellable(&self, uid: &Uuid) -> Result<(), OrderError> {
        let payment = self
            .payment(uid)
            .ok_or_else(|| OrderError::PaymentNotFound(uid.to_string()))?;
        if payment.pay_status() != PayStatus::Paid {
            return Err(OrderError::InvalidPaymentTransition {
                payment_uid: uid.to_string(),
                from: payment.pay_status(),
                action: "cancel_payment",
            });
        }
        Ok(())
    }

    /// Marks a payment cancelled after the gateway accepted the cancellation
    /// and runs `cascade` on the order. Already-cancelled payments are left alone.
    pub fn apply_payment_cancelled(&mut self, uid: &Uuid, cascade: RelatedStatusUpdate) -> Result<(), OrderError> {
        let payment = self.payment_mut(uid)?;
        if payment.pay_status() == PayStatus::Cancelled {
            return Ok(());
        }
        payment.mark_cancelled();
        cascade.apply(self);
        Ok(())
    }
}
