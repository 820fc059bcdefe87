use crate::domain::{Caller, Order};

use super::OrderError;

/// Who may act on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The user who placed the order.
    Buyer,
    BuyerOrAdmin,
    /// The buyer, a seller of any line, or an admin.
    Participant,
    /// A seller of any line, or an admin.
    Seller,
    /// The seller of the given line, or an admin.
    LineSeller(u64),
}

impl Access {
    pub fn check(self, order: &Order, caller: &Caller) -> Result<(), OrderError> {
        let buyer = caller.is(&order.user_id);
        let allowed = match self {
            Access::Buyer => buyer,
            Access::BuyerOrAdmin => buyer || caller.is_admin(),
            Access::Participant => buyer || caller.is_admin() || order.has_seller(&caller.user_id),
            Access::Seller => caller.is_admin() || order.has_seller(&caller.user_id),
            Access::LineSeller(line_id) => {
                let line = order.line(line_id).ok_or(OrderError::LineNotFound(line_id))?;
                caller.is_admin() || caller.is(&line.seller_id)
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(OrderError::PermissionDenied(format!(
                "{} may not act on order {}",
                caller.user_id, order.id
            )))
        }
    }
}
