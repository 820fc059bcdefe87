use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Reasons the gateway refuses a cancellation with HTTP 409.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelConflict {
    PaymentNotPaid,
    PaymentAlreadyCancelled,
    CancellableAmountConsistencyBroken,
    CancelAmountExceedsCancellableAmount,
    SumOfPartsExceedsCancelAmount,
    CancelTaxFreeAmountExceedsCancellableTaxFreeAmount,
    CancelTaxAmountExceedsCancellableTaxAmount,
    RemainedAmountLessThanPromotionMinPaymentAmount,
    Other(String),
}

const CONFLICT_MARKERS: [(&str, CancelConflict); 8] = [
    ("paymentnotpaid", CancelConflict::PaymentNotPaid),
    ("paymentalreadycancelled", CancelConflict::PaymentAlreadyCancelled),
    ("cancellableamountconsistencybroken", CancelConflict::CancellableAmountConsistencyBroken),
    ("cancelamountexceedscancellableamount", CancelConflict::CancelAmountExceedsCancellableAmount),
    ("sumofpartsexceedscancelamount", CancelConflict::SumOfPartsExceedsCancelAmount),
    (
        "canceltaxfreeamountexceedscancellabletaxfreeamount",
        CancelConflict::CancelTaxFreeAmountExceedsCancellableTaxFreeAmount,
    ),
    (
        "canceltaxamountexceedscancellabletaxamount",
        CancelConflict::CancelTaxAmountExceedsCancellableTaxAmount,
    ),
    (
        "remainedamountlessthanpromotionminpaymentamount",
        CancelConflict::RemainedAmountLessThanPromotionMinPaymentAmount,
    ),
];

impl CancelConflict {
    /// Classifies a conflict from the error `type` and `message`. Both
    /// `PAYMENT_NOT_PAID` and `PaymentNotPaidError` spellings are recognised.
    pub fn from_message(kind: Option<&str>, message: &str) -> Self {
        let haystack: String = format!("{} {}", kind.unwrap_or_default(), message)
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        CONFLICT_MARKERS
            .iter()
            .find(|(marker, _)| haystack.contains(marker))
            .map(|(_, conflict)| conflict.clone())
            .unwrap_or_else(|| CancelConflict::Other(message.to_string()))
    }
}

impl fmt::Display for CancelConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CancelConflict::PaymentNotPaid => "payment is not paid",
            CancelConflict::PaymentAlreadyCancelled => "payment is already cancelled",
            CancelConflict::CancellableAmountConsistencyBroken => "cancellable amount check failed",
            CancelConflict::CancelAmountExceedsCancellableAmount => "cancel amount exceeds the cancellable amount",
            CancelConflict::SumOfPartsExceedsCancelAmount => "sum of partial amounts exceeds the cancel amount",
            CancelConflict::CancelTaxFreeAmountExceedsCancellableTaxFreeAmount => {
                "tax-free cancel amount exceeds the cancellable tax-free amount"
            }
            CancelConflict::CancelTaxAmountExceedsCancellableTaxAmount => {
                "taxed cancel amount exceeds the cancellable taxed amount"
            }
            CancelConflict::RemainedAmountLessThanPromotionMinPaymentAmount => {
                "remaining amount would fall below the promotion minimum"
            }
            CancelConflict::Other(message) => return write!(f, "cancellation failed: {}", message),
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Payment not found at gateway: {0}")]
    NotFound(String),
    #[error("Cancellation conflict: {0}")]
    Conflict(CancelConflict),
    #[error("Gateway rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Gateway transport error: {0}")]
    Transport(String),
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Maps a non-200 gateway reply onto the error taxonomy.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        match status {
            400 => GatewayError::BadRequest(message),
            401 | 403 => GatewayError::PermissionDenied(message),
            404 => GatewayError::NotFound(message),
            409 => {
                let kind = body.get("type").and_then(Value::as_str);
                GatewayError::Conflict(CancelConflict::from_message(kind, &message))
            }
            _ => GatewayError::Rejected { status, message },
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::MalformedResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_map_to_taxonomy() {
        let body = json!({ "message": "nope" });
        assert_eq!(GatewayError::from_response(400, &body), GatewayError::BadRequest("nope".into()));
        assert_eq!(GatewayError::from_response(401, &body), GatewayError::PermissionDenied("nope".into()));
        assert_eq!(GatewayError::from_response(403, &body), GatewayError::PermissionDenied("nope".into()));
        assert_eq!(GatewayError::from_response(404, &body), GatewayError::NotFound("nope".into()));
        assert_eq!(
            GatewayError::from_response(502, &json!({})),
            GatewayError::Rejected {
                status: 502,
                message: "unknown error".into()
            }
        );
    }

    #[test]
    fn conflicts_are_classified_by_type_or_message() {
        let by_type = json!({ "type": "PAYMENT_ALREADY_CANCELLED", "message": "already" });
        assert_eq!(
            GatewayError::from_response(409, &by_type),
            GatewayError::Conflict(CancelConflict::PaymentAlreadyCancelled)
        );

        let by_message = json!({ "message": "CancelTaxFreeAmountExceedsCancellableTaxFreeAmountError" });
        assert_eq!(
            GatewayError::from_response(409, &by_message),
            GatewayError::Conflict(CancelConflict::CancelTaxFreeAmountExceedsCancellableTaxFreeAmount)
        );

        let unknown = json!({ "message": "something else" });
        assert_eq!(
            GatewayError::from_response(409, &unknown),
            GatewayError::Conflict(CancelConflict::Other("something else".into()))
        );
    }

    #[test]
    fn only_transport_errors_retry() {
        assert!(GatewayError::Transport("reset".into()).is_retryable());
        assert!(!GatewayError::Conflict(CancelConflict::PaymentNotPaid).is_retryable());
    }
}
