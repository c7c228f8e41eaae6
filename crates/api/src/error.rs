//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unresolvable session token.
    Unauthorized(String),
    /// The actor may not perform this action.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// The supplied CSRF token does not match the session's.
    CsrfMismatch,
    /// Coordinator error.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::CsrfMismatch => {
                (StatusCode::UNPROCESSABLE_ENTITY, "csrf token error".to_string())
            }
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    use FulfillmentError::*;

    match &err {
        ItemNotFound | UserNotFound | EvidenceNotFound | ShippingNotFound => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        // Ownership and ownership-adjacent rejections.
        Forbidden | SelfPurchase | ItemNotAvailable | ItemNotEditable | BumpTooSoon
        | CarrierNotYetShipping => (StatusCode::FORBIDDEN, err.to_string()),
        // State races the caller can observe and retry, plus input mistakes.
        NotWaitingForShipping | NotWaitingForCompletion | ShippingNotRequested
        | StillInTransit | AlreadyArrived | NotYetDelivered | CategoryNotFound
        | MissingField { .. } | PaymentDeclined { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        Domain(DomainError::PriceOutOfRange { .. }) => (StatusCode::BAD_REQUEST, err.to_string()),
        Adapter(_) | Domain(_) | Store(_) => {
            tracing::error!(error = %err, "fulfillment operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
