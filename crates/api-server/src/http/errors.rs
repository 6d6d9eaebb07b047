use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::dispatch::DispatchError;
use shared::llm::CompleterError;
use shared::models::{ErrorBody, ErrorResponse};
use shared::store::StoreError;
use tracing::error;

pub(super) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    error!("store operation failed: {err}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Something went wrong. Please try again.",
    )
}

pub(super) fn dispatch_error_response(err: DispatchError) -> Response {
    match err {
        DispatchError::InvalidRequest => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Please enter both pickup and dropoff locations",
        ),
        DispatchError::NoDriverAvailable => error_response(
            StatusCode::NOT_FOUND,
            "no_driver_available",
            "No available drivers for this ride type",
        ),
        DispatchError::Store(err) => store_error_response(err),
    }
}

pub(super) fn completer_error_response(err: CompleterError) -> Response {
    match err {
        CompleterError::RateLimited => error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Rate limit exceeded. Please try again later.",
        ),
        CompleterError::QuotaExceeded => error_response(
            StatusCode::PAYMENT_REQUIRED,
            "quota_exceeded",
            "Payment required. Please add credits to continue.",
        ),
        other => {
            error!("assistant completion failed: {other}");
            error_response(
                StatusCode::BAD_GATEWAY,
                "assistant_unavailable",
                "The assistant is unavailable right now. Please try again.",
            )
        }
    }
}
