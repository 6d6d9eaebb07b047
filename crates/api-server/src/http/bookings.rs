use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::dispatch::{self, DispatchRequest};
use shared::models::{
    BookRideRequest, BookRideResponse, DriverSummary, QuickEstimateRequest, QuickEstimateResponse,
};

use super::AppState;
use super::errors::dispatch_error_response;

pub(super) async fn book_ride(
    State(state): State<AppState>,
    Json(req): Json<BookRideRequest>,
) -> Response {
    let request = DispatchRequest {
        pickup_location: req.pickup_location,
        dropoff_location: req.dropoff_location,
        ride_type: req.ride_type,
        user_phone: req.user_phone,
    };

    match state.dispatcher.dispatch(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(BookRideResponse {
                success: true,
                driver: DriverSummary::from(&outcome.driver),
                message: outcome.message,
                booking: outcome.booking,
            }),
        )
            .into_response(),
        Err(err) => dispatch_error_response(err),
    }
}

pub(super) async fn quick_estimate(Json(req): Json<QuickEstimateRequest>) -> Response {
    let estimated_fare = dispatch::quick_estimate(
        &req.pickup_location,
        &req.dropoff_location,
        req.ride_type,
    )
    .map(|fare| fare.display);

    (StatusCode::OK, Json(QuickEstimateResponse { estimated_fare })).into_response()
}
