use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{
    AdminBookingsResponse, AdminDriversResponse, AdminUpdatesResponse, Booking, BookingStatus,
    FleetStats, OkResponse, UpdateDriverStatusRequest,
};
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use super::errors::{error_response, store_error_response};

pub(super) async fn list_bookings(State(state): State<AppState>) -> Response {
    match state.store.list_bookings().await {
        Ok(bookings) => {
            let stats = fleet_stats(&bookings);
            (StatusCode::OK, Json(AdminBookingsResponse { stats, bookings })).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub(super) async fn list_drivers(State(state): State<AppState>) -> Response {
    match state.store.list_drivers().await {
        Ok(drivers) => (StatusCode::OK, Json(AdminDriversResponse { drivers })).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(super) async fn update_driver_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateDriverStatusRequest>,
) -> Response {
    match state
        .store
        .update_driver_status(req.driver_id, req.new_status)
        .await
    {
        Ok(true) => (StatusCode::OK, Json(OkResponse { ok: true })).into_response(),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            "driver_not_found",
            "No driver with that id",
        ),
        Err(err) => store_error_response(err),
    }
}

/// Long-poll used by the dashboard to refetch on booking changes: resolves
/// as soon as any booking row changes, or after the configured wait.
pub(super) async fn poll_updates(State(state): State<AppState>) -> Response {
    let mut changes = state.store.subscribe_changes();
    let changed = matches!(
        tokio::time::timeout(state.admin_updates_wait, changes.recv()).await,
        Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_)))
    );

    (StatusCode::OK, Json(AdminUpdatesResponse { changed })).into_response()
}

fn fleet_stats(bookings: &[Booking]) -> FleetStats {
    let active_rides = bookings
        .iter()
        .filter(|booking| {
            matches!(
                booking.status,
                BookingStatus::Confirmed | BookingStatus::Pending
            )
        })
        .count();
    let revenue = bookings
        .iter()
        .map(|booking| fare_whole_units(&booking.estimated_fare))
        .sum();

    FleetStats {
        total_rides: bookings.len(),
        active_rides,
        revenue,
    }
}

// Digit scrape over the currency-tagged fare string; preview-formatted
// fares truncate to their whole part, unparseable ones count as zero.
fn fare_whole_units(fare: &str) -> i64 {
    fare.chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}
