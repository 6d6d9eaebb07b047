use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::error;

use crate::fare::{self, DISPATCH_FARES, Fare, QUICK_ESTIMATE_FARES};
use crate::models::{Booking, BookingStatus, Driver, DriverStatus, RideClass, TrackingStatus};
use crate::store::{NewBooking, NewTrackingRecord, RideStore, StoreError};

// Synthetic route lengths; real routing is out of scope.
const DISPATCH_DISTANCE_KM: (f64, f64) = (2.0, 17.0);
const QUICK_ESTIMATE_DISTANCE_KM: (f64, f64) = (2.0, 12.0);

// Tracking records start jittered around this reference point.
const REFERENCE_LAT: f64 = 12.9716;
const REFERENCE_LNG: f64 = 77.5946;
const START_COORDINATE_JITTER: f64 = 0.05;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("pickup and dropoff locations are required")]
    InvalidRequest,
    #[error("no available drivers for this ride type")]
    NoDriverAvailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideClass,
    pub user_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub booking: Booking,
    pub driver: Driver,
    pub message: String,
}

#[derive(Clone)]
pub struct DispatchEngine {
    store: Arc<dyn RideStore>,
}

impl DispatchEngine {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        Self { store }
    }

    /// Books a ride: claims a driver, prices the trip, records the booking
    /// and seeds its tracking row. The claim is atomic; a failure after the
    /// claim releases the driver best-effort and is otherwise reported, not
    /// rolled back.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatchError> {
        let pickup = request.pickup_location.trim();
        let dropoff = request.dropoff_location.trim();
        if pickup.is_empty() || dropoff.is_empty() {
            return Err(DispatchError::InvalidRequest);
        }

        let Some(driver) = self.store.claim_available_driver(request.ride_type).await? else {
            return Err(DispatchError::NoDriverAvailable);
        };

        let (distance_km, start_lat, start_lng) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(DISPATCH_DISTANCE_KM.0..DISPATCH_DISTANCE_KM.1),
                REFERENCE_LAT + rng.gen_range(-START_COORDINATE_JITTER..START_COORDINATE_JITTER),
                REFERENCE_LNG + rng.gen_range(-START_COORDINATE_JITTER..START_COORDINATE_JITTER),
            )
        };
        let fare = fare::estimate(request.ride_type, distance_km, &DISPATCH_FARES)
            .map_err(|_| DispatchError::InvalidRequest)?;

        let booking = match self
            .store
            .insert_booking(NewBooking {
                pickup_location: pickup.to_string(),
                dropoff_location: dropoff.to_string(),
                ride_type: request.ride_type,
                estimated_fare: fare.display,
                status: BookingStatus::Confirmed,
                driver_id: Some(driver.id),
                user_phone: request.user_phone,
            })
            .await
        {
            Ok(booking) => booking,
            Err(err) => {
                self.release_claimed_driver(driver.id).await;
                return Err(err.into());
            }
        };

        self.store
            .insert_tracking_record(NewTrackingRecord {
                ride_id: booking.id,
                driver_id: driver.id,
                current_lat: start_lat,
                current_lng: start_lng,
                status: TrackingStatus::DriverAssigned,
            })
            .await?;

        let message = format!("✅ Ride booked! {} will arrive in 3-5 minutes.", driver.name);
        Ok(DispatchOutcome {
            booking,
            driver,
            message,
        })
    }

    async fn release_claimed_driver(&self, driver_id: uuid::Uuid) {
        if let Err(release_err) = self
            .store
            .update_driver_status(driver_id, DriverStatus::Available)
            .await
        {
            error!(%driver_id, "failed to release claimed driver after booking insert error: {release_err}");
        }
    }
}

/// Pre-submission preview shown while the form is being filled. Uses the
/// client preview schedule, touches no store, and yields nothing until both
/// locations are present.
pub fn quick_estimate(pickup: &str, dropoff: &str, ride_type: RideClass) -> Option<Fare> {
    if pickup.trim().is_empty() || dropoff.trim().is_empty() {
        return None;
    }

    let distance_km =
        rand::thread_rng().gen_range(QUICK_ESTIMATE_DISTANCE_KM.0..QUICK_ESTIMATE_DISTANCE_KM.1);
    fare::estimate(ride_type, distance_km, &QUICK_ESTIMATE_FARES).ok()
}
