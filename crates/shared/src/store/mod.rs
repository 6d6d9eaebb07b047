use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Driver, DriverStatus, RideClass, TrackingRecord, TrackingStatus,
};

mod memory;
mod postgres;

pub use memory::MemoryRideStore;
pub use postgres::PgRideStore;

pub type StoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideClass,
    pub estimated_fare: String,
    pub status: BookingStatus,
    pub driver_id: Option<Uuid>,
    pub user_phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTrackingRecord {
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub current_lat: f64,
    pub current_lng: f64,
    pub status: TrackingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    BookingChanged,
}

/// Narrow persistence capability the dispatch engine and handlers work
/// against. Backed by Postgres in deployment and by an in-memory fleet for
/// tests and zero-setup demo runs.
pub trait RideStore: Send + Sync {
    /// Atomically claims one available driver of the class, flipping it to
    /// `on_trip`. Exactly one concurrent caller can win a given driver.
    fn claim_available_driver<'a>(
        &'a self,
        ride_type: RideClass,
    ) -> StoreFuture<'a, Option<Driver>>;

    fn insert_booking<'a>(&'a self, booking: NewBooking) -> StoreFuture<'a, Booking>;

    fn insert_tracking_record<'a>(
        &'a self,
        record: NewTrackingRecord,
    ) -> StoreFuture<'a, TrackingRecord>;

    /// Returns false when no driver with that id exists.
    fn update_driver_status<'a>(
        &'a self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> StoreFuture<'a, bool>;

    /// Bookings ordered by creation time descending.
    fn list_bookings<'a>(&'a self) -> StoreFuture<'a, Vec<Booking>>;

    /// Drivers ordered by creation time descending.
    fn list_drivers<'a>(&'a self) -> StoreFuture<'a, Vec<Driver>>;

    fn ping<'a>(&'a self) -> StoreFuture<'a, ()>;

    /// Change feed the admin dashboard long-polls to refetch on booking
    /// writes.
    fn subscribe_changes(&self) -> broadcast::Receiver<StoreEvent>;
}
