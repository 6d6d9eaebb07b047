use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Driver, DriverStatus, RideClass, TrackingRecord, TrackingStatus,
};

use super::{NewBooking, NewTrackingRecord, RideStore, StoreError, StoreEvent, StoreFuture};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct PgRideStore {
    pool: PgPool,
    changes: broadcast::Sender<StoreEvent>,
}

impl PgRideStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self { pool, changes })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RideStore for PgRideStore {
    fn claim_available_driver<'a>(
        &'a self,
        ride_type: RideClass,
    ) -> StoreFuture<'a, Option<Driver>> {
        Box::pin(async move {
            let row = sqlx::query(
                "UPDATE drivers
                 SET status = 'on_trip'
                 WHERE id = (
                     SELECT id
                     FROM drivers
                     WHERE ride_type = $1
                       AND status = 'available'
                     ORDER BY created_at ASC, id ASC
                     LIMIT 1
                     FOR UPDATE SKIP LOCKED
                 )
                 RETURNING id, name, vehicle_number, ride_type, current_location, phone,
                           rating, status, created_at",
            )
            .bind(ride_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.map(|row| row_to_driver(&row)).transpose()
        })
    }

    fn insert_booking<'a>(&'a self, booking: NewBooking) -> StoreFuture<'a, Booking> {
        Box::pin(async move {
            let row = sqlx::query(
                "INSERT INTO ride_bookings (
                    pickup_location,
                    dropoff_location,
                    ride_type,
                    estimated_fare,
                    status,
                    driver_id,
                    user_phone
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id, pickup_location, dropoff_location, ride_type, estimated_fare,
                           status, driver_id, user_phone, created_at",
            )
            .bind(&booking.pickup_location)
            .bind(&booking.dropoff_location)
            .bind(booking.ride_type.as_str())
            .bind(&booking.estimated_fare)
            .bind(booking.status.as_str())
            .bind(booking.driver_id)
            .bind(&booking.user_phone)
            .fetch_one(&self.pool)
            .await?;

            let inserted = row_to_booking(&row)?;
            let _ = self.changes.send(StoreEvent::BookingChanged);
            Ok(inserted)
        })
    }

    fn insert_tracking_record<'a>(
        &'a self,
        record: NewTrackingRecord,
    ) -> StoreFuture<'a, TrackingRecord> {
        Box::pin(async move {
            let row = sqlx::query(
                "INSERT INTO live_tracking (ride_id, driver_id, current_lat, current_lng, status)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, ride_id, driver_id, current_lat, current_lng, status, created_at",
            )
            .bind(record.ride_id)
            .bind(record.driver_id)
            .bind(record.current_lat)
            .bind(record.current_lng)
            .bind(record.status.as_str())
            .fetch_one(&self.pool)
            .await?;

            row_to_tracking_record(&row)
        })
    }

    fn update_driver_status<'a>(
        &'a self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE drivers SET status = $2 WHERE id = $1")
                .bind(driver_id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() > 0)
        })
    }

    fn list_bookings<'a>(&'a self) -> StoreFuture<'a, Vec<Booking>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, pickup_location, dropoff_location, ride_type, estimated_fare,
                        status, driver_id, user_phone, created_at
                 FROM ride_bookings
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(row_to_booking).collect()
        })
    }

    fn list_drivers<'a>(&'a self) -> StoreFuture<'a, Vec<Driver>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, name, vehicle_number, ride_type, current_location, phone,
                        rating, status, created_at
                 FROM drivers
                 ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(row_to_driver).collect()
        })
    }

    fn ping<'a>(&'a self) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
            Ok(())
        })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}

fn row_to_driver(row: &PgRow) -> Result<Driver, StoreError> {
    let ride_type: String = row.try_get("ride_type")?;
    let status: String = row.try_get("status")?;

    Ok(Driver {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        vehicle_number: row.try_get("vehicle_number")?,
        ride_type: ride_class_from_db(&ride_type)?,
        current_location: row.try_get("current_location")?,
        phone: row.try_get("phone")?,
        rating: row.try_get("rating")?,
        status: driver_status_from_db(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_booking(row: &PgRow) -> Result<Booking, StoreError> {
    let ride_type: String = row.try_get("ride_type")?;
    let status: String = row.try_get("status")?;

    Ok(Booking {
        id: row.try_get("id")?,
        pickup_location: row.try_get("pickup_location")?,
        dropoff_location: row.try_get("dropoff_location")?,
        ride_type: ride_class_from_db(&ride_type)?,
        estimated_fare: row.try_get("estimated_fare")?,
        status: booking_status_from_db(&status)?,
        driver_id: row.try_get("driver_id")?,
        user_phone: row.try_get("user_phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_tracking_record(row: &PgRow) -> Result<TrackingRecord, StoreError> {
    let status: String = row.try_get("status")?;

    Ok(TrackingRecord {
        id: row.try_get("id")?,
        ride_id: row.try_get("ride_id")?,
        driver_id: row.try_get("driver_id")?,
        current_lat: row.try_get("current_lat")?,
        current_lng: row.try_get("current_lng")?,
        status: tracking_status_from_db(&status)?,
        created_at: row.try_get("created_at")?,
    })
}

fn ride_class_from_db(value: &str) -> Result<RideClass, StoreError> {
    RideClass::parse(value)
        .map_err(|_| StoreError::InvalidData(format!("unknown ride class persisted: {value}")))
}

fn booking_status_from_db(value: &str) -> Result<BookingStatus, StoreError> {
    match value {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        _ => Err(StoreError::InvalidData(format!(
            "unknown booking status persisted: {value}"
        ))),
    }
}

fn driver_status_from_db(value: &str) -> Result<DriverStatus, StoreError> {
    match value {
        "available" => Ok(DriverStatus::Available),
        "on_trip" => Ok(DriverStatus::OnTrip),
        "offline" => Ok(DriverStatus::Offline),
        _ => Err(StoreError::InvalidData(format!(
            "unknown driver status persisted: {value}"
        ))),
    }
}

fn tracking_status_from_db(value: &str) -> Result<TrackingStatus, StoreError> {
    match value {
        "driver_assigned" => Ok(TrackingStatus::DriverAssigned),
        "en_route" => Ok(TrackingStatus::EnRoute),
        "arrived" => Ok(TrackingStatus::Arrived),
        "completed" => Ok(TrackingStatus::Completed),
        _ => Err(StoreError::InvalidData(format!(
            "unknown tracking status persisted: {value}"
        ))),
    }
}
