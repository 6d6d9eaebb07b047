use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Booking, Driver, DriverStatus, RideClass, TrackingRecord};

use super::{NewBooking, NewTrackingRecord, RideStore, StoreError, StoreEvent, StoreFuture};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// In-memory store: the test fake required by the store seam, and the
/// backend the server falls back to when no DATABASE_URL is configured.
/// Every mutation happens under one mutex guard, so the driver claim is
/// atomic exactly like the Postgres conditional update.
pub struct MemoryRideStore {
    inner: Mutex<Inner>,
    changes: broadcast::Sender<StoreEvent>,
}

#[derive(Default)]
struct Inner {
    drivers: Vec<Driver>,
    bookings: Vec<Booking>,
    tracking: Vec<TrackingRecord>,
}

impl Default for MemoryRideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRideStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner::default()),
            changes,
        }
    }

    /// The same demo fleet the Postgres migration seeds.
    pub fn with_demo_fleet() -> Self {
        let store = Self::new();
        for (name, vehicle_number, ride_type, current_location, phone, rating) in [
            ("Rajesh Kumar", "KA01AB1234", RideClass::Economy, "Indiranagar", "+91 98450 11223", 4.8),
            ("Suresh Babu", "KA02CD5678", RideClass::Economy, "Koramangala", "+91 98450 22334", 4.6),
            ("Anita Rao", "KA03EF9012", RideClass::Comfort, "MG Road", "+91 98450 33445", 4.9),
            ("Vikram Singh", "KA04GH3456", RideClass::Premium, "Whitefield", "+91 98450 44556", 4.7),
        ] {
            store.insert_driver(Driver {
                id: Uuid::new_v4(),
                name: name.to_string(),
                vehicle_number: vehicle_number.to_string(),
                ride_type,
                current_location: current_location.to_string(),
                phone: phone.to_string(),
                rating,
                status: DriverStatus::Available,
                created_at: Utc::now(),
            });
        }
        store
    }

    pub fn insert_driver(&self, driver: Driver) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.drivers.push(driver);
        }
    }

    /// Snapshot of the tracking table, oldest first. Test-facing.
    pub fn tracking_records(&self) -> Vec<TrackingRecord> {
        self.inner
            .lock()
            .map(|inner| inner.tracking.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|err: PoisonError<_>| StoreError::Unavailable(err.to_string()))
    }
}

impl RideStore for MemoryRideStore {
    fn claim_available_driver<'a>(
        &'a self,
        ride_type: RideClass,
    ) -> StoreFuture<'a, Option<Driver>> {
        Box::pin(async move {
            let mut inner = self.lock()?;
            let claimed = inner
                .drivers
                .iter_mut()
                .find(|driver| {
                    driver.ride_type == ride_type && driver.status == DriverStatus::Available
                })
                .map(|driver| {
                    driver.status = DriverStatus::OnTrip;
                    driver.clone()
                });
            Ok(claimed)
        })
    }

    fn insert_booking<'a>(&'a self, booking: NewBooking) -> StoreFuture<'a, Booking> {
        Box::pin(async move {
            let inserted = Booking {
                id: Uuid::new_v4(),
                pickup_location: booking.pickup_location,
                dropoff_location: booking.dropoff_location,
                ride_type: booking.ride_type,
                estimated_fare: booking.estimated_fare,
                status: booking.status,
                driver_id: booking.driver_id,
                user_phone: booking.user_phone,
                created_at: Utc::now(),
            };

            self.lock()?.bookings.push(inserted.clone());
            let _ = self.changes.send(StoreEvent::BookingChanged);
            Ok(inserted)
        })
    }

    fn insert_tracking_record<'a>(
        &'a self,
        record: NewTrackingRecord,
    ) -> StoreFuture<'a, TrackingRecord> {
        Box::pin(async move {
            let inserted = TrackingRecord {
                id: Uuid::new_v4(),
                ride_id: record.ride_id,
                driver_id: record.driver_id,
                current_lat: record.current_lat,
                current_lng: record.current_lng,
                status: record.status,
                created_at: Utc::now(),
            };

            self.lock()?.tracking.push(inserted.clone());
            Ok(inserted)
        })
    }

    fn update_driver_status<'a>(
        &'a self,
        driver_id: Uuid,
        status: DriverStatus,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut inner = self.lock()?;
            match inner
                .drivers
                .iter_mut()
                .find(|driver| driver.id == driver_id)
            {
                Some(driver) => {
                    driver.status = status;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn list_bookings<'a>(&'a self) -> StoreFuture<'a, Vec<Booking>> {
        Box::pin(async move {
            let inner = self.lock()?;
            Ok(inner.bookings.iter().rev().cloned().collect())
        })
    }

    fn list_drivers<'a>(&'a self) -> StoreFuture<'a, Vec<Driver>> {
        Box::pin(async move {
            let inner = self.lock()?;
            Ok(inner.drivers.iter().rev().cloned().collect())
        })
    }

    fn ping<'a>(&'a self) -> StoreFuture<'a, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::MemoryRideStore;
    use crate::models::{Driver, DriverStatus, RideClass};
    use crate::store::RideStore;

    fn driver(name: &str, ride_type: RideClass, status: DriverStatus) -> Driver {
        Driver {
            id: Uuid::new_v4(),
            name: name.to_string(),
            vehicle_number: "KA01AB1234".to_string(),
            ride_type,
            current_location: "Indiranagar".to_string(),
            phone: "+91 98450 11223".to_string(),
            rating: 4.5,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn claim_only_matches_available_drivers_of_the_requested_class() {
        let store = Arc::new(MemoryRideStore::new());
        store.insert_driver(driver("Busy", RideClass::Economy, DriverStatus::OnTrip));
        store.insert_driver(driver("Off", RideClass::Economy, DriverStatus::Offline));
        store.insert_driver(driver("Wrong class", RideClass::Premium, DriverStatus::Available));
        store.insert_driver(driver("Winner", RideClass::Economy, DriverStatus::Available));

        let claimed = store
            .claim_available_driver(RideClass::Economy)
            .await
            .expect("claim")
            .expect("one economy driver is claimable");
        assert_eq!(claimed.name, "Winner");
        assert_eq!(claimed.status, DriverStatus::OnTrip);

        // the pool is now exhausted for that class
        let second = store
            .claim_available_driver(RideClass::Economy)
            .await
            .expect("claim");
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn claim_takes_the_oldest_available_driver_first() {
        let store = Arc::new(MemoryRideStore::new());
        store.insert_driver(driver("First in", RideClass::Comfort, DriverStatus::Available));
        store.insert_driver(driver("Second in", RideClass::Comfort, DriverStatus::Available));

        let claimed = store
            .claim_available_driver(RideClass::Comfort)
            .await
            .expect("claim")
            .expect("driver");
        assert_eq!(claimed.name, "First in");
    }
}
