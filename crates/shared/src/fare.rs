use thiserror::Error;

use crate::models::RideClass;

/// Dispatch-path schedule. Whole-rupee fares as surfaced in booking
/// confirmations; the per-km rate intentionally differs from the client
/// preview schedule below and the two must not be unified.
pub const DISPATCH_FARES: FareSchedule = FareSchedule {
    per_km_rate: 12.0,
    currency_symbol: "₹",
    decimal_places: 0,
};

/// Client preview schedule, used for the pre-submission quick estimate only.
pub const QUICK_ESTIMATE_FARES: FareSchedule = FareSchedule {
    per_km_rate: 1.5,
    currency_symbol: "$",
    decimal_places: 2,
};

#[derive(Debug, Clone, Copy)]
pub struct FareSchedule {
    pub per_km_rate: f64,
    pub currency_symbol: &'static str,
    pub decimal_places: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fare {
    pub amount: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FareError {
    #[error("distance must be a positive number of kilometers, got {0}")]
    InvalidDistance(f64),
}

impl RideClass {
    pub fn base_fare(self) -> f64 {
        match self {
            Self::Economy => 5.0,
            Self::Comfort => 8.0,
            Self::Premium => 15.0,
        }
    }
}

pub fn estimate(
    ride_type: RideClass,
    distance_km: f64,
    schedule: &FareSchedule,
) -> Result<Fare, FareError> {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(FareError::InvalidDistance(distance_km));
    }

    let amount = ride_type.base_fare() + distance_km * schedule.per_km_rate;
    let display = format!(
        "{}{:.*}",
        schedule.currency_symbol, schedule.decimal_places, amount
    );

    Ok(Fare { amount, display })
}
