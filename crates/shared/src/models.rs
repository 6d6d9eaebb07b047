use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideClass {
    Economy,
    Comfort,
    Premium,
}

impl RideClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Economy => "economy",
            Self::Comfort => "comfort",
            Self::Premium => "premium",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownRideClass> {
        match value.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(Self::Economy),
            "comfort" => Ok(Self::Comfort),
            "premium" => Ok(Self::Premium),
            other => Err(UnknownRideClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ride class: {0}")]
pub struct UnknownRideClass(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnTrip,
    Offline,
}

impl DriverStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::OnTrip => "on_trip",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    DriverAssigned,
    EnRoute,
    Arrived,
    Completed,
}

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DriverAssigned => "driver_assigned",
            Self::EnRoute => "en_route",
            Self::Arrived => "arrived",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideClass,
    pub estimated_fare: String,
    pub status: BookingStatus,
    pub driver_id: Option<Uuid>,
    pub user_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub vehicle_number: String,
    pub ride_type: RideClass,
    pub current_location: String,
    pub phone: String,
    pub rating: f64,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub current_lat: f64,
    pub current_lng: f64,
    pub status: TrackingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRideRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideClass,
    #[serde(default)]
    pub user_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSummary {
    pub name: String,
    pub vehicle: String,
    pub phone: String,
    pub rating: f64,
}

impl From<&Driver> for DriverSummary {
    fn from(driver: &Driver) -> Self {
        Self {
            name: driver.name.clone(),
            vehicle: driver.vehicle_number.clone(),
            phone: driver.phone.clone(),
            rating: driver.rating,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRideResponse {
    pub success: bool,
    pub booking: Booking,
    pub driver: DriverSummary,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimateRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub ride_type: RideClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimateResponse {
    pub estimated_fare: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnResponse {
    pub response: String,
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverStatusRequest {
    pub driver_id: Uuid,
    pub new_status: DriverStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_rides: usize,
    pub active_rides: usize,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminBookingsResponse {
    pub stats: FleetStats,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminDriversResponse {
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUpdatesResponse {
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
