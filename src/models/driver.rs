use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A courier registered in a store's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_available: bool,
    pub is_active: bool,
    /// Maximum number of in-flight deliveries before the courier stops being
    /// offered new ones.
    pub capacity: u8,
    pub rating: Option<f64>,
    /// Share of each delivery fee paid to the courier, in percent.
    pub commission_percent: Decimal,
    pub total_deliveries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-time projection of a courier who could take a delivery right now.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableDriverCandidate {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_phone: String,
    pub current_deliveries_count: u32,
    pub shift_started_at: DateTime<Utc>,
}
