use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 6] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Assigned,
        DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Cancelled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Legal edges of the lifecycle. Forward progression is strict (no
    /// skipping) and cancellation is open to every non-terminal state.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;

        match (self, next) {
            (Pending, Assigned)
            | (Assigned, PickedUp)
            | (PickedUp, InTransit)
            | (InTransit, Delivered) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque bearer credential for the public confirm/rate pages.
///
/// Generated from a v4 UUID, so it carries 122 bits from the OS random source
/// and has no relation to the delivery id or the order code. `Debug` is
/// redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares in time independent of where the first differing byte is.
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_compare(&self.0, presented)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_id: Uuid,
    #[serde(skip_serializing)]
    pub access_token: AccessToken,
    pub status: DeliveryStatus,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub address: String,
    pub delivery_fee: Option<Decimal>,
    pub proof_photo_url: Option<String>,
    pub customer_confirmed_at: Option<DateTime<Utc>>,
    pub driver_rating: Option<u8>,
    pub rating_comment: Option<String>,
    pub rated_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    pub fn new(
        store_id: Uuid,
        order_id: Uuid,
        address: String,
        delivery_fee: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_id,
            order_id,
            access_token: AccessToken::generate(),
            status: DeliveryStatus::Pending,
            driver_id: None,
            driver_name: None,
            driver_phone: None,
            address,
            delivery_fee,
            proof_photo_url: None,
            customer_confirmed_at: None,
            driver_rating: None,
            rating_comment: None,
            rated_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Counts against the assigned courier's concurrent-delivery cap.
    pub fn is_in_flight(&self) -> bool {
        self.driver_id.is_some() && !self.status.is_terminal()
    }
}
