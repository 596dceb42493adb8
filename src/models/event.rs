use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus};

/// Broadcast to dashboards whenever a delivery changes state or courier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub delivery_id: Uuid,
    pub store_id: Uuid,
    pub order_id: Uuid,
    pub status: DeliveryStatus,
    pub driver_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

impl From<&Delivery> for DeliveryEvent {
    fn from(delivery: &Delivery) -> Self {
        Self {
            delivery_id: delivery.id,
            store_id: delivery.store_id,
            order_id: delivery.order_id,
            status: delivery.status,
            driver_id: delivery.driver_id,
            at: delivery.updated_at,
        }
    }
}
