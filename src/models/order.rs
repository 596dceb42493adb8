use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of the parent order as far as dispatch is concerned. The order
/// subsystem owns every other order state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Delivered,
    Cancelled,
}

/// Mirror of the fields of an order record the dispatch subsystem reads or
/// writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_code: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}
