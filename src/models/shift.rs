use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverShift {
    pub id: Uuid,
    pub store_id: Uuid,
    pub driver_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub status: ShiftStatus,
}

impl DriverShift {
    pub fn start(store_id: Uuid, driver_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store_id,
            driver_id,
            start_at: now,
            end_at: None,
            status: ShiftStatus::Active,
        }
    }

    /// Closes the shift. End stamp and status always change together.
    pub fn close(&mut self, now: DateTime<Utc>) {
        self.end_at = Some(now);
        self.status = ShiftStatus::Completed;
    }
}

/// Key of the unique active-shift index: one open shift per courier per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShiftKey {
    pub store_id: Uuid,
    pub driver_id: Uuid,
}
