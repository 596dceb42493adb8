use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::config::Config;
use crate::models::delivery::Delivery;
use crate::models::driver::Driver;
use crate::models::event::DeliveryEvent;
use crate::models::order::Order;
use crate::models::settings::DeliverySettings;
use crate::models::shift::{DriverShift, ShiftKey};
use crate::observability::metrics::Metrics;

/// Shared dispatch state.
///
/// The two index maps act as the storage-layer uniqueness constraints:
/// `active_shifts` allows one open shift per (store, driver) and
/// `deliveries_by_order` one delivery per order. Writers take the index
/// entry first, which serializes competing writers on the same key.
///
/// Lock order when more than one map is held: `active_shifts` → `shifts`, and
/// `deliveries` → `orders` → `drivers`.
pub struct AppState {
    pub config: Config,
    pub settings: DashMap<Uuid, DeliverySettings>,
    pub drivers: DashMap<Uuid, Driver>,
    pub shifts: DashMap<Uuid, DriverShift>,
    pub active_shifts: DashMap<ShiftKey, Uuid>,
    pub orders: DashMap<Uuid, Order>,
    pub deliveries: DashMap<Uuid, Delivery>,
    pub deliveries_by_order: DashMap<Uuid, Uuid>,
    pub assignment_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    pub events_tx: broadcast::Sender<DeliveryEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));

        Self {
            config,
            settings: DashMap::new(),
            drivers: DashMap::new(),
            shifts: DashMap::new(),
            active_shifts: DashMap::new(),
            orders: DashMap::new(),
            deliveries: DashMap::new(),
            deliveries_by_order: DashMap::new(),
            assignment_locks: DashMap::new(),
            events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Per-store mutex held for the whole of an auto-assignment.
    pub fn assignment_lock(&self, store_id: Uuid) -> Arc<Mutex<()>> {
        self.assignment_locks
            .entry(store_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn publish(&self, delivery: &Delivery) {
        self.metrics
            .delivery_transitions_total
            .with_label_values(&[delivery.status.as_str()])
            .inc();
        let _ = self.events_tx.send(DeliveryEvent::from(delivery));
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
