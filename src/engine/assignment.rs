use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::lifecycle::{assign, delivery_id_for_order, DriverAssignment};
use crate::engine::ranking::{pick_candidate, rank_candidates};
use crate::engine::roster::find_driver;
use crate::error::AppError;
use crate::models::delivery::Delivery;
use crate::models::driver::AvailableDriverCandidate;
use crate::state::AppState;

/// Couriers that can take a delivery in the store right now, best first.
///
/// A courier qualifies with an open shift in the store, the available and
/// active flags set, and fewer in-flight deliveries than their capacity.
pub fn available_drivers(state: &AppState, store_id: Uuid) -> Vec<AvailableDriverCandidate> {
    let on_shift: Vec<(Uuid, Uuid)> = state
        .active_shifts
        .iter()
        .filter(|entry| entry.key().store_id == store_id)
        .map(|entry| (entry.key().driver_id, *entry.value()))
        .collect();

    if on_shift.is_empty() {
        return Vec::new();
    }

    let mut load: HashMap<Uuid, u32> = HashMap::new();
    for entry in state.deliveries.iter() {
        if entry.store_id != store_id || !entry.is_in_flight() {
            continue;
        }
        if let Some(driver_id) = entry.driver_id {
            *load.entry(driver_id).or_default() += 1;
        }
    }

    let mut candidates: Vec<AvailableDriverCandidate> = on_shift
        .into_iter()
        .filter_map(|(driver_id, shift_id)| {
            let shift_started_at = state.shifts.get(&shift_id)?.start_at;
            let driver = state.drivers.get(&driver_id)?;
            let current = load.get(&driver_id).copied().unwrap_or(0);

            let can_take_delivery = driver.store_id == store_id
                && driver.is_available
                && driver.is_active
                && current < u32::from(driver.capacity);

            if can_take_delivery {
                Some(AvailableDriverCandidate {
                    driver_id,
                    driver_name: driver.name.clone(),
                    driver_phone: driver.phone.clone(),
                    current_deliveries_count: current,
                    shift_started_at,
                })
            } else {
                None
            }
        })
        .collect();

    rank_candidates(&mut candidates);
    candidates
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoAssignment {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub delivery: Delivery,
}

/// Picks the least-loaded available courier and assigns the order's delivery.
///
/// Runs under the store's assignment lock so concurrent calls see each other's
/// load instead of piling onto the same idle courier.
pub async fn auto_assign(
    state: &AppState,
    store_id: Uuid,
    order_id: Uuid,
) -> Result<AutoAssignment, AppError> {
    let start = Instant::now();
    let lock = state.assignment_lock(store_id);
    let _guard = lock.lock().await;

    let result = select_and_assign(state, store_id, order_id);
    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::NoAvailableCouriers) => "no_courier",
        Err(_) => "error",
    };

    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    result
}

fn select_and_assign(
    state: &AppState,
    store_id: Uuid,
    order_id: Uuid,
) -> Result<AutoAssignment, AppError> {
    let candidates = available_drivers(state, store_id);
    let Some(selected) = pick_candidate(&candidates).cloned() else {
        warn!(store_id = %store_id, order_id = %order_id, "no courier available");
        return Err(AppError::NoAvailableCouriers);
    };

    let delivery_id = delivery_id_for_order(state, store_id, order_id)?;
    let delivery = assign(
        state,
        store_id,
        delivery_id,
        DriverAssignment {
            driver_id: selected.driver_id,
            driver_name: selected.driver_name.clone(),
            driver_phone: selected.driver_phone.clone(),
        },
    )?;

    info!(
        store_id = %store_id,
        order_id = %order_id,
        driver_id = %selected.driver_id,
        load = selected.current_deliveries_count,
        "courier auto-assigned"
    );

    Ok(AutoAssignment {
        driver_id: selected.driver_id,
        driver_name: selected.driver_name,
        delivery,
    })
}

/// Manual dispatch: assigns a specific roster courier, copying their contact
/// details onto the delivery. Shares the store lock with auto-assignment.
pub async fn assign_driver(
    state: &AppState,
    store_id: Uuid,
    delivery_id: Uuid,
    driver_id: Uuid,
) -> Result<Delivery, AppError> {
    let driver = find_driver(state, store_id, driver_id)?;
    if !driver.is_active {
        return Err(AppError::Conflict(format!("driver {driver_id} is inactive")));
    }

    let lock = state.assignment_lock(store_id);
    let _guard = lock.lock().await;

    assign(
        state,
        store_id,
        delivery_id,
        DriverAssignment {
            driver_id: driver.id,
            driver_name: driver.name,
            driver_phone: driver.phone,
        },
    )
}
