use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::roster::find_driver;
use crate::error::AppError;
use crate::models::shift::{DriverShift, ShiftKey};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ShiftToggle {
    pub online: bool,
    pub shift: DriverShift,
}

/// Opens a shift for the courier, or closes the one that is open.
///
/// The whole read-then-write runs while holding the courier's entry in the
/// active-shift index, so two toggles racing for the same (store, driver)
/// pair are applied one after the other and never leave two open shifts.
pub fn toggle_shift(
    state: &AppState,
    store_id: Uuid,
    driver_id: Uuid,
) -> Result<ShiftToggle, AppError> {
    find_driver(state, store_id, driver_id)?;

    let key = ShiftKey {
        store_id,
        driver_id,
    };
    let now = Utc::now();

    match state.active_shifts.entry(key) {
        Entry::Occupied(active) => {
            let shift_id = *active.get();
            let mut shift = state.shifts.get_mut(&shift_id).ok_or_else(|| {
                AppError::Internal(format!("active shift {shift_id} has no ledger row"))
            })?;

            shift.close(now);
            let closed = shift.clone();
            drop(shift);
            active.remove();

            state.metrics.drivers_on_shift.dec();
            info!(store_id = %store_id, driver_id = %driver_id, shift_id = %shift_id, "shift closed");

            Ok(ShiftToggle {
                online: false,
                shift: closed,
            })
        }
        Entry::Vacant(vacant) => {
            let shift = DriverShift::start(store_id, driver_id, now);
            state.shifts.insert(shift.id, shift.clone());
            vacant.insert(shift.id);

            state.metrics.drivers_on_shift.inc();
            info!(store_id = %store_id, driver_id = %driver_id, shift_id = %shift.id, "shift opened");

            Ok(ShiftToggle {
                online: true,
                shift,
            })
        }
    }
}

/// The open shift for the courier, if any.
pub fn active_shift(state: &AppState, store_id: Uuid, driver_id: Uuid) -> Option<DriverShift> {
    let key = ShiftKey {
        store_id,
        driver_id,
    };
    let shift_id = *state.active_shifts.get(&key)?;
    state.shifts.get(&shift_id).map(|shift| shift.clone())
}

/// Every shift of the courier in the store, newest first.
pub fn list_shifts(
    state: &AppState,
    store_id: Uuid,
    driver_id: Uuid,
) -> Result<Vec<DriverShift>, AppError> {
    find_driver(state, store_id, driver_id)?;

    let mut shifts: Vec<DriverShift> = state
        .shifts
        .iter()
        .filter(|entry| entry.store_id == store_id && entry.driver_id == driver_id)
        .map(|entry| entry.value().clone())
        .collect();
    shifts.sort_by(|a, b| b.start_at.cmp(&a.start_at));

    Ok(shifts)
}
