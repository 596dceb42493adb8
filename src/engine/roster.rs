use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::driver::Driver;
use crate::state::AppState;

pub struct NewDriver {
    pub name: String,
    pub phone: String,
    pub capacity: Option<u8>,
    pub commission_percent: Option<Decimal>,
}

pub const DEFAULT_COMMISSION_PERCENT: Decimal = Decimal::TEN;

pub fn register_driver(
    state: &AppState,
    store_id: Uuid,
    new_driver: NewDriver,
) -> Result<Driver, AppError> {
    let name = new_driver.name.trim();
    let phone = new_driver.phone.trim();

    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if phone.is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }

    let capacity = new_driver
        .capacity
        .unwrap_or(state.config.default_driver_capacity);
    if capacity == 0 {
        return Err(AppError::Validation("capacity must be > 0".to_string()));
    }

    let commission_percent = new_driver
        .commission_percent
        .unwrap_or(DEFAULT_COMMISSION_PERCENT);
    if commission_percent < Decimal::ZERO || commission_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(
            "commission_percent must be between 0 and 100".to_string(),
        ));
    }

    let now = Utc::now();
    let driver = Driver {
        id: Uuid::new_v4(),
        store_id,
        name: name.to_string(),
        phone: phone.to_string(),
        is_available: true,
        is_active: true,
        capacity,
        rating: None,
        commission_percent,
        total_deliveries: 0,
        created_at: now,
        updated_at: now,
    };

    state.drivers.insert(driver.id, driver.clone());
    info!(store_id = %store_id, driver_id = %driver.id, "driver registered");

    Ok(driver)
}

pub fn list_drivers(state: &AppState, store_id: Uuid) -> Vec<Driver> {
    let mut drivers: Vec<Driver> = state
        .drivers
        .iter()
        .filter(|entry| entry.store_id == store_id)
        .map(|entry| entry.value().clone())
        .collect();
    drivers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    drivers
}

/// Looks up a driver, treating a driver of another store as absent.
pub fn find_driver(state: &AppState, store_id: Uuid, driver_id: Uuid) -> Result<Driver, AppError> {
    state
        .drivers
        .get(&driver_id)
        .filter(|driver| driver.store_id == store_id)
        .map(|driver| driver.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
}

pub fn set_availability(
    state: &AppState,
    store_id: Uuid,
    driver_id: Uuid,
    is_available: bool,
) -> Result<Driver, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .filter(|driver| driver.store_id == store_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    driver.is_available = is_available;
    driver.updated_at = Utc::now();
    info!(driver_id = %driver_id, is_available, "driver availability changed");

    Ok(driver.clone())
}

/// Recomputes a driver's average from every rated delivery they made, rounded
/// to one decimal.
pub fn refresh_driver_rating(state: &AppState, driver_id: Uuid) {
    let ratings: Vec<u8> = state
        .deliveries
        .iter()
        .filter(|entry| entry.driver_id == Some(driver_id))
        .filter_map(|entry| entry.driver_rating)
        .collect();

    if ratings.is_empty() {
        return;
    }

    let sum: u32 = ratings.iter().map(|&rating| u32::from(rating)).sum();
    let average = f64::from(sum) / ratings.len() as f64;

    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.rating = Some((average * 10.0).round() / 10.0);
        driver.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverSummary {
    pub active_deliveries: usize,
    pub delivered_total: usize,
    pub earnings_total: Decimal,
    pub delivered_today: usize,
    pub earnings_today: Decimal,
    /// Rolling seven days ending now.
    pub delivered_week: usize,
    pub earnings_week: Decimal,
    pub commission_percent: Decimal,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverDeliveries {
    pub active: Vec<Delivery>,
    pub completed: Vec<Delivery>,
    pub summary: DriverSummary,
}

/// Courier's cut of the fees, rounded to cents.
pub fn commission_earnings<'a>(
    deliveries: impl Iterator<Item = &'a Delivery>,
    commission_percent: Decimal,
) -> Decimal {
    let share = commission_percent / Decimal::ONE_HUNDRED;
    deliveries
        .filter_map(|delivery| delivery.delivery_fee)
        .fold(Decimal::ZERO, |total, fee| total.saturating_add(fee * share))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Deliveries assigned to the driver, newest first, split into in-flight and
/// delivered. Cancelled deliveries appear in neither list.
pub fn driver_deliveries(
    state: &AppState,
    store_id: Uuid,
    driver_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DriverDeliveries, AppError> {
    let driver = find_driver(state, store_id, driver_id)?;

    let mut assigned: Vec<Delivery> = state
        .deliveries
        .iter()
        .filter(|entry| entry.store_id == store_id && entry.driver_id == Some(driver_id))
        .map(|entry| entry.value().clone())
        .collect();
    assigned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (completed, active): (Vec<Delivery>, Vec<Delivery>) = assigned
        .into_iter()
        .filter(|delivery| delivery.status != DeliveryStatus::Cancelled)
        .partition(|delivery| delivery.status == DeliveryStatus::Delivered);

    let today = now.date_naive();
    let week_start = now - Duration::days(7);
    let todays = delivered_within(&completed, |at| at.date_naive() == today);
    let this_week = delivered_within(&completed, |at| at >= week_start && at <= now);
    let rate = driver.commission_percent;

    let summary = DriverSummary {
        active_deliveries: active.len(),
        delivered_total: completed.len(),
        earnings_total: commission_earnings(completed.iter(), rate),
        delivered_today: todays.len(),
        earnings_today: commission_earnings(todays.iter().copied(), rate),
        delivered_week: this_week.len(),
        earnings_week: commission_earnings(this_week.iter().copied(), rate),
        commission_percent: rate,
        rating: driver.rating,
    };

    Ok(DriverDeliveries {
        active,
        completed,
        summary,
    })
}

fn delivered_within(
    completed: &[Delivery],
    keep: impl Fn(DateTime<Utc>) -> bool,
) -> Vec<&Delivery> {
    completed
        .iter()
        .filter(|delivery| delivery.delivered_at.is_some_and(&keep))
        .collect()
}
