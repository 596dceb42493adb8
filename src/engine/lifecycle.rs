//! State machine of a single delivery.
//!
//! Every transition takes the delivery's map entry exclusively, checks the
//! persisted status against the transition table and writes the new status
//! under the same guard. A request whose source state no longer matches is
//! rejected as a conflict.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::settings::get_settings;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub order_id: Uuid,
    pub order_code: String,
    pub customer_name: String,
    pub address: String,
    pub delivery_fee: Option<Decimal>,
}

/// Registers the order mirror and opens a `pending` delivery for it.
pub fn create_delivery(
    state: &AppState,
    store_id: Uuid,
    new_delivery: NewDelivery,
) -> Result<Delivery, AppError> {
    if new_delivery.order_code.trim().is_empty() {
        return Err(AppError::Validation("order_code cannot be empty".to_string()));
    }
    if new_delivery.address.trim().is_empty() {
        return Err(AppError::Validation("address cannot be empty".to_string()));
    }
    if new_delivery
        .delivery_fee
        .is_some_and(|fee| fee < Decimal::ZERO)
    {
        return Err(AppError::Validation(
            "delivery_fee cannot be negative".to_string(),
        ));
    }

    if let Some(order) = state.orders.get(&new_delivery.order_id) {
        if order.store_id != store_id {
            return Err(AppError::Conflict(format!(
                "order {} belongs to another store",
                new_delivery.order_id
            )));
        }
    }

    let now = Utc::now();
    let delivery = match state.deliveries_by_order.entry(new_delivery.order_id) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict(format!(
                "order {} already has a delivery",
                new_delivery.order_id
            )));
        }
        Entry::Vacant(vacant) => {
            let delivery = Delivery::new(
                store_id,
                new_delivery.order_id,
                new_delivery.address.trim().to_string(),
                new_delivery.delivery_fee,
                now,
            );

            state.deliveries.insert(delivery.id, delivery.clone());
            state
                .orders
                .entry(new_delivery.order_id)
                .or_insert_with(|| Order {
                    id: new_delivery.order_id,
                    store_id,
                    order_code: new_delivery.order_code.trim().to_string(),
                    customer_name: new_delivery.customer_name.trim().to_string(),
                    status: OrderStatus::Open,
                    updated_at: now,
                });
            vacant.insert(delivery.id);
            delivery
        }
    };

    info!(
        store_id = %store_id,
        delivery_id = %delivery.id,
        order_id = %delivery.order_id,
        "delivery created"
    );
    state.publish(&delivery);

    Ok(delivery)
}

pub fn get_delivery(state: &AppState, store_id: Uuid, delivery_id: Uuid) -> Result<Delivery, AppError> {
    state
        .deliveries
        .get(&delivery_id)
        .filter(|delivery| delivery.store_id == store_id)
        .map(|delivery| delivery.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))
}

/// Resolves the delivery of an order within the store.
pub fn delivery_id_for_order(state: &AppState, store_id: Uuid, order_id: Uuid) -> Result<Uuid, AppError> {
    let delivery_id = state
        .deliveries_by_order
        .get(&order_id)
        .map(|id| *id)
        .ok_or_else(|| AppError::NotFound(format!("no delivery for order {order_id}")))?;

    get_delivery(state, store_id, delivery_id).map(|delivery| delivery.id)
}

/// Store deliveries, newest first, optionally narrowed to one status.
pub fn list_deliveries(
    state: &AppState,
    store_id: Uuid,
    status: Option<DeliveryStatus>,
) -> Vec<Delivery> {
    let mut deliveries: Vec<Delivery> = state
        .deliveries
        .iter()
        .filter(|entry| entry.store_id == store_id)
        .filter(|entry| status.is_none_or(|status| entry.status == status))
        .map(|entry| entry.value().clone())
        .collect();
    deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    deliveries
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAssignment {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub driver_phone: String,
}

/// Hands a `pending` delivery to a courier.
pub fn assign(
    state: &AppState,
    store_id: Uuid,
    delivery_id: Uuid,
    assignment: DriverAssignment,
) -> Result<Delivery, AppError> {
    let updated = transition(state, store_id, delivery_id, DeliveryStatus::Assigned, |delivery| {
        delivery.driver_id = Some(assignment.driver_id);
        delivery.driver_name = Some(assignment.driver_name.clone());
        delivery.driver_phone = Some(assignment.driver_phone.clone());
    })?;

    info!(
        delivery_id = %delivery_id,
        driver_id = %assignment.driver_id,
        "delivery assigned"
    );
    Ok(updated)
}

/// Moves an assigned delivery forward one step. Only `picked_up` and
/// `in_transit` are reachable here.
pub fn advance(
    state: &AppState,
    store_id: Uuid,
    delivery_id: Uuid,
    next: DeliveryStatus,
) -> Result<Delivery, AppError> {
    match next {
        DeliveryStatus::PickedUp | DeliveryStatus::InTransit => {}
        DeliveryStatus::Delivered => {
            return Err(AppError::Conflict(
                "deliveries are completed through proof of delivery".to_string(),
            ));
        }
        DeliveryStatus::Assigned => {
            return Err(AppError::Conflict(
                "deliveries are assigned through assignment".to_string(),
            ));
        }
        DeliveryStatus::Cancelled => {
            return Err(AppError::Conflict(
                "deliveries are cancelled through cancellation".to_string(),
            ));
        }
        DeliveryStatus::Pending => {
            return Err(AppError::Conflict(format!("cannot move back to {next}")));
        }
    }

    let updated = transition(state, store_id, delivery_id, next, |_| {})?;
    info!(delivery_id = %delivery_id, status = %next, "delivery advanced");
    Ok(updated)
}

pub fn cancel(state: &AppState, store_id: Uuid, delivery_id: Uuid) -> Result<Delivery, AppError> {
    let updated = transition(state, store_id, delivery_id, DeliveryStatus::Cancelled, |_| {})?;
    info!(delivery_id = %delivery_id, "delivery cancelled");
    Ok(updated)
}

fn transition<F>(
    state: &AppState,
    store_id: Uuid,
    delivery_id: Uuid,
    next: DeliveryStatus,
    apply: F,
) -> Result<Delivery, AppError>
where
    F: FnOnce(&mut Delivery),
{
    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .filter(|delivery| delivery.store_id == store_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

    if !delivery.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "delivery {delivery_id} cannot move from {} to {next}",
            delivery.status
        )));
    }

    apply(delivery.value_mut());
    delivery.status = next;
    delivery.updated_at = Utc::now();
    let updated = delivery.clone();
    drop(delivery);

    state.publish(&updated);
    Ok(updated)
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub delivery: Delivery,
    /// True when the delivery was already delivered and only the order write
    /// was re-applied.
    pub replayed: bool,
}

/// Proof-of-delivery gate.
///
/// Writes the proof and `delivered` on the delivery and `delivered` on the
/// parent order as one unit: both guards are held together and nothing is
/// written until every check has passed. Calling again for an already
/// delivered delivery re-applies the order write, which is idempotent.
pub fn complete_with_proof(
    state: &AppState,
    store_id: Uuid,
    order_id: Uuid,
    photo_url: Option<&str>,
) -> Result<Completion, AppError> {
    let delivery_id = delivery_id_for_order(state, store_id, order_id)?;
    let photo_url = photo_url.map(str::trim).filter(|url| !url.is_empty());
    let settings = get_settings(state, store_id);

    if settings.require_proof_photo && photo_url.is_none() {
        warn!(order_id = %order_id, "completion refused without proof photo");
        return Err(AppError::Validation(
            "a proof-of-delivery photo is required".to_string(),
        ));
    }

    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| AppError::NotFound(format!("no delivery for order {order_id}")))?;
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let now = Utc::now();

    if delivery.status == DeliveryStatus::Delivered {
        if order.status != OrderStatus::Delivered {
            order.status = OrderStatus::Delivered;
            order.updated_at = now;
        }
        let snapshot = delivery.clone();
        info!(order_id = %order_id, delivery_id = %delivery_id, "completion replayed");
        return Ok(Completion {
            delivery: snapshot,
            replayed: true,
        });
    }

    if !delivery.status.can_transition_to(DeliveryStatus::Delivered) {
        return Err(AppError::Conflict(format!(
            "delivery {delivery_id} cannot be completed from {}",
            delivery.status
        )));
    }

    delivery.proof_photo_url = photo_url.map(str::to_string);
    delivery.status = DeliveryStatus::Delivered;
    delivery.delivered_at = Some(now);
    delivery.updated_at = now;
    order.status = OrderStatus::Delivered;
    order.updated_at = now;

    let completed = delivery.clone();
    drop(order);
    drop(delivery);

    if let Some(driver_id) = completed.driver_id {
        if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
            driver.total_deliveries = driver.total_deliveries.saturating_add(1);
            driver.updated_at = now;
        }
    }

    info!(
        order_id = %order_id,
        delivery_id = %delivery_id,
        with_photo = completed.proof_photo_url.is_some(),
        "delivery completed"
    );
    state.publish(&completed);

    Ok(Completion {
        delivery: completed,
        replayed: false,
    })
}
