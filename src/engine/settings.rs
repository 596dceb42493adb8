use chrono::Utc;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::settings::{DeliverySettings, DeliverySettingsPatch};
use crate::state::AppState;

/// Stored settings for the store, or the defaults when none were saved yet.
pub fn get_settings(state: &AppState, store_id: Uuid) -> DeliverySettings {
    state
        .settings
        .get(&store_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_else(|| DeliverySettings::default_for(store_id))
}

pub fn update_settings(
    state: &AppState,
    store_id: Uuid,
    patch: &DeliverySettingsPatch,
) -> Result<DeliverySettings, AppError> {
    let entry = state.settings.entry(store_id);

    let mut candidate = match &entry {
        Entry::Occupied(stored) => stored.get().clone(),
        Entry::Vacant(_) => DeliverySettings::default_for(store_id),
    };
    candidate.apply(patch);
    validate(&candidate)?;
    candidate.updated_at = Some(Utc::now());

    entry.insert(candidate.clone());

    info!(
        store_id = %store_id,
        require_proof_photo = candidate.require_proof_photo,
        auto_assign_orders = candidate.auto_assign_orders,
        "delivery settings updated"
    );

    Ok(candidate)
}

fn validate(settings: &DeliverySettings) -> Result<(), AppError> {
    let amounts = [
        ("base_fee", settings.base_fee),
        ("price_per_km", settings.price_per_km),
        ("min_fee", settings.min_fee),
        ("max_fee", settings.max_fee),
        ("free_delivery_radius_km", settings.free_delivery_radius_km),
        ("free_delivery_min_order", settings.free_delivery_min_order),
    ];

    for (field, amount) in amounts {
        if amount < Decimal::ZERO {
            return Err(AppError::Validation(format!("{field} cannot be negative")));
        }
    }

    if settings.max_fee > Decimal::ZERO && settings.min_fee > settings.max_fee {
        return Err(AppError::Validation(
            "min_fee cannot exceed max_fee".to_string(),
        ));
    }

    Ok(())
}
