use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Only the store's own couriers deliver.
    InternalFleet,
    /// Own couriers plus an external marketplace fleet.
    Hybrid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeModel {
    Fixed,
    DistanceBased,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliverySettings {
    pub store_id: Uuid,
    pub delivery_mode: DeliveryMode,
    pub require_proof_photo: bool,
    pub auto_assign_orders: bool,
    pub fee_model: FeeModel,
    pub base_fee: Decimal,
    pub price_per_km: Decimal,
    pub min_fee: Decimal,
    /// Zero disables the upper clamp.
    pub max_fee: Decimal,
    /// Zero disables the free-delivery radius.
    pub free_delivery_radius_km: Decimal,
    /// Zero disables free delivery by order value.
    pub free_delivery_min_order: Decimal,
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeliverySettings {
    pub fn default_for(store_id: Uuid) -> Self {
        Self {
            store_id,
            delivery_mode: DeliveryMode::InternalFleet,
            require_proof_photo: false,
            auto_assign_orders: false,
            fee_model: FeeModel::Fixed,
            base_fee: Decimal::new(500, 2),
            price_per_km: Decimal::new(150, 2),
            min_fee: Decimal::new(500, 2),
            max_fee: Decimal::new(2500, 2),
            free_delivery_radius_km: Decimal::ZERO,
            free_delivery_min_order: Decimal::ZERO,
            updated_at: None,
        }
    }

    /// Applies every field present in `patch`.
    pub fn apply(&mut self, patch: &DeliverySettingsPatch) {
        if let Some(mode) = patch.delivery_mode {
            self.delivery_mode = mode;
        }
        if let Some(required) = patch.require_proof_photo {
            self.require_proof_photo = required;
        }
        if let Some(auto_assign) = patch.auto_assign_orders {
            self.auto_assign_orders = auto_assign;
        }
        if let Some(model) = patch.fee_model {
            self.fee_model = model;
        }
        if let Some(fee) = patch.base_fee {
            self.base_fee = fee;
        }
        if let Some(price) = patch.price_per_km {
            self.price_per_km = price;
        }
        if let Some(fee) = patch.min_fee {
            self.min_fee = fee;
        }
        if let Some(fee) = patch.max_fee {
            self.max_fee = fee;
        }
        if let Some(radius) = patch.free_delivery_radius_km {
            self.free_delivery_radius_km = radius;
        }
        if let Some(min_order) = patch.free_delivery_min_order {
            self.free_delivery_min_order = min_order;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverySettingsPatch {
    pub delivery_mode: Option<DeliveryMode>,
    pub require_proof_photo: Option<bool>,
    pub auto_assign_orders: Option<bool>,
    pub fee_model: Option<FeeModel>,
    pub base_fee: Option<Decimal>,
    pub price_per_km: Option<Decimal>,
    pub min_fee: Option<Decimal>,
    pub max_fee: Option<Decimal>,
    pub free_delivery_radius_km: Option<Decimal>,
    pub free_delivery_min_order: Option<Decimal>,
}
