use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::driver::GeoPoint;
use crate::models::settings::{DeliverySettings, FeeModel};

const BASE_PREP_MINUTES: f64 = 15.0;
const URBAN_SPEED_KMH: f64 = 25.0;

/// Where the quoted distance comes from.
pub enum Route {
    Distance(f64),
    Points { pickup: GeoPoint, dropoff: GeoPoint },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeeQuote {
    pub distance_km: Decimal,
    pub fee: Decimal,
    pub estimated_minutes: u32,
}

pub fn quote(
    settings: &DeliverySettings,
    route: Route,
    order_total: Decimal,
) -> Result<FeeQuote, AppError> {
    let raw_km = match route {
        Route::Distance(km) => km,
        Route::Points { pickup, dropoff } => {
            validate_point(&pickup)?;
            validate_point(&dropoff)?;
            haversine_km(&pickup, &dropoff)
        }
    };

    if !raw_km.is_finite() || raw_km < 0.0 {
        return Err(AppError::Validation(
            "distance must be a non-negative number".to_string(),
        ));
    }
    if order_total < Decimal::ZERO {
        return Err(AppError::Validation(
            "order_total cannot be negative".to_string(),
        ));
    }

    let distance_km = Decimal::from_f64(raw_km)
        .ok_or_else(|| AppError::Validation("distance is out of range".to_string()))?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(FeeQuote {
        fee: delivery_fee(settings, distance_km, order_total)?,
        estimated_minutes: estimate_minutes(distance_km),
        distance_km,
    })
}

/// Fails when the per-km charge does not fit in a `Decimal`.
pub fn delivery_fee(
    settings: &DeliverySettings,
    distance_km: Decimal,
    order_total: Decimal,
) -> Result<Decimal, AppError> {
    if settings.free_delivery_min_order > Decimal::ZERO
        && order_total >= settings.free_delivery_min_order
    {
        return Ok(Decimal::ZERO);
    }

    let fee = match settings.fee_model {
        FeeModel::Fixed => settings.base_fee,
        FeeModel::DistanceBased => {
            if settings.free_delivery_radius_km > Decimal::ZERO
                && distance_km <= settings.free_delivery_radius_km
            {
                return Ok(Decimal::ZERO);
            }

            let mut fee = distance_km
                .checked_mul(settings.price_per_km)
                .and_then(|per_km| per_km.checked_add(settings.base_fee))
                .ok_or_else(|| AppError::Validation("fee is out of range".to_string()))?;
            if fee < settings.min_fee {
                fee = settings.min_fee;
            }
            if settings.max_fee > Decimal::ZERO && fee > settings.max_fee {
                fee = settings.max_fee;
            }
            fee
        }
    };

    Ok(fee.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

pub fn estimate_minutes(distance_km: Decimal) -> u32 {
    let km = distance_km.to_f64().unwrap_or(0.0);
    let minutes = BASE_PREP_MINUTES + km / URBAN_SPEED_KMH * 60.0;
    minutes.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    let in_range = (-90.0..=90.0).contains(&point.lat) && (-180.0..=180.0).contains(&point.lng);
    if in_range {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "coordinates out of range: {}, {}",
            point.lat, point.lng
        )))
    }
}
