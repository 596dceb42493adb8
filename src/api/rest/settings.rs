use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::fees::{quote, FeeQuote, Route};
use crate::engine::settings::{get_settings, update_settings};
use crate::error::AppError;
use crate::models::driver::GeoPoint;
use crate::models::settings::{DeliverySettings, DeliverySettingsPatch};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/stores/:store_id/delivery-settings",
            get(read_settings).patch(patch_settings),
        )
        .route("/stores/:store_id/delivery-fee/quote", post(quote_fee))
}

async fn read_settings(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
) -> Json<DeliverySettings> {
    Json(get_settings(&state, store_id))
}

async fn patch_settings(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
    Json(patch): Json<DeliverySettingsPatch>,
) -> Result<Json<DeliverySettings>, AppError> {
    update_settings(&state, store_id, &patch).map(Json)
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub distance_km: Option<f64>,
    pub pickup: Option<GeoPoint>,
    pub dropoff: Option<GeoPoint>,
    #[serde(default)]
    pub order_total: Decimal,
}

async fn quote_fee(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<FeeQuote>, AppError> {
    let route = match (payload.distance_km, payload.pickup, payload.dropoff) {
        (Some(km), _, _) => Route::Distance(km),
        (None, Some(pickup), Some(dropoff)) => Route::Points { pickup, dropoff },
        _ => {
            return Err(AppError::Validation(
                "either distance_km or pickup and dropoff are required".to_string(),
            ));
        }
    };

    let settings = get_settings(&state, store_id);
    quote(&settings, route, payload.order_total).map(Json)
}
