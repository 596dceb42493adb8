use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::assignment::available_drivers;
use crate::engine::roster::{
    driver_deliveries, list_drivers, register_driver, set_availability, DriverDeliveries, NewDriver,
};
use crate::engine::shifts::{list_shifts, toggle_shift, ShiftToggle};
use crate::error::AppError;
use crate::models::driver::{AvailableDriverCandidate, Driver};
use crate::models::shift::DriverShift;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stores/:store_id/drivers", post(create_driver).get(get_drivers))
        .route(
            "/stores/:store_id/drivers/:driver_id/availability",
            patch(update_availability),
        )
        .route("/stores/:store_id/drivers/:driver_id/shift", post(toggle))
        .route("/stores/:store_id/drivers/:driver_id/shifts", get(shifts))
        .route(
            "/stores/:store_id/drivers/:driver_id/deliveries",
            get(deliveries),
        )
        .route("/stores/:store_id/available-drivers", get(available))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub phone: String,
    pub capacity: Option<u8>,
    pub commission_percent: Option<Decimal>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    register_driver(
        &state,
        store_id,
        NewDriver {
            name: payload.name,
            phone: payload.phone,
            capacity: payload.capacity,
            commission_percent: payload.commission_percent,
        },
    )
    .map(Json)
}

async fn get_drivers(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
) -> Json<Vec<Driver>> {
    Json(list_drivers(&state, store_id))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path((store_id, driver_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    set_availability(&state, store_id, driver_id, payload.is_available).map(Json)
}

async fn toggle(
    State(state): State<Arc<AppState>>,
    Path((store_id, driver_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ShiftToggle>, AppError> {
    toggle_shift(&state, store_id, driver_id).map(Json)
}

async fn shifts(
    State(state): State<Arc<AppState>>,
    Path((store_id, driver_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<DriverShift>>, AppError> {
    list_shifts(&state, store_id, driver_id).map(Json)
}

async fn deliveries(
    State(state): State<Arc<AppState>>,
    Path((store_id, driver_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DriverDeliveries>, AppError> {
    driver_deliveries(&state, store_id, driver_id, Utc::now()).map(Json)
}

async fn available(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
) -> Json<Vec<AvailableDriverCandidate>> {
    Json(available_drivers(&state, store_id))
}
