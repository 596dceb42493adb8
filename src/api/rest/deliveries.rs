use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::engine::assignment::{assign_driver, auto_assign, AutoAssignment};
use crate::engine::gateway::{customer_links, CustomerLinks};
use crate::engine::lifecycle::{
    advance, cancel, complete_with_proof, create_delivery, get_delivery, list_deliveries,
    Completion, NewDelivery,
};
use crate::engine::settings::get_settings;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/stores/:store_id/deliveries",
            post(create).get(list),
        )
        .route("/stores/:store_id/deliveries/:delivery_id", get(show))
        .route(
            "/stores/:store_id/deliveries/:delivery_id/assign",
            post(assign_to_driver),
        )
        .route(
            "/stores/:store_id/deliveries/:delivery_id/advance",
            post(advance_status),
        )
        .route(
            "/stores/:store_id/deliveries/:delivery_id/cancel",
            post(cancel_delivery),
        )
        .route(
            "/stores/:store_id/orders/:order_id/complete",
            post(complete),
        )
        .route(
            "/stores/:store_id/orders/:order_id/auto-assign",
            post(auto_assign_order),
        )
}

/// Staff view of a delivery: the record plus the links to send the customer.
#[derive(Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub links: CustomerLinks,
}

impl DeliveryView {
    fn new(state: &AppState, delivery: Delivery) -> Self {
        let links = customer_links(&state.config.public_base_url, &delivery);
        Self { delivery, links }
    }
}

#[derive(Serialize)]
pub struct CreateDeliveryResponse {
    #[serde(flatten)]
    pub view: DeliveryView,
    /// Outcome of the policy-driven auto-assignment, when it ran.
    pub auto_assign_error: Option<String>,
}

async fn create(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
    Json(payload): Json<NewDelivery>,
) -> Result<Json<CreateDeliveryResponse>, AppError> {
    let order_id = payload.order_id;
    let mut delivery = create_delivery(&state, store_id, payload)?;
    let mut auto_assign_error = None;

    if get_settings(&state, store_id).auto_assign_orders {
        match auto_assign(&state, store_id, order_id).await {
            Ok(assigned) => delivery = assigned.delivery,
            Err(err) => {
                warn!(order_id = %order_id, error = %err, "auto-assignment on creation failed");
                auto_assign_error = Some(err.to_string());
            }
        }
    }

    Ok(Json(CreateDeliveryResponse {
        view: DeliveryView::new(&state, delivery),
        auto_assign_error,
    }))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<DeliveryStatus>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Delivery>> {
    Json(list_deliveries(&state, store_id, query.status))
}

async fn show(
    State(state): State<Arc<AppState>>,
    Path((store_id, delivery_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DeliveryView>, AppError> {
    let delivery = get_delivery(&state, store_id, delivery_id)?;
    Ok(Json(DeliveryView::new(&state, delivery)))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub driver_id: Uuid,
}

async fn assign_to_driver(
    State(state): State<Arc<AppState>>,
    Path((store_id, delivery_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Delivery>, AppError> {
    assign_driver(&state, store_id, delivery_id, payload.driver_id)
        .await
        .map(Json)
}

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub status: DeliveryStatus,
}

async fn advance_status(
    State(state): State<Arc<AppState>>,
    Path((store_id, delivery_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<Delivery>, AppError> {
    advance(&state, store_id, delivery_id, payload.status).map(Json)
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    Path((store_id, delivery_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Delivery>, AppError> {
    cancel(&state, store_id, delivery_id).map(Json)
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub photo_url: Option<String>,
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Path((store_id, order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CompleteRequest>,
) -> Result<Json<Completion>, AppError> {
    complete_with_proof(&state, store_id, order_id, payload.photo_url.as_deref()).map(Json)
}

async fn auto_assign_order(
    State(state): State<Arc<AppState>>,
    Path((store_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AutoAssignment>, AppError> {
    auto_assign(&state, store_id, order_id).await.map(Json)
}
