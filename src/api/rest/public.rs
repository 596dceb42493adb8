//! Customer-facing routes. No session: the token in the query string or body
//! is the only credential.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::gateway::{
    confirm_receipt, submit_rating, validate_token, DeliveryLink, TokenValidation,
};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/public/stores/:store_id/deliveries/:delivery_id",
            get(validate),
        )
        .route(
            "/public/stores/:store_id/deliveries/:delivery_id/confirm",
            post(confirm),
        )
        .route(
            "/public/stores/:store_id/deliveries/:delivery_id/rating",
            post(rate),
        )
}

/// Path segments stay strings so that a malformed id is rejected by the
/// gateway exactly like a wrong one.
#[derive(Deserialize)]
pub struct LinkPath {
    pub store_id: String,
    pub delivery_id: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

impl LinkPath {
    fn link<'a>(&'a self, token: &'a str) -> DeliveryLink<'a> {
        DeliveryLink {
            store_id: &self.store_id,
            delivery_id: &self.delivery_id,
            token,
        }
    }
}

async fn validate(
    State(state): State<Arc<AppState>>,
    Path(path): Path<LinkPath>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenValidation>, AppError> {
    validate_token(&state, path.link(&query.token)).map(Json)
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub customer_confirmed_at: DateTime<Utc>,
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(path): Path<LinkPath>,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let confirmed_at = confirm_receipt(&state, path.link(&payload.token))?;
    Ok(Json(ConfirmResponse {
        success: true,
        customer_confirmed_at: confirmed_at,
    }))
}

#[derive(Deserialize)]
pub struct RatingRequest {
    #[serde(default)]
    pub token: String,
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct RatingResponse {
    pub success: bool,
    pub driver_rating: u8,
    pub rated_at: DateTime<Utc>,
}

async fn rate(
    State(state): State<Arc<AppState>>,
    Path(path): Path<LinkPath>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<RatingResponse>, AppError> {
    // Missing, fractional or absurd values become 0, which the gateway rejects
    // as out of range once the link itself has been checked.
    let rating = payload
        .rating
        .filter(|rating| rating.fract() == 0.0 && rating.abs() <= 10.0)
        .map_or(0, |rating| rating as i64);

    let rated = submit_rating(&state, path.link(&payload.token), rating, payload.comment)?;
    let (Some(driver_rating), Some(rated_at)) = (rated.driver_rating, rated.rated_at) else {
        return Err(AppError::Internal("rating was not recorded".to_string()));
    };

    Ok(Json(RatingResponse {
        success: true,
        driver_rating,
        rated_at,
    }))
}
