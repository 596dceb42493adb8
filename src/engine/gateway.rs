//! Public, token-gated access to a single delivery.
//!
//! Callers hold no account; the (store, delivery, token) triple is the whole
//! credential. Every way the triple can fail resolves to the same
//! [`AppError::InvalidLink`], including identifiers that do not parse.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::roster::refresh_driver_rating;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::state::AppState;

/// What a customer holding the link may see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicDeliverySnapshot {
    pub store_id: Uuid,
    pub id: Uuid,
    pub status: DeliveryStatus,
    pub driver_name: Option<String>,
    pub driver_rating: Option<u8>,
    pub rated_at: Option<DateTime<Utc>>,
    pub customer_confirmed_at: Option<DateTime<Utc>>,
    pub order: Option<PublicOrderSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicOrderSummary {
    pub order_code: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub delivery: PublicDeliverySnapshot,
}

/// Raw identifiers as they arrive from a public URL.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryLink<'a> {
    pub store_id: &'a str,
    pub delivery_id: &'a str,
    pub token: &'a str,
}

pub fn validate_token(state: &AppState, link: DeliveryLink<'_>) -> Result<TokenValidation, AppError> {
    let delivery_id = resolve(state, link)?;
    let delivery = state
        .deliveries
        .get(&delivery_id)
        .map(|delivery| delivery.value().clone())
        .ok_or_else(|| reject(state))?;

    Ok(TokenValidation {
        valid: true,
        delivery: snapshot(state, &delivery),
    })
}

/// Stamps the customer's acknowledgment. Repeat calls re-stamp; the delivery
/// status is not touched.
pub fn confirm_receipt(state: &AppState, link: DeliveryLink<'_>) -> Result<DateTime<Utc>, AppError> {
    let delivery_id = resolve(state, link)?;
    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| reject(state))?;

    let now = Utc::now();
    let repeat = delivery.customer_confirmed_at.is_some();
    delivery.customer_confirmed_at = Some(now);
    delivery.updated_at = now;
    drop(delivery);

    info!(delivery_id = %delivery_id, repeat, "customer confirmed receipt");
    Ok(now)
}

/// Records the customer's rating of the courier, once.
pub fn submit_rating(
    state: &AppState,
    link: DeliveryLink<'_>,
    rating: i64,
    comment: Option<String>,
) -> Result<Delivery, AppError> {
    let delivery_id = resolve(state, link)?;

    let rating = u8::try_from(rating)
        .ok()
        .filter(|rating| (1..=5).contains(rating))
        .ok_or_else(|| AppError::Validation("rating must be an integer from 1 to 5".to_string()))?;
    let comment = comment
        .map(|comment| comment.trim().to_string())
        .filter(|comment| !comment.is_empty());

    let mut delivery = state
        .deliveries
        .get_mut(&delivery_id)
        .ok_or_else(|| reject(state))?;

    if delivery.rated_at.is_some() {
        return Err(AppError::Conflict("delivery already rated".to_string()));
    }

    let now = Utc::now();
    delivery.driver_rating = Some(rating);
    delivery.rating_comment = comment;
    delivery.rated_at = Some(now);
    delivery.updated_at = now;
    let rated = delivery.clone();
    drop(delivery);

    if let Some(driver_id) = rated.driver_id {
        refresh_driver_rating(state, driver_id);
    }

    info!(delivery_id = %delivery_id, rating, "courier rated");
    Ok(rated)
}

fn resolve(state: &AppState, link: DeliveryLink<'_>) -> Result<Uuid, AppError> {
    let (Ok(store_id), Ok(delivery_id)) = (
        Uuid::parse_str(link.store_id),
        Uuid::parse_str(link.delivery_id),
    ) else {
        return Err(reject(state));
    };

    let matches = state
        .deliveries
        .get(&delivery_id)
        .is_some_and(|delivery| {
            delivery.store_id == store_id && delivery.access_token.matches(link.token)
        });

    if matches {
        Ok(delivery_id)
    } else {
        Err(reject(state))
    }
}

fn reject(state: &AppState) -> AppError {
    state.metrics.token_rejections_total.inc();
    warn!("delivery link rejected");
    AppError::InvalidLink
}

fn snapshot(state: &AppState, delivery: &Delivery) -> PublicDeliverySnapshot {
    let order = state.orders.get(&delivery.order_id).map(|order| PublicOrderSummary {
        order_code: order.order_code.clone(),
        customer_name: order.customer_name.clone(),
    });

    PublicDeliverySnapshot {
        store_id: delivery.store_id,
        id: delivery.id,
        status: delivery.status,
        driver_name: delivery.driver_name.clone(),
        driver_rating: delivery.driver_rating,
        rated_at: delivery.rated_at,
        customer_confirmed_at: delivery.customer_confirmed_at,
        order,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerLinks {
    pub tracking_url: String,
    pub confirm_url: String,
    pub rating_url: String,
}

/// Customer-facing URLs for the delivery. Each carries the access token.
pub fn customer_links(base_url: &str, delivery: &Delivery) -> CustomerLinks {
    let base = base_url.trim_end_matches('/');
    let path = format!(
        "{base}/public/stores/{}/deliveries/{}",
        delivery.store_id, delivery.id
    );
    let token = delivery.access_token.as_str();

    CustomerLinks {
        tracking_url: format!("{path}?token={token}"),
        confirm_url: format!("{path}/confirm?token={token}"),
        rating_url: format!("{path}/rating?token={token}"),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::engine::lifecycle::{create_delivery, NewDelivery};

    struct Fixture {
        state: AppState,
        store_id: String,
        delivery_id: String,
        token: String,
    }

    impl Fixture {
        fn new() -> Self {
            let state = AppState::default();
            let store_id = Uuid::new_v4();
            let delivery = create_delivery(
                &state,
                store_id,
                NewDelivery {
                    order_id: Uuid::new_v4(),
                    order_code: "C-300".to_string(),
                    customer_name: "Nina".to_string(),
                    address: "Rua Azul, 3".to_string(),
                    delivery_fee: Some(Decimal::new(600, 2)),
                },
            )
            .unwrap();

            Self {
                store_id: store_id.to_string(),
                delivery_id: delivery.id.to_string(),
                token: delivery.access_token.as_str().to_string(),
                state,
            }
        }

        fn link(&self) -> DeliveryLink<'_> {
            DeliveryLink {
                store_id: &self.store_id,
                delivery_id: &self.delivery_id,
                token: &self.token,
            }
        }
    }

    #[test]
    fn correct_triple_validates() {
        let fx = Fixture::new();
        let validation = validate_token(&fx.state, fx.link()).unwrap();

        assert!(validation.valid);
        let order = validation.delivery.order.unwrap();
        assert_eq!(order.order_code, "C-300");
        assert_eq!(order.customer_name, "Nina");
    }

    #[test]
    fn every_wrong_part_fails_the_same_way() {
        let fx = Fixture::new();
        let other_store = Uuid::new_v4().to_string();
        let other_delivery = Uuid::new_v4().to_string();
        let wrong_token = Uuid::new_v4().simple().to_string();

        let links = [
            DeliveryLink { token: &wrong_token, ..fx.link() },
            DeliveryLink { store_id: &other_store, ..fx.link() },
            DeliveryLink { delivery_id: &other_delivery, ..fx.link() },
            DeliveryLink { store_id: "not-a-uuid", ..fx.link() },
            DeliveryLink { token: "", ..fx.link() },
        ];

        for link in links {
            let err = validate_token(&fx.state, link).unwrap_err();
            assert!(matches!(err, AppError::InvalidLink));
            assert_eq!(err.to_string(), crate::error::INVALID_LINK_MESSAGE);
            assert!(matches!(confirm_receipt(&fx.state, link), Err(AppError::InvalidLink)));
            assert!(matches!(
                submit_rating(&fx.state, link, 5, None),
                Err(AppError::InvalidLink)
            ));
        }
        assert_eq!(fx.state.metrics.token_rejections_total.get(), 15);
    }

    #[test]
    fn confirm_stamps_without_changing_status() {
        let fx = Fixture::new();

        let first = confirm_receipt(&fx.state, fx.link()).unwrap();
        let second = confirm_receipt(&fx.state, fx.link()).unwrap();
        assert!(second >= first);

        let snapshot = validate_token(&fx.state, fx.link()).unwrap().delivery;
        assert_eq!(snapshot.customer_confirmed_at, Some(second));
        assert_eq!(snapshot.status, DeliveryStatus::Pending);
    }

    #[test]
    fn rating_is_single_use() {
        let fx = Fixture::new();

        let rated = submit_rating(&fx.state, fx.link(), 4, Some("  quick ".to_string())).unwrap();
        assert_eq!(rated.driver_rating, Some(4));
        assert_eq!(rated.rating_comment.as_deref(), Some("quick"));

        for retry in [4, 1] {
            let err = submit_rating(&fx.state, fx.link(), retry, None).unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }
        let snapshot = validate_token(&fx.state, fx.link()).unwrap().delivery;
        assert_eq!(snapshot.driver_rating, Some(4));
    }

    #[test]
    fn out_of_range_rating_is_rejected_before_writing() {
        let fx = Fixture::new();

        for rating in [0, 6, -1, 300] {
            let err = submit_rating(&fx.state, fx.link(), rating, None).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(submit_rating(&fx.state, fx.link(), 5, None).is_ok());
    }

    #[test]
    fn links_carry_token_and_ids() {
        let fx = Fixture::new();
        let delivery_id = Uuid::parse_str(&fx.delivery_id).unwrap();
        let delivery = fx.state.deliveries.get(&delivery_id).unwrap().clone();

        let links = customer_links("https://pedidos.example/", &delivery);
        assert_eq!(
            links.rating_url,
            format!(
                "https://pedidos.example/public/stores/{}/deliveries/{}/rating?token={}",
                fx.store_id, fx.delivery_id, fx.token
            )
        );
        assert!(links.confirm_url.contains("/confirm?token="));
    }
}
