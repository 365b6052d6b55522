use axum::{
    routing::{get, post},
    Router,
};

use crate::{entitlement, pricing, webhooks};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/api/suggest/item", post(pricing::api::suggest_item))
        .route("/api/suggest/ideas", post(pricing::api::suggest_ideas))
        .route("/api/suggest/prices", post(pricing::api::batch_prices))
        .route(
            "/api/entitlements/:user_id",
            get(entitlement::api::get_entitlements),
        )
}
