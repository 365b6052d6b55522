use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config;

use super::store::PlanResolution;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider response missing a price identifier")]
    MissingPrice,
    #[error("provider credentials are not configured")]
    MissingCredentials,
}

/// key: plan-lookup -> provider integration seam
///
/// Resolves an opaque subscription reference to the provider's price/plan
/// identifier. Transient failures are the caller's retryable condition.
#[async_trait]
pub trait PlanLookup: Send + Sync {
    async fn price_for_subscription(&self, subscription_id: &str) -> Result<String, LookupError>;
}

/// Stripe-shaped implementation: one GET per lookup, bounded wait, no retry.
pub struct StripePlanLookup {
    http: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

impl StripePlanLookup {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, secret_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            secret_key,
        }
    }

    pub fn from_env() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build provider HTTP client");
        Self::new(
            http,
            config::STRIPE_API_BASE.as_str(),
            config::STRIPE_SECRET_KEY.clone(),
        )
    }
}

#[async_trait]
impl PlanLookup for StripePlanLookup {
    async fn price_for_subscription(&self, subscription_id: &str) -> Result<String, LookupError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or(LookupError::MissingCredentials)?;

        let url = format!("{}/v1/subscriptions/{subscription_id}", self.base_url);
        let body: Value = self
            .http
            .get(&url)
            .bearer_auth(secret)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        price_id_from_subscription(&body).ok_or(LookupError::MissingPrice)
    }
}

fn price_id_from_subscription(body: &Value) -> Option<String> {
    let first_item = body
        .get("items")
        .and_then(|items| items.get("data"))
        .and_then(Value::as_array)
        .and_then(|data| data.first())?;
    first_item
        .get("price")
        .and_then(|price| price.get("id"))
        .and_then(Value::as_str)
        // Older API shapes expose the price under `plan`.
        .or_else(|| {
            first_item
                .get("plan")
                .and_then(|plan| plan.get("id"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
}

/// Static price-id -> tier mapping. Unknown identifiers never escalate;
/// they resolve as `Unrecognized` and default new profiles to free.
pub fn resolve_tier(price_id: &str) -> PlanResolution {
    match config::PRICE_TIER_TABLE.get(price_id) {
        Some(tier) => PlanResolution::Known(*tier),
        None => {
            tracing::warn!(%price_id, "unrecognized price identifier; treating as free");
            PlanResolution::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::models::Tier;
    use serde_json::json;

    #[test]
    fn price_id_prefers_current_shape() {
        let body = json!({
            "items": { "data": [ { "price": { "id": "price_now" }, "plan": { "id": "price_old" } } ] }
        });
        assert_eq!(
            price_id_from_subscription(&body).as_deref(),
            Some("price_now")
        );
    }

    #[test]
    fn price_id_falls_back_to_plan() {
        let body = json!({ "items": { "data": [ { "plan": { "id": "price_old" } } ] } });
        assert_eq!(
            price_id_from_subscription(&body).as_deref(),
            Some("price_old")
        );
    }

    #[test]
    fn empty_items_yield_none() {
        let body = json!({ "items": { "data": [] } });
        assert_eq!(price_id_from_subscription(&body), None);
    }

    #[test]
    fn known_price_resolves_to_its_tier() {
        assert_eq!(
            resolve_tier("price_1Sl8fkGZfnvqYwvYTdmFAUM4"),
            PlanResolution::Known(Tier::Pro)
        );
        assert_eq!(resolve_tier("price_made_up"), PlanResolution::Unrecognized);
    }
}
