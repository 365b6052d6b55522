use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use super::models::SubscriptionStatus;
use super::plans::{resolve_tier, PlanLookup};
use super::store::{EntitlementStore, EntitlementUpdate, StoreError};

type HmacSha256 = Hmac<Sha256>;

/// The only event type that moves entitlement state; everything else is
/// acknowledged and dropped for forward compatibility.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Terminal for the request; state must not have been touched.
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),
    #[error("event carries no user reference")]
    MissingUserReference,
    /// Transient; surfaced as a server error so delivery is retried.
    #[error("plan lookup against payment provider failed: {0}")]
    UpstreamLookupFailed(String),
    /// Transient; surfaced as a server error so delivery is retried.
    #[error("entitlement store write failed: {0}")]
    PersistenceFailed(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// Verified but intentionally not acted on (foreign event type).
    Ignored,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: Value,
}

/// key: entitlement-reconciler -> webhook ingestion state machine
///
/// Consumes at-least-once, unordered provider events and converges the
/// entitlement store. Holds no lock; idempotence and ordering are delegated
/// to the store's single-statement upsert.
pub struct EntitlementReconciler {
    store: Arc<dyn EntitlementStore>,
    plans: Arc<dyn PlanLookup>,
    signing_secret: Option<String>,
    tolerance: Duration,
}

impl EntitlementReconciler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        plans: Arc<dyn PlanLookup>,
        signing_secret: Option<String>,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            store,
            plans,
            signing_secret,
            tolerance: Duration::seconds(tolerance_secs),
        }
    }

    pub async fn reconcile(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(secret) = self.signing_secret.as_deref() else {
            warn!("webhook received but no signing secret is configured");
            return Err(ReconcileError::InvalidSignature);
        };
        if !verify_signature(secret, raw_body, signature_header, self.tolerance, Utc::now()) {
            return Err(ReconcileError::InvalidSignature);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(raw_body)
            .map_err(|err| ReconcileError::MalformedEvent(err.to_string()))?;

        if envelope.event_type != CHECKOUT_COMPLETED {
            info!(event_type = %envelope.event_type, "ignoring webhook event type");
            return Ok(ReconcileOutcome::Ignored);
        }

        let object = envelope
            .data
            .map(|data| data.object)
            .ok_or_else(|| ReconcileError::MalformedEvent("event has no data.object".to_string()))?;

        let user_id = session_user_id(&object)
            .ok_or(ReconcileError::MissingUserReference)?
            .to_string();
        let subscription_id = session_subscription(&object).ok_or_else(|| {
            ReconcileError::MalformedEvent("checkout session has no subscription reference".to_string())
        })?;
        let event_at = envelope
            .created
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        let price_id = self
            .plans
            .price_for_subscription(&subscription_id)
            .await
            .map_err(|err| ReconcileError::UpstreamLookupFailed(err.to_string()))?;
        let plan = resolve_tier(&price_id);

        let profile = self
            .store
            .apply(EntitlementUpdate {
                user_id: user_id.clone(),
                plan,
                status: SubscriptionStatus::Active,
                subscription_id,
                event_at,
            })
            .await?;

        info!(
            %user_id,
            tier = profile.tier.as_str(),
            %price_id,
            "entitlement reconciled"
        );
        Ok(ReconcileOutcome::Applied)
    }
}

fn session_user_id(object: &Value) -> Option<&str> {
    object
        .get("metadata")
        .and_then(|metadata| metadata.get("userId"))
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            object
                .get("client_reference_id")
                .and_then(Value::as_str)
                .filter(|id| !id.trim().is_empty())
        })
}

fn session_subscription(object: &Value) -> Option<String> {
    let subscription = object.get("subscription")?;
    subscription
        .as_str()
        // Expanded sessions carry the subscription as an object.
        .or_else(|| subscription.get("id").and_then(Value::as_str))
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

/// Verifies a `t=<unix>,v1=<hex hmac>` header over `"{t}.{body}"` with a
/// bounded timestamp tolerance. Comparison is constant-time via the MAC
/// itself; any `v1` candidate may match.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    header: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let (Some(timestamp), false) = (timestamp, candidates.is_empty()) else {
        return false;
    };
    let Some(event_time) = Utc.timestamp_opt(timestamp, 0).single() else {
        return false;
    };
    if (now - event_time).abs() > tolerance {
        return false;
    }

    let mut signed_payload = timestamp.to_string().into_bytes();
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(body);

    candidates.into_iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(&signed_payload);
        mac.verify_slice(&expected).is_ok()
    })
}
