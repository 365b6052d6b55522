use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
};
use bytes::Bytes;
use tracing::warn;

use crate::entitlement::{EntitlementReconciler, ReconcileError};

/// key: webhooks-entitlement -> payment provider entrypoint
///
/// Raw body in, status code out. Success and ignored events both answer 200
/// with no body; client errors carry a human-readable reason; server errors
/// exist to trigger the provider's redelivery.
pub async fn stripe_webhook(
    Extension(reconciler): Extension<Arc<EntitlementReconciler>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match reconciler.reconcile(&body, signature).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(err) => {
            warn!(%err, "webhook reconciliation failed");
            let status = match err {
                ReconcileError::InvalidSignature
                | ReconcileError::MalformedEvent(_)
                | ReconcileError::MissingUserReference => StatusCode::BAD_REQUEST,
                ReconcileError::UpstreamLookupFailed(_) => StatusCode::BAD_GATEWAY,
                ReconcileError::PersistenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, err.to_string()))
        }
    }
}
