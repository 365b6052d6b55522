use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use thiserror::Error;

use super::models::{SubscriptionStatus, Tier, UserProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("entitlement store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of the provider plan lookup, carried into the upsert so the
/// downgrade guard can be applied atomically in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanResolution {
    Known(Tier),
    /// Price id absent from the static table. New rows land on `free`;
    /// an existing row keeps whatever tier it already has.
    Unrecognized,
}

/// One reconciled webhook event, ready to overwrite-by-key.
#[derive(Debug, Clone)]
pub struct EntitlementUpdate {
    pub user_id: String,
    pub plan: PlanResolution,
    pub status: SubscriptionStatus,
    pub subscription_id: String,
    /// Provider event timestamp; older events must not clobber newer state.
    pub event_at: DateTime<Utc>,
}

/// key: entitlement-store -> transactional upsert-by-id collaborator
///
/// Correctness under concurrent reconciliation for the same user id is
/// delegated to the implementation's per-key atomicity; callers hold no lock.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Idempotent overwrite keyed by `update.user_id`. Replaying the same
    /// update converges to the same row; an update older than the stored
    /// `entitlement_updated_at` is a no-op. Returns the row as it stands
    /// after the call either way.
    async fn apply(&self, update: EntitlementUpdate) -> Result<UserProfile, StoreError>;
}

#[derive(Clone)]
pub struct PgEntitlementStore {
    pool: PgPool,
}

impl PgEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: PgRow) -> UserProfile {
    let tier: String = row.get("tier");
    let status: Option<String> = row.get("subscription_status");
    UserProfile {
        id: row.get("id"),
        tier: Tier::parse(&tier).unwrap_or(Tier::Free),
        subscription_status: status.as_deref().and_then(SubscriptionStatus::parse),
        subscription_id: row.get("subscription_id"),
        saved_estimates_count: row.get("saved_estimates_count"),
        entitlement_updated_at: row.get("entitlement_updated_at"),
    }
}

#[async_trait]
impl EntitlementStore for PgEntitlementStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(profile_from_row))
    }

    async fn apply(&self, update: EntitlementUpdate) -> Result<UserProfile, StoreError> {
        let (tier, unrecognized) = match update.plan {
            PlanResolution::Known(tier) => (tier, false),
            PlanResolution::Unrecognized => (Tier::Free, true),
        };

        // Single statement: per-key atomicity, the stale-event guard, and
        // the never-downgrade-on-unrecognized guard all live in the store.
        let row = sqlx::query(
            r#"
            INSERT INTO user_profiles (
                id,
                tier,
                subscription_status,
                subscription_id,
                entitlement_updated_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                tier = CASE WHEN $6 THEN user_profiles.tier ELSE EXCLUDED.tier END,
                subscription_status = EXCLUDED.subscription_status,
                subscription_id = EXCLUDED.subscription_id,
                entitlement_updated_at = EXCLUDED.entitlement_updated_at,
                updated_at = NOW()
            WHERE user_profiles.entitlement_updated_at IS NULL
               OR user_profiles.entitlement_updated_at <= EXCLUDED.entitlement_updated_at
            RETURNING *
            "#,
        )
        .bind(&update.user_id)
        .bind(tier.as_str())
        .bind(update.status.as_str())
        .bind(&update.subscription_id)
        .bind(update.event_at)
        .bind(unrecognized)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(profile_from_row(row)),
            // Guard rejected a stale event; report the row that won.
            None => self
                .fetch(&update.user_id)
                .await?
                .ok_or_else(|| StoreError::Unavailable("profile vanished mid-upsert".to_string())),
        }
    }
}
