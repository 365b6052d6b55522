use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::AppResult;

use super::limits::{evaluate, CapabilitySet, UsageSnapshot};
use super::models::{Tier, UserProfile};
use super::store::EntitlementStore;

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    pub estimate_count: u32,
    #[serde(default)]
    pub item_count: u32,
}

#[derive(Debug, Serialize)]
pub struct EntitlementEnvelope {
    pub profile: UserProfile,
    pub tier: Tier,
    pub capabilities: CapabilitySet,
}

/// key: entitlement-api -> read side consulted before UI-visible actions
pub async fn get_entitlements(
    Extension(store): Extension<Arc<dyn EntitlementStore>>,
    Path(user_id): Path<String>,
    Query(usage): Query<UsageQuery>,
) -> AppResult<Json<EntitlementEnvelope>> {
    let profile = store
        .fetch(&user_id)
        .await?
        .unwrap_or_else(|| UserProfile::default_for(&user_id));

    let tier = effective_tier(&profile);
    let capabilities = evaluate(
        tier,
        &UsageSnapshot {
            estimate_count: usage.estimate_count,
            items_in_current_estimate: usage.item_count,
        },
    );

    Ok(Json(EntitlementEnvelope {
        profile,
        tier,
        capabilities,
    }))
}

/// Applies the configured tier-override allow-list. Overrides are a floor,
/// never a ceiling: a profile already above its override keeps its tier.
pub fn effective_tier(profile: &UserProfile) -> Tier {
    match config::TIER_OVERRIDES.get(&profile.id) {
        Some(floor) if *floor > profile.tier => {
            tracing::info!(
                user_id = %profile.id,
                from = profile.tier.as_str(),
                to = floor.as_str(),
                "tier override applied from allow-list"
            );
            *floor
        }
        _ => profile.tier,
    }
}
