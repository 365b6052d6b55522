use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// key: entitlement-models -> tiers,status,profile
///
/// Ordered so that comparisons read as privilege comparisons; a malformed
/// plan lookup must never move a profile to a lower variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Business,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Business => "business",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "pro" => Some(Tier::Pro),
            "business" => Some(Tier::Business),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Trialing => "trialing",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "trialing" => Some(SubscriptionStatus::Trialing),
            _ => None,
        }
    }
}

/// Per-user entitlement record. `tier` moves only through the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub tier: Tier,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_id: Option<String>,
    pub saved_estimates_count: i64,
    /// Provider event timestamp of the last applied reconciliation; the
    /// ordering guard for out-of-order redelivery.
    pub entitlement_updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Shape of a profile that has never seen a webhook: implicit free tier.
    pub fn default_for(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tier: Tier::Free,
            subscription_status: None,
            subscription_id: None,
            saved_estimates_count: 0,
            entitlement_updated_at: None,
        }
    }
}

/// Visibility of lead records for a tier. Preview means existence is
/// visible but contents are redacted; it is not a lesser Full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadVisibility {
    None,
    Preview,
    Full,
}
