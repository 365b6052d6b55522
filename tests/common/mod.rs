#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use costline_backend::entitlement::{
    EntitlementReconciler, EntitlementStore, EntitlementUpdate, LookupError, PlanLookup,
    PlanResolution, StoreError, Tier, UserProfile,
};

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const PRO_PRICE: &str = "price_1Sl8fkGZfnvqYwvYTdmFAUM4";
pub const BUSINESS_PRICE: &str = "price_1Sl8g9GZfnvqYwvYm2nYhKQx";

type HmacSha256 = Hmac<Sha256>;

/// `t=...,v1=...` header for a payload, the way the provider would sign it.
pub fn sign_payload(secret: &str, body: &[u8], timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

pub fn signed_now(body: &[u8]) -> String {
    sign_payload(WEBHOOK_SECRET, body, Utc::now().timestamp())
}

/// In-memory stand-in for the profile store, mirroring the Postgres upsert
/// semantics: overwrite by key, stale events lose, unrecognized plans never
/// downgrade an existing row. Counts writes so tests can assert the store
/// was never touched.
#[derive(Default)]
pub struct MemoryEntitlementStore {
    rows: Mutex<HashMap<String, UserProfile>>,
    writes: AtomicUsize,
}

impl MemoryEntitlementStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn seed(&self, profile: UserProfile) {
        self.rows
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl EntitlementStore for MemoryEntitlementStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.get(user_id))
    }

    async fn apply(&self, update: EntitlementUpdate) -> Result<UserProfile, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let incoming_tier = match update.plan {
            PlanResolution::Known(tier) => tier,
            PlanResolution::Unrecognized => Tier::Free,
        };

        let row = rows
            .entry(update.user_id.clone())
            .and_modify(|existing| {
                let stale = existing
                    .entitlement_updated_at
                    .map(|stored| stored > update.event_at)
                    .unwrap_or(false);
                if stale {
                    return;
                }
                if update.plan != PlanResolution::Unrecognized {
                    existing.tier = incoming_tier;
                }
                existing.subscription_status = Some(update.status);
                existing.subscription_id = Some(update.subscription_id.clone());
                existing.entitlement_updated_at = Some(update.event_at);
            })
            .or_insert_with(|| UserProfile {
                id: update.user_id.clone(),
                tier: incoming_tier,
                subscription_status: Some(update.status),
                subscription_id: Some(update.subscription_id.clone()),
                saved_estimates_count: 0,
                entitlement_updated_at: Some(update.event_at),
            });
        Ok(row.clone())
    }
}

/// Plan lookup backed by a fixed subscription -> price table.
pub struct StaticPlanLookup {
    prices: HashMap<String, String>,
}

impl StaticPlanLookup {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            prices: entries
                .iter()
                .map(|(sub, price)| (sub.to_string(), price.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl PlanLookup for StaticPlanLookup {
    async fn price_for_subscription(&self, subscription_id: &str) -> Result<String, LookupError> {
        self.prices
            .get(subscription_id)
            .cloned()
            .ok_or(LookupError::MissingPrice)
    }
}

/// Plan lookup that always fails, standing in for a provider outage.
pub struct FailingPlanLookup;

#[async_trait]
impl PlanLookup for FailingPlanLookup {
    async fn price_for_subscription(&self, _subscription_id: &str) -> Result<String, LookupError> {
        Err(LookupError::MissingCredentials)
    }
}

pub fn reconciler_with(
    store: Arc<MemoryEntitlementStore>,
    plans: Arc<dyn PlanLookup>,
) -> EntitlementReconciler {
    EntitlementReconciler::new(store, plans, Some(WEBHOOK_SECRET.to_string()), 300)
}
