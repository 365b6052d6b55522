pub mod api;
pub mod limits;
pub mod models;
pub mod plans;
pub mod reconciler;
pub mod store;

pub use limits::{evaluate, limits_for, CapabilitySet, PlanLimits, UsageSnapshot};
pub use models::{LeadVisibility, SubscriptionStatus, Tier, UserProfile};
pub use plans::{resolve_tier, LookupError, PlanLookup, StripePlanLookup};
pub use reconciler::{
    EntitlementReconciler, ReconcileError, ReconcileOutcome, CHECKOUT_COMPLETED,
};
pub use store::{
    EntitlementStore, EntitlementUpdate, PgEntitlementStore, PlanResolution, StoreError,
};
