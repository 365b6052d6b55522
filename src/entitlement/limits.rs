use serde::Serialize;

use super::models::{LeadVisibility, Tier};

/// key: entitlement-limits -> static per-tier capability table
///
/// Process-wide configuration, not user data. `None` means unbounded.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub max_estimates: Option<u32>,
    pub max_items_per_estimate: Option<u32>,
    pub can_export_pdf: bool,
    pub can_export_html: bool,
    pub can_remove_watermark: bool,
    pub can_edit_saved: bool,
    pub can_delete_saved: bool,
    pub lead_visibility: LeadVisibility,
}

const FREE_LIMITS: PlanLimits = PlanLimits {
    max_estimates: Some(5),
    max_items_per_estimate: Some(20),
    can_export_pdf: false,
    can_export_html: true,
    can_remove_watermark: false,
    can_edit_saved: false,
    can_delete_saved: true,
    lead_visibility: LeadVisibility::None,
};

const PRO_LIMITS: PlanLimits = PlanLimits {
    max_estimates: None,
    max_items_per_estimate: None,
    can_export_pdf: true,
    can_export_html: true,
    can_remove_watermark: true,
    can_edit_saved: true,
    can_delete_saved: true,
    lead_visibility: LeadVisibility::Preview,
};

const BUSINESS_LIMITS: PlanLimits = PlanLimits {
    max_estimates: None,
    max_items_per_estimate: None,
    can_export_pdf: true,
    can_export_html: true,
    can_remove_watermark: true,
    can_edit_saved: true,
    can_delete_saved: true,
    lead_visibility: LeadVisibility::Full,
};

/// Total over every `Tier` variant; an unknown tier cannot reach here.
pub fn limits_for(tier: Tier) -> &'static PlanLimits {
    match tier {
        Tier::Free => &FREE_LIMITS,
        Tier::Pro => &PRO_LIMITS,
        Tier::Business => &BUSINESS_LIMITS,
    }
}

/// Usage counters consulted before UI-visible actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageSnapshot {
    pub estimate_count: u32,
    pub items_in_current_estimate: u32,
}

/// Allowed-operations set for one (tier, usage) pair.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapabilitySet {
    pub can_create_estimate: bool,
    pub can_add_item: bool,
    pub can_export_pdf: bool,
    pub can_export_html: bool,
    pub can_remove_watermark: bool,
    pub can_edit_saved: bool,
    pub can_delete_saved: bool,
    pub lead_visibility: LeadVisibility,
    pub max_estimates: Option<u32>,
    pub max_items_per_estimate: Option<u32>,
}

/// Pure and total; no I/O, no error path.
pub fn evaluate(tier: Tier, usage: &UsageSnapshot) -> CapabilitySet {
    let limits = limits_for(tier);
    let under = |limit: Option<u32>, used: u32| limit.map(|max| used < max).unwrap_or(true);

    CapabilitySet {
        can_create_estimate: under(limits.max_estimates, usage.estimate_count),
        can_add_item: under(
            limits.max_items_per_estimate,
            usage.items_in_current_estimate,
        ),
        can_export_pdf: limits.can_export_pdf,
        can_export_html: limits.can_export_html,
        can_remove_watermark: limits.can_remove_watermark,
        can_edit_saved: limits.can_edit_saved,
        can_delete_saved: limits.can_delete_saved,
        lead_visibility: limits.lead_visibility,
        max_estimates: limits.max_estimates,
        max_items_per_estimate: limits.max_items_per_estimate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_runs_out_of_estimates_at_five() {
        let usage = UsageSnapshot {
            estimate_count: 5,
            items_in_current_estimate: 0,
        };
        let caps = evaluate(Tier::Free, &usage);
        assert!(!caps.can_create_estimate);
        assert_eq!(caps.max_estimates, Some(5));
    }

    #[test]
    fn pro_tier_is_unbounded_at_the_same_usage() {
        let usage = UsageSnapshot {
            estimate_count: 5,
            items_in_current_estimate: 0,
        };
        let caps = evaluate(Tier::Pro, &usage);
        assert!(caps.can_create_estimate);
        assert_eq!(caps.max_estimates, None);
    }

    #[test]
    fn item_limit_gates_free_estimates() {
        let at_limit = UsageSnapshot {
            estimate_count: 0,
            items_in_current_estimate: 20,
        };
        assert!(!evaluate(Tier::Free, &at_limit).can_add_item);

        let below = UsageSnapshot {
            estimate_count: 0,
            items_in_current_estimate: 19,
        };
        assert!(evaluate(Tier::Free, &below).can_add_item);
    }

    #[test]
    fn lead_visibility_is_tri_state() {
        let usage = UsageSnapshot::default();
        assert_eq!(
            evaluate(Tier::Free, &usage).lead_visibility,
            LeadVisibility::None
        );
        assert_eq!(
            evaluate(Tier::Pro, &usage).lead_visibility,
            LeadVisibility::Preview
        );
        assert_eq!(
            evaluate(Tier::Business, &usage).lead_visibility,
            LeadVisibility::Full
        );
    }
}
