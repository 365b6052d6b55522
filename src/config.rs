use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;

use serde_json::{json, Value};

use crate::entitlement::models::Tier;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// Signing secret for inbound payment-provider webhooks. Unset means every
/// webhook is rejected before any state is touched.
pub static STRIPE_WEBHOOK_SECRET: Lazy<Option<String>> =
    Lazy::new(|| read_secret_env("STRIPE_WEBHOOK_SECRET", "STRIPE_WEBHOOK_SECRET_FILE"));

/// API key used for the subscription -> price lookup against the payment provider.
pub static STRIPE_SECRET_KEY: Lazy<Option<String>> =
    Lazy::new(|| read_secret_env("STRIPE_SECRET_KEY", "STRIPE_SECRET_KEY_FILE"));

/// Base URL of the payment provider API.
pub static STRIPE_API_BASE: Lazy<String> = Lazy::new(|| {
    read_optional_env("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string())
});

/// Maximum age (seconds) accepted for a webhook signature timestamp.
pub static WEBHOOK_TOLERANCE_SECS: Lazy<i64> = Lazy::new(|| {
    std::env::var("WEBHOOK_TOLERANCE_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(300)
});

/// key: entitlement-config -> price id to tier table
///
/// Price identifiers absent from this table reconcile as `free`; the table
/// never defaults an unknown id upward.
pub static PRICE_TIER_TABLE: Lazy<HashMap<String, Tier>> = Lazy::new(|| {
    let raw = json_from_env(
        "PRICE_TIER_MAP",
        json!({
            "price_1Sl8fkGZfnvqYwvYTdmFAUM4": "pro",
            "price_1Sl8g9GZfnvqYwvYm2nYhKQx": "business",
        }),
    );
    tier_table_from_json("PRICE_TIER_MAP", &raw)
});

/// key: entitlement-config -> auditable tier-elevation allow-list
///
/// Maps profile ids to a floor tier. Applied on the read path, logged, and
/// only ever elevates.
pub static TIER_OVERRIDES: Lazy<HashMap<String, Tier>> = Lazy::new(|| {
    let raw = json_from_env("TIER_OVERRIDES", json!({}));
    tier_table_from_json("TIER_OVERRIDES", &raw)
});

/// Base URL of the suggestion oracle API.
pub static ORACLE_API_BASE: Lazy<String> = Lazy::new(|| {
    read_optional_env("ORACLE_API_BASE").unwrap_or_else(|| "https://api.openai.com".to_string())
});

/// Bearer token presented to the suggestion oracle.
pub static ORACLE_API_KEY: Lazy<Option<String>> =
    Lazy::new(|| read_secret_env("ORACLE_API_KEY", "ORACLE_API_KEY_FILE"));

/// Model identifier sent with every oracle request.
pub static ORACLE_MODEL: Lazy<String> =
    Lazy::new(|| read_optional_env("ORACLE_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()));

/// Bounded wait for any single oracle call, in seconds.
pub static ORACLE_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("ORACLE_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(20)
});

/// Upper bound on items forwarded in one batch pricing request.
pub static ORACLE_MAX_BATCH: Lazy<usize> = Lazy::new(|| {
    std::env::var("ORACLE_MAX_BATCH")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(30)
});

fn tier_table_from_json(var: &str, raw: &Value) -> HashMap<String, Tier> {
    let Some(object) = raw.as_object() else {
        panic!("{var} must be a JSON object mapping ids to tiers");
    };
    object
        .iter()
        .map(|(key, value)| {
            let tier = value
                .as_str()
                .and_then(Tier::parse)
                .unwrap_or_else(|| panic!("{var} entry '{key}' has an unrecognized tier"));
            (key.clone(), tier)
        })
        .collect()
}

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_secret_env(value_key: &str, file_key: &str) -> Option<String> {
    if let Some(path) = read_optional_env(file_key) {
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if !trimmed.is_empty() {
                    return Some(trimmed);
                }
            }
            Err(err) => panic!("failed to read {file_key} from {path}: {err}"),
        }
    }

    read_optional_env(value_key)
}

fn json_from_env(var: &str, default_value: Value) -> Value {
    match std::env::var(var) {
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                default_value
            } else {
                serde_json::from_str(trimmed)
                    .unwrap_or_else(|err| panic!("failed to parse {var} as JSON: {err}"))
            }
        }
        Err(_) => default_value,
    }
}
