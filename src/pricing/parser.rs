use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// key: suggestion-parser -> oracle text into typed records
///
/// Pure functions, no I/O. Oracle output is unreliable unstructured text;
/// everything here either normalizes it into a typed record or says exactly
/// why it could not.

#[derive(Debug, Error)]
pub enum ContractError {
    /// A fresh oracle call is needed; re-parsing the same text will not help.
    #[error("oracle response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("oracle response did not match the expected shape: {0}")]
    SchemaMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedItem {
    pub name: String,
    pub unit: String,
    pub price: f64,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    pub name: String,
    pub price: f64,
}

/// Removes a leading ```json / ``` fence and a trailing ``` if present.
/// Oracle responses sometimes wrap JSON in markdown fences.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start();
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Strict single-item contract: any invalid required field fails the call.
pub fn parse_single(raw: &str) -> Result<SuggestedItem, ContractError> {
    let document: Value = serde_json::from_str(strip_code_fences(raw))?;
    item_from_value(&document)
        .ok_or_else(|| ContractError::SchemaMismatch("suggestion is missing name, unit, or a non-negative price".to_string()))
}

/// Multi-item contract: the document must carry a `suggestions` array.
/// Individually invalid entries are dropped, not fatal.
pub fn parse_suggestions(raw: &str) -> Result<Vec<SuggestedItem>, ContractError> {
    let document: Value = serde_json::from_str(strip_code_fences(raw))?;
    let entries = document
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ContractError::SchemaMismatch("document has no `suggestions` array".to_string())
        })?;
    Ok(entries.iter().filter_map(item_from_value).collect())
}

/// Batch pricing contract: the document must carry a `prices` array of
/// `{name, price}` pairs in the order of the originating request. Entries
/// beyond `expected` are ignored; shorter results degrade gracefully;
/// invalid entries are dropped.
pub fn parse_batch_prices(raw: &str, expected: usize) -> Result<Vec<PricedLine>, ContractError> {
    let document: Value = serde_json::from_str(strip_code_fences(raw))?;
    let entries = document
        .get("prices")
        .and_then(Value::as_array)
        .ok_or_else(|| ContractError::SchemaMismatch("document has no `prices` array".to_string()))?;

    Ok(entries
        .iter()
        .take(expected)
        .filter_map(|entry| {
            let name = nonempty_string(entry.get("name")?)?;
            let price = coerce_price(entry.get("price")?)?;
            Some(PricedLine { name, price })
        })
        .collect())
}

fn item_from_value(value: &Value) -> Option<SuggestedItem> {
    let name = nonempty_string(value.get("name")?)?;
    let unit = nonempty_string(value.get("unit")?)?;
    let price = coerce_price(value.get("price")?)?;
    let quantity = value
        .get("quantity")
        .and_then(coerce_number)
        .filter(|quantity| *quantity > 0.0)
        .unwrap_or(1.0);

    Some(SuggestedItem {
        name,
        unit,
        price,
        quantity,
        description: value.get("description").and_then(nonempty_string),
        category: value.get("category").and_then(nonempty_string),
    })
}

fn nonempty_string(value: &Value) -> Option<String> {
    let trimmed = value.as_str()?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Prices arrive as JSON numbers or numeric strings; anything negative or
/// non-numeric is invalid. Two-decimal semantic precision.
fn coerce_price(value: &Value) -> Option<f64> {
    let number = coerce_number(value)?;
    if number < 0.0 {
        return None;
    }
    Some((number * 100.0).round() / 100.0)
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_and_unfenced_parse_alike() {
        let bare = r#"{"suggestions":[{"name":"Drywall","unit":"sheet","price":12.5}]}"#;
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(
            parse_suggestions(bare).unwrap(),
            parse_suggestions(&fenced).unwrap()
        );

        let anonymous_fence = format!("```\n{bare}\n```");
        assert_eq!(
            parse_suggestions(bare).unwrap(),
            parse_suggestions(&anonymous_fence).unwrap()
        );

        let shouty_fence = format!("```JSON\n{bare}\n```");
        assert_eq!(
            parse_suggestions(bare).unwrap(),
            parse_suggestions(&shouty_fence).unwrap()
        );
    }

    #[test]
    fn single_item_parses_with_defaults() {
        let raw = r#"{"name":"2x4 lumber","unit":"each","price":"4.579"}"#;
        let item = parse_single(raw).unwrap();
        assert_eq!(item.name, "2x4 lumber");
        assert_eq!(item.unit, "each");
        assert_eq!(item.price, 4.58);
        assert_eq!(item.quantity, 1.0);
        assert_eq!(item.category, None);
    }

    #[test]
    fn single_item_rejects_missing_required_fields() {
        let missing_unit = r#"{"name":"Paint","price":30}"#;
        assert!(matches!(
            parse_single(missing_unit),
            Err(ContractError::SchemaMismatch(_))
        ));

        let negative_price = r#"{"name":"Paint","unit":"gal","price":-3}"#;
        assert!(matches!(
            parse_single(negative_price),
            Err(ContractError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn non_json_is_invalid_json() {
        assert!(matches!(
            parse_single("not json at all"),
            Err(ContractError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_batch_prices("not json at all", 3),
            Err(ContractError::InvalidJson(_))
        ));
    }

    #[test]
    fn invalid_entries_are_dropped_not_fatal() {
        let raw = r#"{"suggestions":[
            {"name":"Good","unit":"each","price":1},
            {"name":"","unit":"each","price":1},
            {"name":"Bad price","unit":"each","price":"lots"},
            {"name":"Also good","unit":"m2","price":2.2,"quantity":3}
        ]}"#;
        let items = parse_suggestions(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].quantity, 3.0);
    }

    #[test]
    fn missing_suggestions_array_is_schema_mismatch() {
        assert!(matches!(
            parse_suggestions(r#"{"items":[]}"#),
            Err(ContractError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn batch_preserves_order_and_ignores_extras() {
        let raw = r#"{"prices":[
            {"name":"Concrete","price":110},
            {"name":"Rebar","price":"0.90"},
            {"name":"Extra","price":1}
        ]}"#;
        let lines = parse_batch_prices(raw, 2).unwrap();
        assert_eq!(
            lines,
            vec![
                PricedLine { name: "Concrete".to_string(), price: 110.0 },
                PricedLine { name: "Rebar".to_string(), price: 0.9 },
            ]
        );
    }

    #[test]
    fn short_batch_results_degrade_gracefully() {
        let raw = r#"{"prices":[{"name":"Concrete","price":110}]}"#;
        let lines = parse_batch_prices(raw, 5).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn negative_quantity_falls_back_to_default() {
        let raw = r#"{"name":"Tile","unit":"m2","price":8,"quantity":-4}"#;
        assert_eq!(parse_single(raw).unwrap().quantity, 1.0);
    }
}
