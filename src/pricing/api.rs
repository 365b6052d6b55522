use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

use super::oracle::{BatchItem, PriceOracleClient};
use super::parser::{self, PricedLine, SuggestedItem};

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchPriceRequest {
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestedItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchPricesResponse {
    /// Empty means "pricing unavailable", never "zero priced items".
    pub prices: Vec<PricedLine>,
}

/// key: pricing-api -> suggestion endpoints over the oracle + parser

pub async fn suggest_item(
    Extension(oracle): Extension<Arc<PriceOracleClient>>,
    Json(request): Json<SuggestRequest>,
) -> AppResult<Json<SuggestedItem>> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }

    let raw = match oracle.suggest(&single_item_prompt(&query)).await {
        Ok(raw) => raw,
        Err(err) => {
            // Oracle outage is recoverable here: hand back a neutral
            // zero-price line the user can edit instead of blocking.
            warn!(%err, "oracle unavailable, returning neutral default");
            return Ok(Json(neutral_default(&query)));
        }
    };

    match parser::parse_single(&raw) {
        Ok(item) => Ok(Json(item)),
        Err(err) => {
            warn!(%err, "oracle response violated the single-item contract");
            Err(AppError::BadGateway(err.to_string()))
        }
    }
}

pub async fn suggest_ideas(
    Extension(oracle): Extension<Arc<PriceOracleClient>>,
    Json(request): Json<SuggestRequest>,
) -> Json<SuggestionsResponse> {
    let query = request.query.trim();
    if query.is_empty() {
        return Json(SuggestionsResponse { suggestions: Vec::new() });
    }

    let suggestions = match oracle.suggest(&ideas_prompt(query)).await {
        Ok(raw) => match parser::parse_suggestions(&raw) {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "oracle response violated the suggestions contract");
                Vec::new()
            }
        },
        Err(err) => {
            warn!(%err, "oracle unavailable for suggestions");
            Vec::new()
        }
    };

    Json(SuggestionsResponse { suggestions })
}

/// Explicit fallback contract: any internal failure degrades to an empty
/// price list, never an error status.
pub async fn batch_prices(
    Extension(oracle): Extension<Arc<PriceOracleClient>>,
    Json(request): Json<BatchPriceRequest>,
) -> Json<BatchPricesResponse> {
    if request.items.is_empty() {
        return Json(BatchPricesResponse { prices: Vec::new() });
    }

    let prices = match oracle.suggest_batch(&request.items).await {
        Ok(raw) => match parser::parse_batch_prices(&raw, request.items.len()) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(%err, "oracle response violated the batch price contract");
                Vec::new()
            }
        },
        Err(err) => {
            warn!(%err, "oracle unavailable for batch pricing");
            Vec::new()
        }
    };

    Json(BatchPricesResponse { prices })
}

fn neutral_default(query: &str) -> SuggestedItem {
    SuggestedItem {
        name: query.to_string(),
        unit: "each".to_string(),
        price: 0.0,
        quantity: 1.0,
        description: None,
        category: None,
    }
}

fn single_item_prompt(query: &str) -> String {
    format!(
        "Suggest one construction cost line item for: {query}. Respond with JSON only, \
         shaped as {{\"name\":...,\"unit\":...,\"price\":...,\"quantity\":...,\"category\":...}}."
    )
}

fn ideas_prompt(query: &str) -> String {
    format!(
        "Suggest 3 to 5 construction cost line items for: {query}. Respond with JSON only, \
         shaped as {{\"suggestions\":[{{\"name\":...,\"unit\":...,\"price\":...,\
         \"quantity\":...,\"category\":...}}]}}."
    )
}
