use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum OracleError {
    /// Recoverable at the caller: substitute a neutral default rather than
    /// failing the whole operation.
    #[error("price oracle unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub name: String,
    pub unit: String,
}

/// key: price-oracle -> outbound suggestion client
///
/// Wraps the single completion call. Returns raw text only; interpretation
/// belongs to the contract parser, retry policy to the caller. One attempt,
/// bounded wait, fail fast.
pub struct PriceOracleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_batch: usize,
}

impl PriceOracleClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        max_batch: usize,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            max_batch,
        }
    }

    pub fn from_env() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(*config::ORACLE_TIMEOUT_SECS))
            .build()
            .expect("failed to build oracle HTTP client");
        Self::new(
            http,
            config::ORACLE_API_BASE.as_str(),
            config::ORACLE_API_KEY.clone(),
            config::ORACLE_MODEL.as_str(),
            *config::ORACLE_MAX_BATCH,
        )
    }

    /// Single completion round trip for a caller-built prompt.
    pub async fn suggest(&self, prompt: &str) -> Result<String, OracleError> {
        self.complete(prompt).await
    }

    /// Batch pricing round trip. Input is truncated to the configured batch
    /// bound before the request body is built, keeping request size and cost
    /// bounded regardless of what the caller hands over.
    pub async fn suggest_batch(&self, items: &[BatchItem]) -> Result<String, OracleError> {
        let batch = &items[..items.len().min(self.max_batch)];
        self.complete(&batch_prompt(batch)).await
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.http.post(&url).json(&json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        }));
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| OracleError::Unavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(OracleError::Unavailable(format!(
                "oracle returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| OracleError::Unavailable(err.to_string()))?;
        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                OracleError::Unavailable("completion payload carried no content".to_string())
            })
    }
}

fn batch_prompt(items: &[BatchItem]) -> String {
    let mut prompt = String::from(
        "Suggest a reasonable market unit price for each construction line item below. \
         Respond with JSON only, shaped as {\"prices\":[{\"name\":...,\"price\":...}]}. \
         Maintain item order and use the exact names given.\n",
    );
    for item in items {
        let _ = writeln!(prompt, "- {} ({})", item.name, item.unit);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_prompt_lists_items_in_order() {
        let items = vec![
            BatchItem { name: "Concrete".to_string(), unit: "m3".to_string() },
            BatchItem { name: "Rebar".to_string(), unit: "kg".to_string() },
        ];
        let prompt = batch_prompt(&items);
        let concrete = prompt.find("Concrete (m3)").unwrap();
        let rebar = prompt.find("Rebar (kg)").unwrap();
        assert!(concrete < rebar);
        assert!(prompt.contains("Maintain item order"));
    }
}
