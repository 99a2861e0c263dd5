//! HTTP venue client
//!
//! Expects a JSON object with any of `large_bin`, `medium_bin`, `small_bin`
//! (or `large`, `medium`, `small`). Values may be numbers or numeric strings
//! on the 0-1 scale, e.g. `{"large_bin": 0.045, "small_bin": "0.082"}`.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::YieldSource;
use crate::error::SourceError;
use crate::types::BinCategory;

#[derive(Debug, Clone)]
pub struct HttpYieldSource {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpYieldSource {
    pub fn new(name: &str, endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            client,
        })
    }
}

fn category_for(key: &str) -> Option<BinCategory> {
    match key.to_lowercase().as_str() {
        "large_bin" | "large" => Some(BinCategory::Large),
        "medium_bin" | "medium" => Some(BinCategory::Medium),
        "small_bin" | "small" => Some(BinCategory::Small),
        _ => None,
    }
}

fn as_rate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a venue body into per-category rates. Unknown keys are ignored;
/// a category whose value is not numeric is skipped, the rest are kept.
pub fn parse_venue_yields(body: &str) -> Result<HashMap<BinCategory, f64>, SourceError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| SourceError::Malformed("expected a JSON object".to_string()))?;

    let mut yields = HashMap::new();
    for (key, raw) in object {
        let Some(category) = category_for(key) else {
            continue;
        };
        match as_rate(raw) {
            Some(rate) => {
                yields.insert(category, rate);
            }
            None => tracing::warn!(bin = %category, value = %raw, "Skipping non-numeric yield value"),
        }
    }
    Ok(yields)
}

#[async_trait]
impl YieldSource for HttpYieldSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_yields(&self) -> Result<HashMap<BinCategory, f64>, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        parse_venue_yields(&body)
    }
}
