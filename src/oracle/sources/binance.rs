//! Binance REST ticker - last-resort CEX quote
//!
//! `GET /api/v3/ticker/price?symbol=SOLUSDT` returns
//! `{"symbol":"SOLUSDT","price":"142.37000000"}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{validate_price, PriceSource};
use crate::error::SourceError;

pub const BINANCE_TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price";

#[derive(Debug, Clone, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Clone)]
pub struct BinanceTickerSource {
    client: reqwest::Client,
    url: String,
    symbol: String,
}

impl BinanceTickerSource {
    pub fn new(url: &str, symbol: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            symbol: symbol.to_uppercase(),
        })
    }

    /// Parse a ticker body into a validated price
    pub fn parse_ticker(body: &str) -> Result<f64, SourceError> {
        let ticker: TickerPrice =
            serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
        let price: f64 = ticker
            .price
            .trim()
            .parse()
            .map_err(|_| SourceError::Malformed(format!("price {:?} is not a number", ticker.price)))?;
        validate_price(price)
    }
}

#[async_trait]
impl PriceSource for BinanceTickerSource {
    fn name(&self) -> &'static str {
        "Binance"
    }

    async fn fetch_price(&self) -> Result<f64, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("symbol", self.symbol.as_str())])
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

        let price = Self::parse_ticker(&body)?;
        tracing::debug!(source = %"Binance", symbol = %self.symbol, price, "CEX quote received");
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker_string_price() {
        let body = r#"{"symbol":"SOLUSDT","price":"142.37000000"}"#;
        let price = BinanceTickerSource::parse_ticker(body).unwrap();
        assert!((price - 142.37).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ticker_rejects_zero_and_garbage() {
        assert_eq!(
            BinanceTickerSource::parse_ticker(r#"{"symbol":"SOLUSDT","price":"0.0"}"#),
            Err(SourceError::InvalidPrice(0.0))
        );
        assert!(matches!(
            BinanceTickerSource::parse_ticker(r#"{"code":-1121,"msg":"Invalid symbol."}"#),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            BinanceTickerSource::parse_ticker(r#"{"price":"abc"}"#),
            Err(SourceError::Malformed(_))
        ));
    }
}
