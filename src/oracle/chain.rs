//! Oracle chain - first successful source wins
//!
//! Sources are tried once each, sequentially, in priority order. A source
//! that errors or exceeds its timeout is logged and skipped; the chain only
//! fails when every source has failed.

use std::time::Duration;

use crate::error::{PriceUnavailable, SourceError};
use crate::oracle::sources::{validate_price, PriceSource};

/// Price resolved by the chain together with the source that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OraclePrice {
    pub value: f64,
    pub source: &'static str,
}

pub struct PriceOracleChain {
    sources: Vec<Box<dyn PriceSource>>,
    /// Per-source call timeout
    timeout: Duration,
}

impl PriceOracleChain {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    /// Append a source with lower priority than every source added before it
    pub fn with_source(mut self, source: impl PriceSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    async fn query(&self, source: &dyn PriceSource) -> Result<f64, SourceError> {
        let price = tokio::time::timeout(self.timeout, source.fetch_price())
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))??;
        validate_price(price)
    }

    /// Get the reference price with fallback
    pub async fn get_price(&self) -> Result<OraclePrice, PriceUnavailable> {
        for source in &self.sources {
            match self.query(source.as_ref()).await {
                Ok(value) => {
                    tracing::info!(source = %source.name(), price = value, "💲 Reference price resolved");
                    return Ok(OraclePrice {
                        value,
                        source: source.name(),
                    });
                }
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "Price source unavailable, falling back");
                }
            }
        }

        tracing::error!(sources = ?self.source_names(), "❌ All price sources failed");
        Err(PriceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        name: &'static str,
        result: Result<f64, SourceError>,
        delay: Option<Duration>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn ok(name: &'static str, price: f64) -> Self {
            Self {
                name,
                result: Ok(price),
                delay: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                result: Err(SourceError::Transport("connection refused".to_string())),
                delay: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PriceSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_price(&self) -> Result<f64, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.clone()
        }
    }

    fn chain(primary: FakeSource, secondary: FakeSource, cex: FakeSource) -> PriceOracleChain {
        PriceOracleChain::new(Duration::from_millis(200))
            .with_source(primary)
            .with_source(secondary)
            .with_source(cex)
    }

    #[tokio::test]
    async fn test_primary_wins_when_healthy() {
        let secondary = FakeSource::ok("switchboard", 101.0);
        let secondary_calls = secondary.calls.clone();
        let chain = chain(FakeSource::ok("pyth", 100.0), secondary, FakeSource::ok("cex", 102.0));

        let price = chain.get_price().await.unwrap();
        assert_eq!(price, OraclePrice { value: 100.0, source: "pyth" });
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_secondary_used_when_primary_fails() {
        let chain = chain(
            FakeSource::failing("pyth"),
            FakeSource::ok("switchboard", 101.0),
            FakeSource::ok("cex", 102.0),
        );
        let price = chain.get_price().await.unwrap();
        assert_eq!(price.source, "switchboard");
        assert_eq!(price.value, 101.0);
    }

    #[tokio::test]
    async fn test_cex_only_when_both_onchain_fail() {
        let chain = chain(
            FakeSource::failing("pyth"),
            FakeSource::failing("switchboard"),
            FakeSource::ok("cex", 102.0),
        );
        let price = chain.get_price().await.unwrap();
        assert_eq!(price.source, "cex");
    }

    #[tokio::test]
    async fn test_all_failed_is_price_unavailable() {
        let primary = FakeSource::failing("pyth");
        let primary_calls = primary.calls.clone();
        let chain = chain(primary, FakeSource::failing("switchboard"), FakeSource::failing("cex"));

        assert_eq!(chain.get_price().await, Err(PriceUnavailable));
        // No retry within one invocation
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_price_falls_through() {
        let chain = chain(
            FakeSource::ok("pyth", 0.0),
            FakeSource::ok("switchboard", f64::NAN),
            FakeSource::ok("cex", 99.5),
        );
        assert_eq!(chain.get_price().await.unwrap().value, 99.5);
    }

    #[tokio::test]
    async fn test_slow_source_treated_as_failure() {
        let mut slow = FakeSource::ok("pyth", 100.0);
        slow.delay = Some(Duration::from_secs(5));
        let chain = chain(slow, FakeSource::ok("switchboard", 101.0), FakeSource::ok("cex", 102.0));

        let price = chain.get_price().await.unwrap();
        assert_eq!(price.source, "switchboard");
    }
}
