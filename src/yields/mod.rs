//! Yield aggregation across venues
//!
//! Each venue reports annualized rates per bin category. Venues are queried
//! concurrently under individual timeouts; a failing venue is logged and left
//! out of the snapshot, it never aborts the aggregation.

mod http;

pub use http::{parse_venue_yields, HttpYieldSource};

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::future::join_all;

use crate::error::SourceError;
use crate::types::{BinCategory, YieldSnapshot};

/// A venue able to report per-bin yields
#[async_trait]
pub trait YieldSource: Send + Sync {
    fn name(&self) -> &str;

    /// Rates reported by the venue. Categories the venue does not cover are
    /// simply absent from the map.
    async fn fetch_yields(&self) -> Result<HashMap<BinCategory, f64>, SourceError>;
}

pub struct YieldAggregator {
    sources: Vec<Box<dyn YieldSource>>,
    timeout: Duration,
}

impl YieldAggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    /// Build HTTP-backed sources from a `name -> endpoint` map
    pub fn from_venues(venues: &HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let mut names: Vec<&String> = venues.keys().collect();
        names.sort();

        let mut aggregator = Self::new(timeout);
        for name in names {
            let source = HttpYieldSource::new(name, &venues[name], timeout)?;
            aggregator.sources.push(Box::new(source));
        }
        Ok(aggregator)
    }

    pub fn with_source(mut self, source: impl YieldSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn venue_count(&self) -> usize {
        self.sources.len()
    }

    async fn query(&self, source: &dyn YieldSource) -> Result<HashMap<BinCategory, f64>, SourceError> {
        let yields = tokio::time::timeout(self.timeout, source.fetch_yields())
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))??;

        let usable: HashMap<BinCategory, f64> = yields
            .into_iter()
            .filter(|(category, rate)| {
                let ok = rate.is_finite() && *rate >= 0.0;
                if !ok {
                    tracing::warn!(venue = %source.name(), bin = %category, rate, "Discarding invalid yield rate");
                }
                ok
            })
            .collect();

        if usable.is_empty() {
            return Err(SourceError::Malformed("no usable bin yields".to_string()));
        }
        Ok(usable)
    }

    /// Collect yields from every venue. Always returns a snapshot, possibly empty.
    pub async fn collect_yields(&self) -> YieldSnapshot {
        let results = join_all(self.sources.iter().map(|s| self.query(s.as_ref()))).await;

        let mut snapshot = YieldSnapshot::new();
        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(yields) => {
                    for (category, rate) in yields {
                        snapshot.insert(category, source.name(), rate);
                    }
                }
                Err(e) => {
                    tracing::warn!(venue = %source.name(), error = %e, "Error fetching yield data, venue omitted");
                }
            }
        }

        tracing::info!(yields = %snapshot, "📊 Current bin yields");
        snapshot
    }
}
