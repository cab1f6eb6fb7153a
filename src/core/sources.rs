//! Data source abstractions and result types

use crate::core::field::Fields;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A near-real-time quote for one vehicle.
///
/// The price arrives unit-scaled; the volume stays a decorated string (the
/// turnover calculator parses the leading decimal back out of it). Quotes
/// are fetched fresh per use and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub volume: String,
}

/// One row of the distribution-history table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionRecord {
    /// Parsed per-unit cash amount; 0.0 when the cell had no numeric match.
    pub per_unit: f64,
    /// The row's columns as displayed on the page.
    pub columns: BTreeMap<String, String>,
}

/// Distribution records keyed by registration date (`YYYY-MM-DD`).
pub type DistributionTable = BTreeMap<String, DistributionRecord>;

/// Fetches a vehicle's descriptive profile fields.
///
/// `Ok(None)` reports an unavailable page (non-success status); transport
/// errors surface as `Err`.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, code: &str) -> Result<Option<Fields>>;
}

/// Fetches a vehicle's current quote.
///
/// `Ok(None)` reports a code with no known market identifier.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, code: &str) -> Result<Option<Quote>>;
}

/// Fetches the distribution history behind a profile link.
#[async_trait]
pub trait DistributionSource: Send + Sync {
    async fn fetch_distributions(&self, url: &str) -> Result<Option<DistributionTable>>;
}
