//! Quote endpoint queries

use crate::core::sources::{Quote, QuoteSource};
use crate::providers::listing::MarketIdResolver;
use crate::providers::util::build_client;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Field-code projection the quote endpoint expects, kept verbatim from the
/// upstream API contract.
const QUOTE_FIELDS: &str = "f58,f734,f107,f57,f43,f59,f169,f170,f152,f46,f60,f44,f45,f47,f48,f19,\
                            f17,f531,f15,f13,f11,f20,f18,f16,f14,f12,f39,f37,f35,f33,f31,f40,f38,\
                            f36,f34,f32,f211,f212,f213,f214,f215,f210,f209,f208,f207,f206,f161,f49,\
                            f171,f50,f86,f168,f108,f167,f71,f292,f51,f52,f191,f192,f452,f177";

/// Field code carrying the latest price, in integer thousandths.
const PRICE_FIELD: &str = "f43";
/// Field code carrying the traded volume, in raw units.
const VOLUME_FIELD: &str = "f47";

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Fetches the current quote for a resolved vehicle code.
pub struct QuoteFetcher {
    base_url: String,
    client: reqwest::Client,
    resolver: Arc<MarketIdResolver>,
}

impl QuoteFetcher {
    pub fn new(base_url: &str, timeout: Duration, resolver: Arc<MarketIdResolver>) -> Result<Self> {
        Ok(QuoteFetcher {
            base_url: base_url.to_string(),
            client: build_client(timeout)?,
            resolver,
        })
    }
}

#[async_trait]
impl QuoteSource for QuoteFetcher {
    async fn fetch_quote(&self, code: &str) -> Result<Option<Quote>> {
        let markets = self.resolver.resolve_all().await?;
        let Some(market) = markets.get(code) else {
            warn!("{} is not found in the market listing", code);
            return Ok(None);
        };

        let url = format!("{}/api/qt/stock/get", self.base_url);
        let secid = format!("{}.{}", market.prefix(), code);
        debug!("Requesting quote for {}", secid);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ut", "fa5fd1943c7b386f172d6893dbfba10b"),
                ("fltt", "1"),
                ("invt", "2"),
                ("fields", QUOTE_FIELDS),
                ("secid", secid.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Quote request failed for {secid}"))?;

        let quote: QuoteResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse quote response for {secid}"))?;
        let data = quote.data.unwrap_or_default();

        let price = numeric_or_zero(data.get(PRICE_FIELD)) / 1e3;
        let volume = numeric_or_zero(data.get(VOLUME_FIELD)) / 1e4;
        Ok(Some(Quote {
            price,
            volume: format!("{volume:.2}万"),
        }))
    }
}

/// The endpoint reports "-" for fields with no data yet; anything
/// non-numeric counts as 0 before scaling.
fn numeric_or_zero(value: Option<&serde_json::Value>) -> f64 {
    value.and_then(serde_json::Value::as_f64).unwrap_or(0.0)
}
