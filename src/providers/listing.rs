//! Exchange listing queries and the code-to-market-identifier map

use crate::providers::util::build_client;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Exchange a vehicle code belongs to. The numeric prefix forms the
/// `secid={prefix}.{code}` key the quote endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketId {
    Shenzhen,
    Shanghai,
}

impl MarketId {
    pub fn prefix(self) -> u8 {
        match self {
            MarketId::Shenzhen => 0,
            MarketId::Shanghai => 1,
        }
    }
}

pub type MarketIdMap = HashMap<String, MarketId>;

/// Listing filters selecting each exchange's REIT board.
const SHANGHAI_FILTER: &str = "m:1 t:9 e:97";
const SHENZHEN_FILTER: &str = "m:0 t:10 e:97";

#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: Option<ListingData>,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    diff: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    f12: String,
}

/// Resolves vehicle codes to market identifiers.
///
/// The map is fetched on first use and cached for the process lifetime;
/// clones of one resolver (behind an `Arc`) share the cache. Fetch errors
/// are returned to the caller and not cached, so a later call starts over.
pub struct MarketIdResolver {
    base_url: String,
    client: reqwest::Client,
    cache: OnceCell<MarketIdMap>,
}

impl MarketIdResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(MarketIdResolver {
            base_url: base_url.to_string(),
            client: build_client(timeout)?,
            cache: OnceCell::new(),
        })
    }

    pub async fn resolve_all(&self) -> Result<&MarketIdMap> {
        self.cache.get_or_try_init(|| self.fetch_all()).await
    }

    async fn fetch_all(&self) -> Result<MarketIdMap> {
        let mut map = MarketIdMap::new();

        // Legacy behavior, kept as-is: an empty listing on either exchange
        // discards the whole map instead of returning the other exchange's
        // codes. The empty result still gets cached.
        let shanghai = self.fetch_listing(SHANGHAI_FILTER).await?;
        if shanghai.is_empty() {
            warn!("Shanghai listing returned no codes; market map left empty");
            return Ok(map);
        }
        let shenzhen = self.fetch_listing(SHENZHEN_FILTER).await?;
        if shenzhen.is_empty() {
            warn!("Shenzhen listing returned no codes; market map left empty");
            return Ok(map);
        }

        map.extend(shanghai.into_iter().map(|code| (code, MarketId::Shanghai)));
        map.extend(shenzhen.into_iter().map(|code| (code, MarketId::Shenzhen)));
        debug!("Resolved {} vehicle codes", map.len());
        Ok(map)
    }

    async fn fetch_listing(&self, filter: &str) -> Result<Vec<String>> {
        let url = format!("{}/api/qt/clist/get", self.base_url);
        debug!("Requesting listing from {} with filter {}", url, filter);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("pn", "1"),
                ("pz", "50000"),
                ("po", "1"),
                ("np", "1"),
                ("ut", "bd1d9ddb04089700cf9c27f6f7426281"),
                ("fltt", "2"),
                ("invt", "2"),
                ("fid", "f3"),
                ("fs", filter),
                ("fields", "f12"),
            ])
            .send()
            .await
            .with_context(|| format!("Listing request failed for filter {filter}"))?;

        let listing: ListingResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse listing response for filter {filter}"))?;

        // A missing or empty `diff` is a valid "no results" response.
        let codes: Vec<String> = listing
            .data
            .map(|data| data.diff.into_iter().map(|entry| entry.f12).collect())
            .unwrap_or_default();
        debug!("Filter {} returned {} codes", filter, codes.len());
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_listing(server: &MockServer, filter: &str, body: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path("/api/qt/clist/get"))
            .and(query_param("fs", filter))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expect)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolves_and_merges_both_exchanges() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            SHANGHAI_FILTER,
            r#"{"data": {"diff": [{"f12": "508068"}, {"f12": "508077"}]}}"#,
            1,
        )
        .await;
        mount_listing(
            &server,
            SHENZHEN_FILTER,
            r#"{"data": {"diff": [{"f12": "180301"}]}}"#,
            1,
        )
        .await;

        let resolver = MarketIdResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let map = resolver.resolve_all().await.unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("508068"), Some(&MarketId::Shanghai));
        assert_eq!(map.get("508077"), Some(&MarketId::Shanghai));
        assert_eq!(map.get("180301"), Some(&MarketId::Shenzhen));
    }

    #[tokio::test]
    async fn test_result_is_cached_across_calls() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            SHANGHAI_FILTER,
            r#"{"data": {"diff": [{"f12": "508068"}]}}"#,
            1,
        )
        .await;
        mount_listing(
            &server,
            SHENZHEN_FILTER,
            r#"{"data": {"diff": [{"f12": "180301"}]}}"#,
            1,
        )
        .await;

        let resolver = MarketIdResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
        resolver.resolve_all().await.unwrap();
        // Second call must come from the cache; the mocks expect one hit each.
        let map = resolver.resolve_all().await.unwrap();
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_first_listing_discards_everything() {
        let server = MockServer::start().await;
        mount_listing(&server, SHANGHAI_FILTER, r#"{"data": {"diff": []}}"#, 1).await;
        // The Shenzhen listing must not even be requested.
        mount_listing(
            &server,
            SHENZHEN_FILTER,
            r#"{"data": {"diff": [{"f12": "180301"}]}}"#,
            0,
        )
        .await;

        let resolver = MarketIdResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let map = resolver.resolve_all().await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_empty_second_listing_discards_everything() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            SHANGHAI_FILTER,
            r#"{"data": {"diff": [{"f12": "508068"}]}}"#,
            1,
        )
        .await;
        mount_listing(&server, SHENZHEN_FILTER, r#"{"data": null}"#, 1).await;

        let resolver = MarketIdResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let map = resolver.resolve_all().await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_listing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/qt/clist/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let resolver = MarketIdResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let result = resolver.resolve_all().await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse listing response")
        );
    }
}
