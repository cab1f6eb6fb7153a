//! Distribution-history page extraction

use crate::core::sources::{DistributionRecord, DistributionSource, DistributionTable};
use crate::providers::util::{build_client, element_text};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Column headers on the distribution detail table.
pub const PER_UNIT_COLUMN: &str = "每份分红";
pub const REGISTRATION_DATE_COLUMN: &str = "权益登记日";

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.w782.comm.cfxq").expect("Failed to parse dividend table selector")
});
static HEAD_CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead th").expect("Failed to parse head cell selector"));
static BODY_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr").expect("Failed to parse body row selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("Failed to parse cell selector"));

/// Per-unit cash amount inside its decorated cell, e.g. "每份派现金0.1500元".
static PER_UNIT_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+)元").expect("Failed to compile per-unit amount regex"));

/// Extracts the date-keyed distribution table behind a profile link.
pub struct DividendExtractor {
    client: reqwest::Client,
}

impl DividendExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(DividendExtractor {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl DistributionSource for DividendExtractor {
    async fn fetch_distributions(&self, url: &str) -> Result<Option<DistributionTable>> {
        debug!("Requesting distribution history from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Distribution request failed, url={url}"))?;
        if !response.status().is_success() {
            warn!(
                "Distribution request failed, url={}, status={}",
                url,
                response.status()
            );
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read distribution page body, url={url}"))?;
        Ok(Some(parse_dividend_table(&body)))
    }
}

/// Zips the head row's headers with each body row's cells. Rows without the
/// per-unit column are skipped; rows without a registration date are
/// dropped; a cell with no decimal match keeps amount 0.0.
fn parse_dividend_table(html: &str) -> DistributionTable {
    let document = Html::parse_document(html);
    let mut table = DistributionTable::new();

    let Some(root) = document.select(&TABLE_SELECTOR).next() else {
        debug!("No distribution table found");
        return table;
    };

    let headers: Vec<String> = root
        .select(&HEAD_CELL_SELECTOR)
        .map(|th| element_text(&th))
        .collect();

    for row in root.select(&BODY_ROW_SELECTOR) {
        let cells = row.select(&CELL_SELECTOR).map(|td| element_text(&td));
        let columns: BTreeMap<String, String> = headers.iter().cloned().zip(cells).collect();

        let Some(amount_text) = columns.get(PER_UNIT_COLUMN) else {
            continue;
        };
        let per_unit = PER_UNIT_AMOUNT
            .captures(amount_text)
            .and_then(|captures| captures.get(1))
            .and_then(|amount| amount.as_str().parse().ok())
            .unwrap_or(0.0);

        let Some(date) = columns.get(REGISTRATION_DATE_COLUMN).cloned() else {
            continue;
        };
        table.insert(date, DistributionRecord { per_unit, columns });
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DIVIDEND_HTML: &str = r#"
        <html><body>
        <table class="w782 comm cfxq">
          <thead>
            <tr><th>年份</th><th>权益登记日</th><th>每份分红</th><th>分红发放日</th></tr>
          </thead>
          <tbody>
            <tr><td>2024</td><td>2024-03-01</td><td>每份派现金0.1500元</td><td>2024-03-08</td></tr>
            <tr><td>2024</td><td>2024-09-01</td><td>暂无数据</td><td>--</td></tr>
            <tr><td>2023</td><td>2023-06-10</td><td>每份派现金0.2000元</td><td>2023-06-15</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_rows_keyed_by_registration_date() {
        let table = parse_dividend_table(DIVIDEND_HTML);

        let record = table.get("2024-03-01").unwrap();
        assert_eq!(record.per_unit, 0.15);
        assert_eq!(
            record.columns.get("分红发放日").map(String::as_str),
            Some("2024-03-08")
        );
    }

    #[test]
    fn test_unmatched_amount_defaults_to_zero() {
        let table = parse_dividend_table(DIVIDEND_HTML);
        assert_eq!(table.get("2024-09-01").unwrap().per_unit, 0.0);
    }

    #[test]
    fn test_every_dated_row_is_keyed() {
        let table = parse_dividend_table(DIVIDEND_HTML);
        assert_eq!(table.len(), 3);
        assert!(table.contains_key("2023-06-10"));
    }

    #[test]
    fn test_row_without_registration_date_is_dropped() {
        // A short row zips away its trailing columns, here the date.
        let html = r#"
            <table class="w782 comm cfxq">
              <thead><tr><th>每份分红</th><th>权益登记日</th></tr></thead>
              <tbody>
                <tr><td>每份派现金0.3000元</td></tr>
                <tr><td>每份派现金0.4000元</td><td>2024-05-20</td></tr>
              </tbody>
            </table>
        "#;
        let table = parse_dividend_table(html);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("2024-05-20").unwrap().per_unit, 0.4);
    }

    #[test]
    fn test_missing_table_yields_empty_result() {
        let table = parse_dividend_table("<html><body></body></html>");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_reports_absence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhsp_508068.html"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let extractor = DividendExtractor::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/fhsp_508068.html", server.uri());
        let result = extractor.fetch_distributions(&url).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_parses_served_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhsp_508068.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DIVIDEND_HTML))
            .mount(&server)
            .await;

        let extractor = DividendExtractor::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/fhsp_508068.html", server.uri());
        let table = extractor.fetch_distributions(&url).await.unwrap().unwrap();
        assert_eq!(table.get("2024-03-01").unwrap().per_unit, 0.15);
    }
}
