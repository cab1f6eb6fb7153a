//! Fund profile page extraction

use crate::core::field::{FieldValue, Fields, PROFILE_KEYS};
use crate::core::sources::ProfileSource;
use crate::providers::util::{absolutize, build_client, element_text};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

/// Class attribute of the overview table on the fund profile page.
pub const PROFILE_TABLE_CLASS: &str = "info w790";

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to parse row selector"));
static HEADER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("Failed to parse header selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("Failed to parse cell selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("Failed to parse anchor selector"));

/// Extracts descriptive profile fields from the fund overview page.
pub struct ProfileExtractor {
    base_url: String,
    client: reqwest::Client,
}

impl ProfileExtractor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(ProfileExtractor {
            base_url: base_url.to_string(),
            client: build_client(timeout)?,
        })
    }

    fn profile_url(&self, code: &str) -> String {
        format!("{}/jbgk_{}.html", self.base_url, code)
    }

    /// Extracts `keys` from the table whose class attribute is `table_class`.
    ///
    /// An empty `keys` keeps every header found. Returns `Ok(None)` when the
    /// page responds with a non-success status.
    pub async fn extract(
        &self,
        url: &str,
        table_class: &str,
        keys: &[&str],
    ) -> Result<Option<Fields>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Profile request failed, url={url}"))?;
        if !response.status().is_success() {
            warn!("Profile request failed, url={}, status={}", url, response.status());
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read profile page body, url={url}"))?;
        Ok(Some(parse_profile_table(&body, url, table_class, keys)?))
    }
}

#[async_trait]
impl ProfileSource for ProfileExtractor {
    async fn fetch_profile(&self, code: &str) -> Result<Option<Fields>> {
        let url = self.profile_url(code);
        debug!("Requesting profile from {}", url);
        self.extract(&url, PROFILE_TABLE_CLASS, &PROFILE_KEYS).await
    }
}

fn table_selector(table_class: &str) -> Result<Selector> {
    let classes = table_class.split_whitespace().collect::<Vec<_>>().join(".");
    Selector::parse(&format!("table.{classes}"))
        .map_err(|e| anyhow!("Invalid table class {table_class:?}: {e}"))
}

/// Pairs `<th>` and `<td>` cells positionally per row; rows with mismatched
/// counts truncate to the shorter side. A cell wrapping an anchor becomes a
/// link value with its href absolutized against `page_url`.
fn parse_profile_table(
    html: &str,
    page_url: &str,
    table_class: &str,
    keys: &[&str],
) -> Result<Fields> {
    let selector = table_selector(table_class)?;
    let document = Html::parse_document(html);
    let mut fields = Fields::new();

    let Some(table) = document.select(&selector).next() else {
        debug!("No table with class {:?} found at {}", table_class, page_url);
        return Ok(fields);
    };

    for row in table.select(&ROW_SELECTOR) {
        let headers: Vec<_> = row.select(&HEADER_SELECTOR).collect();
        let cells: Vec<_> = row.select(&CELL_SELECTOR).collect();

        for (header, cell) in headers.iter().zip(cells.iter()) {
            let header_text = element_text(header);
            if !keys.is_empty() && !keys.contains(&header_text.as_str()) {
                continue;
            }

            let cell_text = element_text(cell);
            let value = match cell.select(&ANCHOR_SELECTOR).next() {
                Some(anchor) => {
                    let href = anchor.value().attr("href").unwrap_or_default();
                    FieldValue::Link {
                        text: cell_text,
                        url: absolutize(page_url, href),
                    }
                }
                None => FieldValue::Text(cell_text),
            };
            fields.insert(header_text, value);
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE_URL: &str = "https://fundf10.eastmoney.com/jbgk_508068.html";

    const PROFILE_HTML: &str = r#"
        <html><body>
        <table class="info w790">
          <tr>
            <th>基金全称</th><td>华夏北京保障房REIT</td>
            <th>基金简称</th><td>华夏北京保障房</td>
          </tr>
          <tr>
            <th>基金代码</th><td>508068</td>
            <th>基金类型</th><td>REITs</td>
          </tr>
          <tr>
            <th>资产规模</th><td>12.00亿元，份额规模1000.00万份</td>
            <th>成立来分红</th><td><a href="fhsp_508068.html">0.4500元</a></td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_key_filter_limits_extraction() {
        let fields =
            parse_profile_table(PROFILE_HTML, PAGE_URL, PROFILE_TABLE_CLASS, &PROFILE_KEYS)
                .unwrap();

        assert_eq!(fields.text(field::FULL_NAME), Some("华夏北京保障房REIT"));
        assert_eq!(fields.text(field::SHORT_NAME), Some("华夏北京保障房"));
        assert_eq!(fields.text(field::FUND_CODE), Some("508068"));
        // 基金类型 is not part of the requested vocabulary.
        assert!(!fields.contains("基金类型"));
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_empty_filter_keeps_every_header() {
        let fields = parse_profile_table(PROFILE_HTML, PAGE_URL, PROFILE_TABLE_CLASS, &[]).unwrap();
        assert!(fields.contains("基金类型"));
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn test_anchor_cell_becomes_link_with_resolved_url() {
        let fields =
            parse_profile_table(PROFILE_HTML, PAGE_URL, PROFILE_TABLE_CLASS, &PROFILE_KEYS)
                .unwrap();

        assert_eq!(
            fields.get(field::DIVIDEND_HISTORY),
            Some(&FieldValue::Link {
                text: "0.4500元".to_string(),
                url: "https://fundf10.eastmoney.com/fhsp_508068.html".to_string(),
            })
        );
        // A plain cell stays plain text.
        assert_eq!(fields.text(field::FUND_CODE), Some("508068"));
    }

    #[test]
    fn test_root_relative_href_gets_scheme_prefix() {
        let html = r#"
            <table class="info w790">
              <tr><th>成立来分红</th><td><a href="//fundf10.eastmoney.com/fhsp_508068.html">0.45元</a></td></tr>
            </table>
        "#;
        let fields = parse_profile_table(html, PAGE_URL, PROFILE_TABLE_CLASS, &[]).unwrap();
        assert_eq!(
            fields.link_url(field::DIVIDEND_HISTORY),
            Some("https://fundf10.eastmoney.com/fhsp_508068.html")
        );
    }

    #[test]
    fn test_mismatched_row_truncates_to_shorter_side() {
        let html = r#"
            <table class="info w790">
              <tr><th>基金代码</th><th>发行日期</th><td>508068</td></tr>
            </table>
        "#;
        let fields = parse_profile_table(html, PAGE_URL, PROFILE_TABLE_CLASS, &[]).unwrap();
        assert_eq!(fields.text("基金代码"), Some("508068"));
        assert!(!fields.contains("发行日期"));
    }

    #[test]
    fn test_missing_table_yields_no_fields() {
        let fields =
            parse_profile_table("<html><body></body></html>", PAGE_URL, PROFILE_TABLE_CLASS, &[])
                .unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_reports_absence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jbgk_508068.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = ProfileExtractor::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let result = extractor.fetch_profile("508068").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_profile_uses_canonical_vocabulary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jbgk_508068.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PROFILE_HTML))
            .mount(&server)
            .await;

        let extractor = ProfileExtractor::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let fields = extractor.fetch_profile("508068").await.unwrap().unwrap();
        assert_eq!(fields.text(field::SHORT_NAME), Some("华夏北京保障房"));
        assert!(!fields.contains("基金类型"));
    }
}
