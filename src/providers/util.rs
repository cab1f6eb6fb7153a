use anyhow::{Context, Result};
use scraper::ElementRef;
use std::time::Duration;

/// Builds the HTTP client a fetcher holds for its lifetime.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("reitwatch/0.2")
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Resolves an href found on `page_url` to an absolute URL.
///
/// Hrefs starting with `/` get the `https:` scheme prefixed; anything else
/// replaces the final path segment of `page_url`. Either input being empty
/// yields an empty string.
pub fn absolutize(page_url: &str, href: &str) -> String {
    if page_url.is_empty() || href.is_empty() {
        return String::new();
    }
    if href.starts_with('/') {
        return format!("https:{href}");
    }
    match page_url.rsplit_once('/') {
        Some((base, _)) => format!("{base}/{href}"),
        None => href.to_string(),
    }
}

/// Concatenated text content of an element, each text node trimmed.
pub fn element_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect()
}
