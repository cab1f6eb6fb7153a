//! Field model for scraped and derived vehicle data

use std::collections::BTreeMap;

/// Headers of the canonical profile-table fields on the fund overview page.
pub const FULL_NAME: &str = "基金全称";
pub const SHORT_NAME: &str = "基金简称";
pub const FUND_CODE: &str = "基金代码";
pub const ISSUE_DATE: &str = "发行日期";
pub const ASSET_SCALE: &str = "资产规模";
pub const DIVIDEND_HISTORY: &str = "成立来分红";

/// Subset of profile headers retained during extraction.
pub const PROFILE_KEYS: [&str; 6] = [
    FULL_NAME,
    SHORT_NAME,
    FUND_CODE,
    ISSUE_DATE,
    ASSET_SCALE,
    DIVIDEND_HISTORY,
];

/// Keys for fields derived after extraction.
pub const CURRENT_PRICE: &str = "当前价格";
pub const VOLUME: &str = "成交量";
pub const TURNOVER_RATE: &str = "换手率";
pub const CURRENT_YEAR_YIELD: &str = "今年分红率";
pub const CURRENT_YEAR_TOTAL: &str = "今年分红";
pub const CURRENT_YEAR_COUNT: &str = "今年分红次数";
pub const LAST_YEAR_YIELD: &str = "去年分红率";
pub const LAST_YEAR_TOTAL: &str = "去年分红";
pub const LAST_YEAR_COUNT: &str = "去年分红次数";

/// A single scraped or derived value.
///
/// Table cells produce `Text`, cells wrapping an anchor produce `Link` with
/// the href resolved to an absolute URL, and computed quantities are stored
/// as `Number`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Link { text: String, url: String },
}

impl FieldValue {
    /// Text shown for this value in tables and reports.
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Link { text, .. } => text.clone(),
        }
    }
}

/// String-keyed collection of field values for one vehicle.
///
/// Presence of any key is never guaranteed; consumers check before use via
/// the typed accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: BTreeMap<String, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.values.insert(key.into(), value);
    }

    /// Merges `other` into this map, overwriting existing keys.
    pub fn extend(&mut self, other: Fields) {
        self.values.extend(other.values);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The value for `key` if it is plain text.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The value for `key` if it is numeric.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(FieldValue::Number(number)) => Some(*number),
            _ => None,
        }
    }

    /// The target URL for `key` if it is a link.
    pub fn link_url(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Link { url, .. }) => Some(url),
            _ => None,
        }
    }

    /// Display text for `key`, whatever its shape.
    pub fn display_text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(FieldValue::display_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
