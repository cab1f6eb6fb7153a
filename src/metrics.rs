//! Derived metric calculators
//!
//! Both calculators are best-effort pure functions over the loosely
//! structured fields the extractors produce; a missing prerequisite omits
//! the metric instead of failing the vehicle.

use crate::core::sources::DistributionTable;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Total outstanding units inside the asset-scale description,
/// e.g. "12.00亿元，份额规模1000.00万份".
static TOTAL_UNITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"份额规模(\d+\.\d+)").expect("Failed to compile total units regex"));

/// Leading decimal in the formatted volume string, e.g. "5.00万".
static TRADED_UNITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.\d+").expect("Failed to compile traded units regex"));

/// Traded units over total outstanding units, as a two-decimal percentage.
///
/// Returns `None` when either number cannot be extracted from its string.
pub fn turnover_rate(asset_scale: &str, volume: &str) -> Option<String> {
    let total: f64 = TOTAL_UNITS
        .captures(asset_scale)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let traded: f64 = TRADED_UNITS.find(volume)?.as_str().parse().ok()?;
    Some(format!("{:.2}%", traded / total * 100.0))
}

/// One calendar year's distribution summary.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    /// Sum over current price, formatted as a two-decimal percentage.
    pub rate: String,
    /// Sum of per-unit amounts.
    pub total: f64,
    /// Number of distribution events.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionYield {
    pub current_year: YearSummary,
    pub last_year: YearSummary,
}

/// Partitions the distribution table into this year and last year relative
/// to `today` and yields each year's sum over `price`.
///
/// The prior-year figure is an estimate against the current price, not the
/// price at the time. Dates that do not parse as `YYYY-MM-DD` are skipped.
pub fn distribution_yield(
    table: &DistributionTable,
    price: f64,
    today: NaiveDate,
) -> DistributionYield {
    let mut current = (0.0, 0usize);
    let mut last = (0.0, 0usize);

    for (date, record) in table {
        let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            continue;
        };
        if parsed.year() == today.year() {
            current.0 += record.per_unit;
            current.1 += 1;
        } else if parsed.year() == today.year() - 1 {
            last.0 += record.per_unit;
            last.1 += 1;
        }
    }

    DistributionYield {
        current_year: summarize(current, price),
        last_year: summarize(last, price),
    }
}

fn summarize((total, count): (f64, usize), price: f64) -> YearSummary {
    YearSummary {
        rate: format!("{:.2}%", total * 100.0 / price),
        total,
        count,
    }
}
