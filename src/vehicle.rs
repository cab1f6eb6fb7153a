//! Vehicle aggregate construction and display

use crate::core::field::{self, FieldValue, Fields};
use crate::core::sources::{DistributionSource, ProfileSource, QuoteSource};
use crate::metrics;
use crate::ui;
use anyhow::{Result, bail};
use chrono::Local;
use comfy_table::Cell;

/// Price floor below which the quote is treated as not yet available and
/// the distribution-yield step is skipped.
const MIN_QUOTED_PRICE: f64 = 0.1;

/// One fully built record per vehicle code. Independent and self-contained
/// after construction; nothing here mutates another vehicle's state.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub code: String,
    pub name: String,
    pub fields: Fields,
}

impl Vehicle {
    /// Renders the vehicle's name and fields as a styled table.
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);
        for (key, value) in self.fields.iter() {
            table.add_row(vec![Cell::new(key), Cell::new(value.display_text())]);
        }

        format!(
            "{}\n{}",
            ui::style_text(&self.name, ui::StyleType::Title),
            table
        )
    }
}

/// Builds the aggregate for one vehicle code.
///
/// The step order matters: the quote needs nothing from the profile, but
/// turnover reads the profile's asset scale plus the quote's volume, and
/// the yield step reads the profile's history link plus the quote's price.
/// Every step past the short-name check may contribute nothing.
pub async fn build(
    code: &str,
    profiles: &dyn ProfileSource,
    quotes: &dyn QuoteSource,
    distributions: &dyn DistributionSource,
) -> Result<Vehicle> {
    let mut fields = Fields::new();

    // 1. Descriptive profile. The short name is the minimum identity a
    //    consumer can rely on, so its absence fails the whole build.
    if let Some(profile) = profiles.fetch_profile(code).await? {
        fields.extend(profile);
    }
    let Some(name) = fields.text(field::SHORT_NAME).map(str::to_string) else {
        bail!("No short name found for {code}; profile page missing or incomplete");
    };

    // 2. Live quote.
    if let Some(quote) = quotes.fetch_quote(code).await? {
        fields.insert(field::CURRENT_PRICE, FieldValue::Number(quote.price));
        fields.insert(field::VOLUME, FieldValue::Text(quote.volume));
    }

    // 3. Turnover rate.
    let asset_scale = fields.display_text(field::ASSET_SCALE);
    let volume = fields.display_text(field::VOLUME);
    if let (Some(asset_scale), Some(volume)) = (asset_scale, volume)
        && let Some(rate) = metrics::turnover_rate(&asset_scale, &volume)
    {
        fields.insert(field::TURNOVER_RATE, FieldValue::Text(rate));
    }

    // 4. Distribution yield, skipped when the history link is missing or
    //    the vehicle has not started trading yet.
    let history_url = fields.link_url(field::DIVIDEND_HISTORY).map(str::to_string);
    let price = fields.number(field::CURRENT_PRICE);
    if let (Some(history_url), Some(price)) = (history_url, price)
        && price >= MIN_QUOTED_PRICE
        && let Some(table) = distributions.fetch_distributions(&history_url).await?
    {
        let today = Local::now().date_naive();
        let yields = metrics::distribution_yield(&table, price, today);

        fields.insert(
            field::CURRENT_YEAR_YIELD,
            FieldValue::Text(yields.current_year.rate),
        );
        fields.insert(
            field::CURRENT_YEAR_TOTAL,
            FieldValue::Number(yields.current_year.total),
        );
        fields.insert(
            field::CURRENT_YEAR_COUNT,
            FieldValue::Number(yields.current_year.count as f64),
        );
        fields.insert(
            field::LAST_YEAR_YIELD,
            FieldValue::Text(yields.last_year.rate),
        );
        fields.insert(
            field::LAST_YEAR_TOTAL,
            FieldValue::Number(yields.last_year.total),
        );
        fields.insert(
            field::LAST_YEAR_COUNT,
            FieldValue::Number(yields.last_year.count as f64),
        );
    }

    Ok(Vehicle {
        code: code.to_string(),
        name,
        fields,
    })
}
