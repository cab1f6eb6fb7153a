//! Batch builds and the tabular export

use crate::core::field;
use crate::core::sources::{DistributionSource, ProfileSource, QuoteSource};
use crate::ui;
use crate::vehicle::{self, Vehicle};
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::error;

/// Column order of the exported report.
const REPORT_COLUMNS: [&str; 7] = [
    field::SHORT_NAME,
    field::FUND_CODE,
    field::ISSUE_DATE,
    field::ASSET_SCALE,
    field::DIVIDEND_HISTORY,
    field::CURRENT_YEAR_TOTAL,
    field::LAST_YEAR_TOTAL,
];

/// Builds every requested vehicle, skipping the ones that fail so one bad
/// code does not abort the batch.
pub async fn build_all(
    codes: &[String],
    profiles: &dyn ProfileSource,
    quotes: &dyn QuoteSource,
    distributions: &dyn DistributionSource,
) -> Vec<Vehicle> {
    let pb = ui::new_progress_bar(codes.len() as u64, true);
    pb.set_message("Building vehicles...");

    let builds = codes.iter().map(|code| {
        let pb = pb.clone();
        async move {
            let built = vehicle::build(code, profiles, quotes, distributions).await;
            pb.inc(1);
            (code, built)
        }
    });

    let mut vehicles = Vec::new();
    for (code, built) in futures::future::join_all(builds).await {
        match built {
            Ok(vehicle) => vehicles.push(vehicle),
            Err(e) => {
                let message = format!("{code} skipped: {e}");
                eprintln!("{}", ui::style_text(&message, ui::StyleType::Error));
                error!("Failed to build vehicle {}: {}", code, e);
            }
        }
    }
    pb.finish_and_clear();
    vehicles
}

/// Default export path, stamped with today's date.
pub fn default_report_path() -> PathBuf {
    PathBuf::from(format!(
        "reits基本信息-{}.csv",
        Local::now().format("%Y-%m-%d")
    ))
}

/// Writes the batch report. The file starts with a UTF-8 BOM so
/// spreadsheet apps keep the non-ASCII columns intact.
pub fn write_csv(vehicles: &[Vehicle], path: &Path) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    file.write_all("\u{feff}".as_bytes())
        .context("Failed to write report BOM")?;

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(REPORT_COLUMNS)
        .context("Failed to write report header")?;

    for vehicle in vehicles {
        writer
            .write_record(&report_row(vehicle))
            .with_context(|| format!("Failed to write report row for {}", vehicle.code))?;
    }

    writer.flush().context("Failed to flush report")?;
    Ok(())
}

fn report_row(vehicle: &Vehicle) -> [String; 7] {
    [
        vehicle.name.clone(),
        vehicle.code.clone(),
        display_or_empty(vehicle, field::ISSUE_DATE),
        display_or_empty(vehicle, field::ASSET_SCALE),
        display_or_empty(vehicle, field::DIVIDEND_HISTORY),
        current_year_summary(vehicle).unwrap_or_default(),
        last_year_summary(vehicle).unwrap_or_default(),
    ]
}

fn display_or_empty(vehicle: &Vehicle, key: &str) -> String {
    vehicle.fields.display_text(key).unwrap_or_default()
}

fn current_year_summary(vehicle: &Vehicle) -> Option<String> {
    let total = vehicle.fields.number(field::CURRENT_YEAR_TOTAL)?;
    let count = vehicle.fields.number(field::CURRENT_YEAR_COUNT)?;
    let rate = vehicle.fields.text(field::CURRENT_YEAR_YIELD)?;
    Some(format!("{total}元 ( 今年分红{count}次, 分红率为{rate} ) "))
}

fn last_year_summary(vehicle: &Vehicle) -> Option<String> {
    let total = vehicle.fields.number(field::LAST_YEAR_TOTAL)?;
    let count = vehicle.fields.number(field::LAST_YEAR_COUNT)?;
    let rate = vehicle.fields.text(field::LAST_YEAR_YIELD)?;
    Some(format!(
        "{total}元 ( 去年分红{count}次，当前价格预计分红率为{rate} ) "
    ))
}
