pub mod config;
pub mod core;
pub mod metrics;
pub mod providers;
pub mod report;
pub mod ui;
pub mod vehicle;

use crate::providers::dividends::DividendExtractor;
use crate::providers::listing::MarketIdResolver;
use crate::providers::profile::ProfileExtractor;
use crate::providers::quote::QuoteFetcher;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Display each vehicle's fields as a terminal table.
    Show,
    /// Export the batch report as CSV.
    Report { output: Option<String> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("REITs tracker starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let timeout = config.timeout();
    let resolver = Arc::new(MarketIdResolver::new(
        &config.endpoints.listing_base_url,
        timeout,
    )?);
    let profiles = ProfileExtractor::new(&config.endpoints.fund_base_url, timeout)?;
    let quotes = QuoteFetcher::new(
        &config.endpoints.quote_base_url,
        timeout,
        Arc::clone(&resolver),
    )?;
    let dividends = DividendExtractor::new(timeout)?;

    // An empty configured list falls back to every listed code.
    let codes = if config.codes.is_empty() {
        let mut codes: Vec<String> = resolver.resolve_all().await?.keys().cloned().collect();
        codes.sort();
        codes
    } else {
        config.codes.clone()
    };
    debug!("Building {} vehicles", codes.len());

    let vehicles = report::build_all(&codes, &profiles, &quotes, &dividends).await;

    match command {
        AppCommand::Show => {
            let count = vehicles.len();
            for (i, vehicle) in vehicles.iter().enumerate() {
                println!("{}", vehicle.display_as_table());
                if i < count - 1 {
                    ui::print_separator();
                }
            }
        }
        AppCommand::Report { output } => {
            let path = output
                .map(PathBuf::from)
                .unwrap_or_else(report::default_report_path);
            report::write_csv(&vehicles, &path)?;
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}
