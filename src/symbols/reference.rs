// src/symbols/reference.rs

use crate::error::{BriefError, Result};
use crate::symbols::stock_symbol::TickerTable;
use csv::ReaderBuilder;
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const NAME_COLUMN: &str = "Name";
const TICKER_COLUMN: &str = "Ticker";

/// Reads a CSV whose header contains `Name` and `Ticker` columns.
///
/// Rows where either field is blank are skipped rather than rejected, and a
/// repeated name keeps the ticker from the last row that mentions it.
pub fn load_reference_table<R: Read>(reader: R) -> Result<TickerTable> {
    let mut csv = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| BriefError::Config(format!("Reference data has no '{}' column", name)))
    };
    let name_idx = column(NAME_COLUMN)?;
    let ticker_idx = column(TICKER_COLUMN)?;

    let mut table = TickerTable::new();
    let mut dropped = 0usize;

    for record in csv.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or("").trim();
        let ticker = record.get(ticker_idx).unwrap_or("").trim();

        if name.is_empty() || ticker.is_empty() {
            dropped += 1;
            debug!("Skipping incomplete reference row: {:?}", record);
            continue;
        }
        table.insert(name, ticker);
    }

    info!(
        "Reference ticker table loaded ({} names, {} incomplete rows dropped)",
        table.len(),
        dropped
    );
    Ok(table)
}

pub fn load_reference_table_from_path(path: &Path) -> Result<TickerTable> {
    let file = File::open(path).map_err(|e| {
        BriefError::Config(format!(
            "Cannot open reference data {}: {}",
            path.display(),
            e
        ))
    })?;
    load_reference_table(file)
}
