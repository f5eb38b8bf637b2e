//! # Ledger Module
//!
//! The append-only trip ledger: one spreadsheet tab, one row per trip, columns
//! A through N. This module defines the storage contract ([`Ledger`]), the row
//! layout ([`LedgerRecord`]) and the operations built on top of the raw
//! contract (append with formatting, guarded delete, last odometer).
//!
//! Submodules:
//! - `sheets`: Google Sheets implementation
//! - `memory`: in-process implementation used by tests and dry runs
//! - `cache`: short-lived read cache wrapped around any ledger

pub mod cache;
pub mod memory;
pub mod sheets;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{info, warn};
use thiserror::Error;

use crate::fuel::{Consumption, Distribution, Liters};
use crate::trip::Trip;

pub use cache::CachedLedger;
pub use memory::MemoryLedger;
pub use sheets::SheetsLedger;

/// Number of columns in a ledger row (A..N)
pub const LEDGER_COLUMNS: usize = 14;

/// Timestamp layout of column A
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column indexes, zero based
pub mod column {
    pub const RECORDED_AT: usize = 0;
    pub const ODOMETER: usize = 1;
    pub const DIFF: usize = 2;
    pub const CITY_KM: usize = 3;
    pub const CITY_EXACT: usize = 4;
    pub const CITY_ROUNDED: usize = 5;
    pub const DISTRICT_KM: usize = 6;
    pub const DISTRICT_EXACT: usize = 7;
    pub const DISTRICT_ROUNDED: usize = 8;
    pub const HIGHWAY_KM: usize = 9;
    pub const HIGHWAY_EXACT: usize = 10;
    pub const HIGHWAY_ROUNDED: usize = 11;
    pub const TOTAL_EXACT: usize = 12;
    pub const TOTAL_ROUNDED: usize = 13;
}

/// Cells of one spreadsheet row, as strings
pub type Row = Vec<String>;

/// Errors surfaced by ledger backends
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("spreadsheet API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid service account key: {0}")]
    Credentials(String),
    #[error("row {0} does not exist")]
    RowOutOfRange(usize),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

/// Raw storage contract of the ledger. Row numbers are 1-based, as in the
/// spreadsheet UI.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// All rows in order, including a header row if the sheet has one
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError>;

    /// Write a new row after the last one
    async fn append_row(&self, row: Row) -> Result<(), LedgerError>;

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError>;

    /// Center alignment and solid borders on columns A..N of one row
    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError>;
}

/// One trip as stored in the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    pub recorded_at: String,
    pub odometer: u32,
    pub diff: u32,
    pub distribution: Distribution,
    pub consumption: Consumption,
}

impl LedgerRecord {
    pub fn from_trip(trip: &Trip, recorded_at: impl Into<String>) -> Self {
        Self {
            recorded_at: recorded_at.into(),
            odometer: trip.odometer,
            diff: trip.diff,
            distribution: trip.distribution,
            consumption: trip.consumption,
        }
    }

    /// Cells A..N. Exact liters keep 4 decimals, rounded liters 2, with a dot
    /// as decimal separator.
    pub fn to_row(&self) -> Row {
        let d = &self.distribution;
        let c = &self.consumption;
        vec![
            self.recorded_at.clone(),
            self.odometer.to_string(),
            self.diff.to_string(),
            d.city.to_string(),
            format!("{:.4}", c.city.exact),
            format!("{:.2}", c.city.rounded),
            d.district.to_string(),
            format!("{:.4}", c.district.exact),
            format!("{:.2}", c.district.rounded),
            d.highway.to_string(),
            format!("{:.4}", c.highway.exact),
            format!("{:.2}", c.highway.rounded),
            format!("{:.4}", c.total.exact),
            format!("{:.2}", c.total.rounded),
        ]
    }

    /// Parse a stored row; `None` when any cell is missing or malformed
    pub fn parse(row: &[String]) -> Option<Self> {
        if row.len() < LEDGER_COLUMNS {
            return None;
        }
        let int = |i: usize| parse_integer(&row[i]);
        let dec = |i: usize| parse_decimal(&row[i]);
        let liters = |exact: usize, rounded: usize| -> Option<Liters> {
            Some(Liters {
                exact: dec(exact)?,
                rounded: dec(rounded)?,
            })
        };

        Some(Self {
            recorded_at: row[column::RECORDED_AT].clone(),
            odometer: int(column::ODOMETER)?,
            diff: int(column::DIFF)?,
            distribution: Distribution::new(
                int(column::CITY_KM)?,
                int(column::DISTRICT_KM)?,
                int(column::HIGHWAY_KM)?,
            ),
            consumption: Consumption {
                city: liters(column::CITY_EXACT, column::CITY_ROUNDED)?,
                district: liters(column::DISTRICT_EXACT, column::DISTRICT_ROUNDED)?,
                highway: liters(column::HIGHWAY_EXACT, column::HIGHWAY_ROUNDED)?,
                total: liters(column::TOTAL_EXACT, column::TOTAL_ROUNDED)?,
            },
        })
    }
}

/// Parse a numeric cell, accepting both `.` and `,` as decimal separator
pub fn parse_decimal(cell: &str) -> Option<f64> {
    let normalized: String = cell
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a whole-number cell; decimal values are truncated
pub fn parse_integer(cell: &str) -> Option<u32> {
    let value = parse_decimal(cell)?;
    if value < 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as u32)
}

/// Number of header rows at the top of the sheet (0 or 1). The first row is a
/// header when its odometer cell is not numeric and its date cell is not a
/// timestamp; a trip row with a damaged odometer stays a data row.
pub fn header_rows(rows: &[Row]) -> usize {
    match rows.first() {
        Some(first) => {
            let cell = |index: usize| first.get(index).map(|c| c.trim()).unwrap_or("");
            let numeric_odometer = parse_integer(cell(column::ODOMETER)).is_some();
            let timestamped =
                NaiveDateTime::parse_from_str(cell(column::RECORDED_AT), TIMESTAMP_FORMAT).is_ok();
            usize::from(!numeric_odometer && !timestamped)
        }
        None => 0,
    }
}

/// Rows that hold trips
pub fn data_rows(rows: &[Row]) -> &[Row] {
    &rows[header_rows(rows)..]
}

/// Odometer of the last trip, if any
pub fn last_odometer(rows: &[Row]) -> Option<u32> {
    let last = data_rows(rows).last()?;
    let odometer = last.get(column::ODOMETER).and_then(|cell| parse_integer(cell));
    if odometer.is_none() {
        warn!("Last ledger row has no readable odometer: {:?}", last);
    }
    odometer
}

/// Append a record and format the row it landed in. The row number is taken
/// from a fresh read after the append. Once the append succeeded the record
/// counts as stored: a failed re-read or format is only logged, and the row
/// number is `None` when it could not be determined.
pub async fn append_record(
    ledger: &dyn Ledger,
    record: &LedgerRecord,
) -> Result<Option<usize>, LedgerError> {
    ledger.append_row(record.to_row()).await?;

    let row_number = match ledger.read_rows().await {
        Ok(rows) => rows.len(),
        Err(e) => {
            warn!(
                "Appended odometer {} but could not re-read the ledger, row left unformatted: {}",
                record.odometer, e
            );
            return Ok(None);
        }
    };
    info!("Appended ledger row {} (odometer {})", row_number, record.odometer);

    if let Err(e) = ledger.format_row(row_number).await {
        warn!("Failed to format ledger row {}: {}", row_number, e);
    }

    Ok(Some(row_number))
}

/// Delete the last trip. Returns `false` when the ledger has no trips; a
/// header row is never deleted.
pub async fn delete_last_record(ledger: &dyn Ledger) -> Result<bool, LedgerError> {
    let rows = ledger.read_rows().await?;
    if rows.len() <= header_rows(&rows) {
        info!("Nothing to delete, ledger has no data rows");
        return Ok(false);
    }

    ledger.delete_row(rows.len()).await?;
    info!("Deleted ledger row {}", rows.len());
    Ok(true)
}
