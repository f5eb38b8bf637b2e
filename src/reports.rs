//! # Reports Module
//!
//! Read-only aggregations over ledger rows: last record, monthly total and
//! overall statistics. Rows are scanned linearly; a malformed cell only drops
//! that cell's contribution, never the whole report.

use chrono::{Duration, NaiveDateTime};

use crate::fuel::{round2, RoadCategory};
use crate::ledger::{
    column, data_rows, parse_decimal, parse_integer, LedgerRecord, Row, LEDGER_COLUMNS,
    TIMESTAMP_FORMAT,
};

/// Width of the textual share bar
pub const BAR_WIDTH: usize = 10;

/// The last ledger row, parsed when possible
#[derive(Debug, Clone, PartialEq)]
pub enum LastRecord {
    Record(LedgerRecord),
    /// Cells as stored, padded to the full row width
    Unparsed(Row),
}

pub fn last_record(rows: &[Row]) -> Option<LastRecord> {
    let last = data_rows(rows).last()?;
    Some(match LedgerRecord::parse(last) {
        Some(record) => LastRecord::Record(record),
        None => {
            let mut cells = last.clone();
            cells.resize(LEDGER_COLUMNS, String::new());
            LastRecord::Unparsed(cells)
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    /// `YYYY-MM`
    pub month: String,
    pub records: usize,
    pub total_liters: f64,
}

/// Sum of the rounded total liters over rows recorded in the month of `now`
pub fn monthly_report(rows: &[Row], now: NaiveDateTime) -> MonthlyReport {
    let month = now.format("%Y-%m").to_string();
    let mut records = 0;
    let mut total = 0.0;

    for row in data_rows(rows) {
        let in_month = row
            .get(column::RECORDED_AT)
            .is_some_and(|cell| cell.starts_with(&month));
        if !in_month {
            continue;
        }
        if let Some(liters) = cell_decimal(row, column::TOTAL_ROUNDED) {
            total += liters;
            records += 1;
        }
    }

    MonthlyReport {
        month,
        records,
        total_liters: round2(total),
    }
}

/// Distance and fuel of one road category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStats {
    pub category: RoadCategory,
    pub km: u64,
    pub liters: f64,
    /// Share of the total distance, 0..=100
    pub share_percent: f64,
}

impl CategoryStats {
    pub fn bar(&self) -> String {
        share_bar(self.share_percent, BAR_WIDTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodTotals {
    pub records: usize,
    pub km: u64,
    pub liters: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub records: usize,
    pub total_km: u64,
    pub total_liters: f64,
    /// Liters per 100 km over the whole ledger, when any distance is recorded
    pub average_per_100km: Option<f64>,
    pub categories: Vec<CategoryStats>,
    pub last_7_days: PeriodTotals,
}

fn cell_decimal(row: &Row, index: usize) -> Option<f64> {
    row.get(index).and_then(|cell| parse_decimal(cell))
}

fn cell_integer(row: &Row, index: usize) -> u64 {
    row.get(index)
        .and_then(|cell| parse_integer(cell))
        .map(u64::from)
        .unwrap_or(0)
}

fn category_columns(category: RoadCategory) -> (usize, usize) {
    match category {
        RoadCategory::City => (column::CITY_KM, column::CITY_EXACT),
        RoadCategory::District => (column::DISTRICT_KM, column::DISTRICT_EXACT),
        RoadCategory::Highway => (column::HIGHWAY_KM, column::HIGHWAY_EXACT),
    }
}

/// Aggregate every trip in the ledger. The 7-day window ends at `now`.
pub fn statistics(rows: &[Row], now: NaiveDateTime) -> Statistics {
    let data = data_rows(rows);
    let window_start = now - Duration::days(7);

    let mut total_km = 0u64;
    let mut total_liters = 0.0;
    let mut per_category = [(0u64, 0.0f64); 3];
    let mut last_7_days = PeriodTotals::default();

    for row in data {
        let km = cell_integer(row, column::DIFF);
        let liters = cell_decimal(row, column::TOTAL_EXACT).unwrap_or(0.0);
        total_km += km;
        total_liters += liters;

        for (i, category) in RoadCategory::ALL.iter().enumerate() {
            let (km_col, liters_col) = category_columns(*category);
            per_category[i].0 += cell_integer(row, km_col);
            per_category[i].1 += cell_decimal(row, liters_col).unwrap_or(0.0);
        }

        let recorded_at = row
            .get(column::RECORDED_AT)
            .and_then(|cell| NaiveDateTime::parse_from_str(cell.trim(), TIMESTAMP_FORMAT).ok());
        if let Some(at) = recorded_at {
            if at >= window_start && at <= now {
                last_7_days.records += 1;
                last_7_days.km += km;
                last_7_days.liters += liters;
            }
        }
    }

    let category_km_total: u64 = per_category.iter().map(|(km, _)| km).sum();
    let categories = RoadCategory::ALL
        .iter()
        .zip(per_category.iter())
        .map(|(category, (km, liters))| CategoryStats {
            category: *category,
            km: *km,
            liters: round2(*liters),
            share_percent: if category_km_total == 0 {
                0.0
            } else {
                *km as f64 * 100.0 / category_km_total as f64
            },
        })
        .collect();

    last_7_days.liters = round2(last_7_days.liters);

    Statistics {
        records: data.len(),
        total_km,
        total_liters: round2(total_liters),
        average_per_100km: (total_km > 0).then(|| round2(total_liters * 100.0 / total_km as f64)),
        categories,
        last_7_days,
    }
}

/// Text bar like `███░░░░░░░` for a percentage
pub fn share_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
