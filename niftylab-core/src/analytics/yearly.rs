//! Yearly aggregation: one sorted, grouped pass over the canonical series.
//!
//! Start, end and mid rows are selected by position within a year, so the
//! ascending-date order is checked again here before anything is grouped.

use crate::domain::{check_ascending, CanonicalRow, CanonicalSeries, SeriesError, YearlyMetrics};
use crate::numeric::round2;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("cannot aggregate: row {index} ({current}) does not follow {previous}")]
    UnsortedSeries {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

impl From<SeriesError> for AggregateError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::NotAscending {
                index,
                previous,
                current,
            } => Self::UnsortedSeries {
                index,
                previous,
                current,
            },
        }
    }
}

/// A year left out of the report, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSkipped {
    pub year: i32,
    pub reason: String,
}

/// Yearly metrics in ascending year order plus any isolated per-year failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearlyReport {
    pub metrics: Vec<YearlyMetrics>,
    pub skipped: Vec<YearSkipped>,
}

impl YearlyReport {
    pub fn get(&self, year: i32) -> Option<&YearlyMetrics> {
        self.metrics.iter().find(|m| m.year == year)
    }
}

/// Compute [`YearlyMetrics`] for every calendar year present in `series`.
///
/// A year whose statistics come out non-finite (zero start close or zero
/// low) is recorded in [`YearlyReport::skipped`] and the other years are
/// still produced.
pub fn aggregate_yearly(series: &CanonicalSeries) -> Result<YearlyReport, AggregateError> {
    let rows = series.rows();
    check_ascending(rows)?;

    let mut report = YearlyReport::default();
    for group in rows.chunk_by(|a, b| a.date().year() == b.date().year()) {
        let year = group[0].date().year();
        match year_metrics(year, group) {
            Ok(metrics) => report.metrics.push(metrics),
            Err(reason) => {
                tracing::warn!(year, %reason, "skipping year");
                report.skipped.push(YearSkipped { year, reason });
            }
        }
    }

    tracing::debug!(
        years = report.metrics.len(),
        skipped = report.skipped.len(),
        "yearly aggregation complete"
    );
    Ok(report)
}

fn pct_of(delta: f64, base: f64) -> f64 {
    delta / base * 100.0
}

/// Metrics for one year's rows. `rows` is non-empty and ascending.
fn year_metrics(year: i32, rows: &[CanonicalRow]) -> Result<YearlyMetrics, String> {
    let n = rows.len();
    let start_close = rows[0].bar.close;
    let end_close = rows[n - 1].bar.close;
    let mid_close = rows[n / 2].bar.close;
    let high = rows
        .iter()
        .map(|r| r.bar.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let low = rows.iter().map(|r| r.bar.low).fold(f64::INFINITY, f64::min);

    let return_pct = round2(pct_of(end_close - start_close, start_close));
    let metrics = YearlyMetrics {
        year,
        start_close,
        end_close,
        high,
        low,
        return_pct,
        points_change: round2(end_close - start_close),
        high_low_pct: round2(pct_of(high - low, low)),
        high_low_points: round2(high - low),
        start_low_points: round2(low - start_close),
        start_low_pct: round2(pct_of(low - start_close, start_close)),
        start_high_points: round2(high - start_close),
        start_high_pct: round2(pct_of(high - start_close, start_close)),
        start_end_pct: return_pct,
        start_mid_pct: round2(pct_of(mid_close - start_close, start_close)),
    };

    let derived = [
        ("return_pct", metrics.return_pct),
        ("high_low_pct", metrics.high_low_pct),
        ("start_low_pct", metrics.start_low_pct),
        ("start_high_pct", metrics.start_high_pct),
        ("start_mid_pct", metrics.start_mid_pct),
    ];
    match derived.iter().find(|(_, v)| !v.is_finite()) {
        Some((field, value)) => Err(format!("{field} is {value} over {n} rows")),
        None => Ok(metrics),
    }
}
