//! Per-year summary of the canonical series.

use serde::{Deserialize, Serialize};

/// Statistics for one calendar year, derived positionally from that year's
/// date-ordered rows. Percent fields are rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyMetrics {
    pub year: i32,
    /// Close of the first trading day.
    pub start_close: f64,
    /// Close of the last trading day.
    pub end_close: f64,
    pub high: f64,
    pub low: f64,
    pub return_pct: f64,
    pub points_change: f64,
    pub high_low_pct: f64,
    pub high_low_points: f64,
    pub start_low_points: f64,
    pub start_low_pct: f64,
    pub start_high_points: f64,
    pub start_high_pct: f64,
    /// Always equal to `return_pct`; kept as its own output column.
    pub start_end_pct: f64,
    /// Close of the row at index `n / 2` relative to the start close.
    pub start_mid_pct: f64,
}
