//! Canonical series: the deduplicated, date-ordered daily series.

use super::bar::DailyBar;
use crate::numeric::round2;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A daily bar plus its derived metrics and the joined volatility value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub bar: DailyBar,
    /// `round(close - open, 2)`
    pub point_change: f64,
    /// `round(point_change / open * 100, 2)`
    pub percent_change: f64,
    /// `None` is the missing-value marker; never substituted with zero.
    pub volatility: Option<f64>,
}

impl CanonicalRow {
    /// Derive the per-row metrics for a bar.
    ///
    /// Returns `None` when the derived values are not finite (zero open),
    /// which callers treat the same as a failed numeric coercion.
    pub fn derive(bar: DailyBar) -> Option<Self> {
        let point_change = round2(bar.close - bar.open);
        let percent_change = round2(point_change / bar.open * 100.0);
        if !point_change.is_finite() || !percent_change.is_finite() {
            return None;
        }
        Some(Self {
            bar,
            point_change,
            percent_change,
            volatility: None,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series not strictly ascending at row {index}: {previous} followed by {current}")]
    NotAscending {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Strictly ascending, unique-date sequence of [`CanonicalRow`]s.
///
/// The rows are private so the ordering invariant can only be established
/// through [`CanonicalSeries::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSeries {
    rows: Vec<CanonicalRow>,
    has_volume: bool,
}

impl CanonicalSeries {
    /// Build a series, rejecting any out-of-order or repeated date.
    ///
    /// `has_volume` records whether a contributing source carried a volume
    /// column; it decides whether the published file has a `Volume` column.
    pub fn new(rows: Vec<CanonicalRow>, has_volume: bool) -> Result<Self, SeriesError> {
        check_ascending(&rows)?;
        Ok(Self { rows, has_volume })
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_volume(&self) -> bool {
        self.has_volume
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(CanonicalRow::date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(CanonicalRow::date)
    }

    /// Number of rows with a joined volatility value.
    pub fn volatility_coverage(&self) -> usize {
        self.rows.iter().filter(|r| r.volatility.is_some()).count()
    }

    /// Look up a row by date (binary search over the ordered rows).
    pub fn get(&self, date: NaiveDate) -> Option<&CanonicalRow> {
        self.rows
            .binary_search_by_key(&date, CanonicalRow::date)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Produce a new series with each row's volatility replaced by `lookup`.
    ///
    /// Dates are untouched, so the ordering invariant carries over.
    pub fn with_volatility<F>(&self, mut lookup: F) -> Self
    where
        F: FnMut(NaiveDate) -> Option<f64>,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| CanonicalRow {
                volatility: lookup(row.date()),
                ..row.clone()
            })
            .collect();
        Self {
            rows,
            has_volume: self.has_volume,
        }
    }
}

/// Verify that dates are strictly ascending (which also implies uniqueness).
pub fn check_ascending(rows: &[CanonicalRow]) -> Result<(), SeriesError> {
    for (index, pair) in rows.windows(2).enumerate() {
        if pair[1].date() <= pair[0].date() {
            return Err(SeriesError::NotAscending {
                index: index + 1,
                previous: pair[0].date(),
                current: pair[1].date(),
            });
        }
    }
    Ok(())
}
