//! Bars: one calendar date of index prices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a raw record before merge.
///
/// Only used to resolve date precedence; it never reaches the published files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    Archive,
    Live,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Archive => write!(f, "archive"),
            SourceTag::Live => write!(f, "live"),
        }
    }
}

/// A normalized record as produced by the source normalizer.
///
/// Prices are already rounded to 2 decimals. A `None` price means the cell was
/// present but not numeric; such rows survive until the merger's coercion
/// step so that they still take part in date precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBar {
    pub source: SourceTag,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl SourceBar {
    /// Convert into a [`DailyBar`] if all four prices are numeric.
    pub fn coerce(&self) -> Option<DailyBar> {
        Some(DailyBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume,
        })
    }
}

/// One calendar date's trading record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Present only when the contributing source supplies it.
    pub volume: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_bar() -> SourceBar {
        SourceBar {
            source: SourceTag::Archive,
            date: NaiveDate::from_ymd_opt(2007, 9, 10).unwrap(),
            open: Some(4400.0),
            high: Some(4450.5),
            low: Some(4380.25),
            close: Some(4420.1),
            volume: None,
        }
    }

    #[test]
    fn coerce_keeps_numeric_rows() {
        let bar = source_bar().coerce().unwrap();
        assert_eq!(bar.close, 4420.1);
        assert_eq!(bar.volume, None);
    }

    #[test]
    fn coerce_rejects_any_missing_price() {
        let mut bar = source_bar();
        bar.low = None;
        assert!(bar.coerce().is_none());
    }

    #[test]
    fn source_tag_display() {
        assert_eq!(SourceTag::Archive.to_string(), "archive");
        assert_eq!(SourceTag::Live.to_string(), "live");
    }
}
