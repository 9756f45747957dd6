//! Source normalizer: maps a raw table's layout onto [`SourceBar`]s.

use super::dates::parse_calendar_date;
use super::schema::{ColumnMap, SchemaError};
use super::table::RawTable;
use crate::domain::{SourceBar, SourceTag};
use crate::numeric::{parse_number, round2};
use chrono::NaiveDate;

/// The normalized records of one source, in the source's own row order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSource {
    pub tag: SourceTag,
    pub bars: Vec<SourceBar>,
    /// Whether the raw table carried a volume column at all.
    pub has_volume: bool,
    /// Rows dropped because their date cell could not be parsed.
    pub unparseable_dates: usize,
}

impl NormalizedSource {
    /// Keep only rows strictly before `cutover`.
    ///
    /// Applied to the archive: from the cut-over date on, the live feed is
    /// the authoritative source.
    pub fn clip_before(self, cutover: NaiveDate) -> Self {
        let before = self.bars.len();
        let bars: Vec<SourceBar> = self
            .bars
            .into_iter()
            .filter(|b| b.date < cutover)
            .collect();
        tracing::debug!(
            source = %self.tag,
            %cutover,
            clipped = before - bars.len(),
            "clipped rows on or after cut-over"
        );
        Self { bars, ..self }
    }
}

/// Normalize one raw table.
///
/// Fails only when a required column is missing. Unparseable dates drop the
/// row; unparseable prices are kept as `None` for the merger to coerce.
pub fn normalize(table: &RawTable, tag: SourceTag) -> Result<NormalizedSource, SchemaError> {
    let columns = ColumnMap::resolve(table, tag)?;
    let mut bars = Vec::with_capacity(table.len());
    let mut unparseable_dates = 0;

    for row in 0..table.len() {
        let Some(date) = parse_calendar_date(table.cell(row, columns.date)) else {
            unparseable_dates += 1;
            continue;
        };
        let price = |col: usize| parse_number(table.cell(row, col)).map(round2);

        bars.push(SourceBar {
            source: tag,
            date,
            open: price(columns.open),
            high: price(columns.high),
            low: price(columns.low),
            close: price(columns.close),
            volume: columns
                .volume
                .and_then(|col| parse_number(table.cell(row, col)))
                .filter(|v| *v >= 0.0)
                .map(|v| v.round() as u64),
        });
    }

    if unparseable_dates > 0 {
        tracing::warn!(source = %tag, rows = unparseable_dates, "dropped rows with unparseable dates");
    }
    tracing::info!(source = %tag, rows = bars.len(), volume = columns.volume.is_some(), "normalized source");

    Ok(NormalizedSource {
        tag,
        bars,
        has_volume: columns.volume.is_some(),
        unparseable_dates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn normalizes_archive_without_volume() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close"],
            &[&["2007-09-10", "4400.123", "4450.5", "4380.255", "4420.1"]],
        );
        let out = normalize(&table, SourceTag::Archive).unwrap();
        assert!(!out.has_volume);
        assert_eq!(out.bars.len(), 1);
        let bar = &out.bars[0];
        assert_eq!(bar.date, date("2007-09-10"));
        assert_eq!(bar.open, Some(4400.12));
        assert_eq!(bar.volume, None);
        assert_eq!(bar.source, SourceTag::Archive);
    }

    #[test]
    fn keeps_volume_when_present() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close", "Volume"],
            &[&["2007-09-17 00:00:00+05:30", "1", "2", "0.5", "1.5", "250400.0"]],
        );
        let out = normalize(&table, SourceTag::Live).unwrap();
        assert!(out.has_volume);
        assert_eq!(out.bars[0].volume, Some(250_400));
        assert_eq!(out.bars[0].date, date("2007-09-17"));
    }

    #[test]
    fn non_numeric_price_is_kept_as_none() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close"],
            &[&["2007-09-10", "-", "2", "1", "1.5"]],
        );
        let out = normalize(&table, SourceTag::Archive).unwrap();
        assert_eq!(out.bars.len(), 1);
        assert_eq!(out.bars[0].open, None);
    }

    #[test]
    fn unparseable_date_drops_row() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close"],
            &[&["n/a", "1", "2", "1", "1.5"], &["2007-09-11", "1", "2", "1", "1.5"]],
        );
        let out = normalize(&table, SourceTag::Archive).unwrap();
        assert_eq!(out.bars.len(), 1);
        assert_eq!(out.unparseable_dates, 1);
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let table = RawTable::from_rows(&["Date", "Open", "High", "Low"], &[]);
        assert!(matches!(
            normalize(&table, SourceTag::Archive),
            Err(SchemaError::MissingColumn { .. })
        ));
    }

    #[test]
    fn clip_before_is_strict() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close"],
            &[
                &["2007-09-14", "1", "2", "1", "1.5"],
                &["2007-09-17", "1", "2", "1", "1.5"],
                &["2007-09-18", "1", "2", "1", "1.5"],
            ],
        );
        let out = normalize(&table, SourceTag::Archive)
            .unwrap()
            .clip_before(date("2007-09-17"));
        assert_eq!(out.bars.len(), 1);
        assert_eq!(out.bars[0].date, date("2007-09-14"));
    }
}
