//! Series merger: concatenate, dedupe by date (first wins), sort, coerce,
//! derive per-row metrics.
//!
//! Precedence comes purely from input order: pass the archive before the live
//! feed and the archive's values win on every overlapping date.
//!
//! Data loss is explicit: rows whose open/high/low/close are not all numeric
//! are dropped after dedupe and listed in [`MergeReport::coercion_drops`].
//! Because dedupe runs first, a non-numeric archive row still shadows the live
//! row for the same date, and that date disappears from the output.

use super::normalize::NormalizedSource;
use crate::domain::{CanonicalRow, CanonicalSeries, SeriesError, SourceBar, SourceTag};
use chrono::NaiveDate;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("merged series is empty ({rows_in} input rows, {coercion_drops} dropped by numeric coercion)")]
    Empty { rows_in: usize, coercion_drops: usize },

    #[error("merged series violates ordering: {0}")]
    Series(#[from] SeriesError),
}

/// A row removed because a price failed numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionDrop {
    pub date: NaiveDate,
    pub source: SourceTag,
}

/// What the merge did to its inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub rows_in: usize,
    /// Later occurrences of an already-seen date.
    pub duplicates_removed: usize,
    /// Duplicates where the dropped row came from a different source than the kept one.
    pub cross_source_overlaps: usize,
    pub coercion_drops: Vec<CoercionDrop>,
    pub rows_out: usize,
}

/// Merge normalized sources, highest precedence first.
pub fn merge_sources(
    sources: &[NormalizedSource],
) -> Result<(CanonicalSeries, MergeReport), MergeError> {
    let mut report = MergeReport::default();
    let has_volume = sources.iter().any(|s| s.has_volume);

    // 1 + 2: concatenate in precedence order, keeping the first record per date.
    let mut kept: Vec<&SourceBar> = Vec::new();
    let mut winners: HashMap<NaiveDate, SourceTag> = HashMap::new();
    for bar in sources.iter().flat_map(|s| s.bars.iter()) {
        report.rows_in += 1;
        match winners.entry(bar.date) {
            Entry::Vacant(slot) => {
                slot.insert(bar.source);
                kept.push(bar);
            }
            Entry::Occupied(winner) => {
                report.duplicates_removed += 1;
                if *winner.get() != bar.source {
                    report.cross_source_overlaps += 1;
                }
            }
        }
    }

    // 3: ascending by date (stable, though dates are unique by now).
    kept.sort_by_key(|b| b.date);

    // 4 + 5: coerce prices and derive changes.
    let mut rows = Vec::with_capacity(kept.len());
    for bar in kept {
        match bar.coerce().and_then(CanonicalRow::derive) {
            Some(row) => rows.push(row),
            None => {
                tracing::warn!(date = %bar.date, source = %bar.source, "dropping row: non-numeric price");
                report.coercion_drops.push(CoercionDrop {
                    date: bar.date,
                    source: bar.source,
                });
            }
        }
    }

    if rows.is_empty() {
        return Err(MergeError::Empty {
            rows_in: report.rows_in,
            coercion_drops: report.coercion_drops.len(),
        });
    }

    report.rows_out = rows.len();
    tracing::info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        duplicates = report.duplicates_removed,
        dropped = report.coercion_drops.len(),
        "merged sources"
    );

    let series = CanonicalSeries::new(rows, has_volume)?;
    Ok((series, report))
}
