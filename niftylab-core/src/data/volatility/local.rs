//! Last-resort volatility source: a CSV kept next to the archive.

use super::{VolatilityError, VolatilityStrategy};
use crate::data::dates::parse_calendar_date;
use crate::data::table::RawTable;
use crate::domain::VolatilityPoint;
use crate::numeric::parse_number;
use std::path::{Path, PathBuf};

/// Reads `Date` plus one value column from a local CSV file.
///
/// Rows whose date or value does not parse are skipped.
#[derive(Debug, Clone)]
pub struct LocalCsvFallback {
    path: PathBuf,
    column: String,
}

impl LocalCsvFallback {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VolatilityStrategy for LocalCsvFallback {
    fn name(&self) -> &str {
        "local_csv"
    }

    fn extract(&self) -> Result<Vec<VolatilityPoint>, VolatilityError> {
        let table = RawTable::from_path(&self.path).map_err(|e| VolatilityError::File {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let date_col = table
            .column_index("Date")
            .ok_or_else(|| VolatilityError::MissingColumn("Date".into()))?;
        let value_col = table
            .column_index(&self.column)
            .ok_or_else(|| VolatilityError::MissingColumn(self.column.clone()))?;

        let mut skipped = 0usize;
        let points: Vec<VolatilityPoint> = (0..table.len())
            .filter_map(|row| {
                let date = parse_calendar_date(table.cell(row, date_col));
                let value = parse_number(table.cell(row, value_col));
                match (date, value) {
                    (Some(date), Some(index_value)) => Some(VolatilityPoint { date, index_value }),
                    _ => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(path = %self.path.display(), skipped, "skipped unparseable volatility rows");
        }
        Ok(points)
    }
}
