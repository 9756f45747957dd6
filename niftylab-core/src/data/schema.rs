use super::table::RawTable;
use crate::domain::SourceTag;

/// Columns every price source must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Date", "Open", "High", "Low", "Close"];

/// Optional column included only when the source supplies it.
pub const VOLUME_COLUMN: &str = "Volume";

/// Resolved column positions of a raw price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: Option<usize>,
}

impl ColumnMap {
    /// Resolve the layout of `table`, failing on the first missing required column.
    pub fn resolve(table: &RawTable, origin: SourceTag) -> Result<Self, SchemaError> {
        let find = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| SchemaError::MissingColumn {
                    column: name.to_string(),
                    origin,
                })
        };

        Ok(Self {
            date: find(REQUIRED_COLUMNS[0])?,
            open: find(REQUIRED_COLUMNS[1])?,
            high: find(REQUIRED_COLUMNS[2])?,
            low: find(REQUIRED_COLUMNS[3])?,
            close: find(REQUIRED_COLUMNS[4])?,
            volume: table.column_index(VOLUME_COLUMN),
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchemaError {
    #[error("{origin} source is missing required column: {column}")]
    MissingColumn { column: String, origin: SourceTag },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_reordered_columns() {
        let table = RawTable::from_rows(&["Close", "Low", "High", "Open", "Date"], &[]);
        let map = ColumnMap::resolve(&table, SourceTag::Archive).unwrap();
        assert_eq!(map.date, 4);
        assert_eq!(map.close, 0);
        assert_eq!(map.volume, None);
    }

    #[test]
    fn volume_is_optional() {
        let table = RawTable::from_rows(&["Date", "Open", "High", "Low", "Close", "Volume"], &[]);
        let map = ColumnMap::resolve(&table, SourceTag::Live).unwrap();
        assert_eq!(map.volume, Some(5));
    }

    #[test]
    fn rejects_missing_column() {
        let table = RawTable::from_rows(&["Date", "Open", "High", "Close"], &[]);
        let err = ColumnMap::resolve(&table, SourceTag::Live).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                column: "Low".into(),
                origin: SourceTag::Live,
            }
        );
        assert_eq!(err.to_string(), "live source is missing required column: Low");
    }
}
