//! Static historical archive read from a local CSV export.

use super::provider::{DataError, SourceProvider};
use super::table::RawTable;
use crate::domain::SourceTag;
use std::path::{Path, PathBuf};

/// Archive source backed by a CSV file (e.g. an index history export).
#[derive(Debug, Clone)]
pub struct CsvArchive {
    path: PathBuf,
}

impl CsvArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceProvider for CsvArchive {
    fn name(&self) -> &str {
        "csv_archive"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Archive
    }

    fn fetch(&self) -> Result<RawTable, DataError> {
        let table = RawTable::from_path(&self.path).map_err(|e| DataError::SourceFile {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %self.path.display(), rows = table.len(), "loaded archive");
        Ok(table)
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }
}
