//! Source provider trait and structured error types.
//!
//! A provider hands back the raw table of one source (archive file, live
//! quote feed). Normalization and precedence live above this trait, so the
//! pipeline can be driven by in-memory providers in tests.

use super::table::RawTable;
use crate::domain::SourceTag;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for source retrieval.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: quote provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("cannot read source file {}: {message}", .path.display())]
    SourceFile { path: PathBuf, message: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for raw price sources.
pub trait SourceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Which side of the precedence rule this source feeds.
    fn tag(&self) -> SourceTag;

    /// Retrieve the full raw table for this source.
    fn fetch(&self) -> Result<RawTable, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

/// A provider that returns a fixed table. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    tag: SourceTag,
    table: RawTable,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, tag: SourceTag, table: RawTable) -> Self {
        Self {
            name: name.into(),
            tag,
            table,
        }
    }
}

impl SourceProvider for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> SourceTag {
        self.tag
    }

    fn fetch(&self) -> Result<RawTable, DataError> {
        Ok(self.table.clone())
    }
}
