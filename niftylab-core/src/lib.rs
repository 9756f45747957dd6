//! NiftyLab Core: consolidation and analytics for a daily index series.
//!
//! This crate contains the part of the system with real invariants:
//! - Domain types (source bars, daily bars, canonical series, yearly metrics)
//! - Source normalization of differently-shaped raw tables
//! - Merge with archive-first date precedence and derived per-row metrics
//! - Left join of an auxiliary volatility series
//! - Per-year positional statistics
//!
//! The source providers under [`data`] (archive CSV, Yahoo live feed,
//! volatility fallback chain) are thin collaborators around that core.

pub mod analytics;
pub mod data;
pub mod domain;
pub mod numeric;

pub use analytics::{aggregate_yearly, AggregateError, YearSkipped, YearlyReport};
pub use data::{
    attach_volatility, merge_sources, normalize, MergeError, MergeReport, NormalizedSource,
    RawTable, SchemaError,
};
pub use domain::{
    CanonicalRow, CanonicalSeries, DailyBar, SeriesError, SourceBar, SourceTag, VolatilityPoint,
    YearlyMetrics,
};
