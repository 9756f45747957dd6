//! Analytics over the canonical series.

pub mod yearly;

pub use yearly::{aggregate_yearly, AggregateError, YearSkipped, YearlyReport};
