//! Domain types for NiftyLab

pub mod bar;
pub mod series;
pub mod volatility;
pub mod yearly;

pub use bar::{DailyBar, SourceBar, SourceTag};
pub use series::{check_ascending, CanonicalRow, CanonicalSeries, SeriesError};
pub use volatility::VolatilityPoint;
pub use yearly::YearlyMetrics;
