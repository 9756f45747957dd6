//! Left join of the volatility series onto the canonical series.

use crate::domain::{CanonicalSeries, VolatilityPoint};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Join `points` onto `series` by exact date.
///
/// Every canonical row is kept; rows without a matching point get `None`.
/// If several points share a date, the first one wins so the join can never
/// duplicate a canonical row.
pub fn attach_volatility(series: &CanonicalSeries, points: &[VolatilityPoint]) -> CanonicalSeries {
    let mut by_date: HashMap<NaiveDate, f64> = HashMap::with_capacity(points.len());
    for point in points {
        by_date.entry(point.date).or_insert(point.index_value);
    }

    let joined = series.with_volatility(|date| by_date.get(&date).copied());
    tracing::info!(
        points = points.len(),
        matched = joined.volatility_coverage(),
        rows = joined.len(),
        "attached volatility"
    );
    joined
}
