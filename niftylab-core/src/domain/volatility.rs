//! Auxiliary volatility index observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observation of the volatility index on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    pub index_value: f64,
}
