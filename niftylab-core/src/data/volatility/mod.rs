//! Volatility series retrieval as an ordered chain of strategies.
//!
//! Each strategy returns a `Result`; the chain stops at the first one that
//! yields at least one point and falls through on anything else. The chain
//! itself never fails: when every strategy is exhausted the outcome is an
//! empty set, and the pipeline proceeds with missing volatility values.

pub mod local;
pub mod screener;

pub use local::LocalCsvFallback;
pub use screener::{RatiosExtraction, ScreenerPage, SpanExtraction};

use crate::domain::VolatilityPoint;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolatilityError {
    #[error("volatility page request failed: {0}")]
    Http(String),

    #[error("volatility page returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("no volatility value found: {0}")]
    NotFound(String),

    #[error("cannot read volatility file {}: {message}", .path.display())]
    File { path: PathBuf, message: String },

    #[error("volatility file has no '{0}' column")]
    MissingColumn(String),
}

/// One way of obtaining volatility points.
pub trait VolatilityStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self) -> Result<Vec<VolatilityPoint>, VolatilityError>;
}

/// Result of running the chain.
#[derive(Debug, Default)]
pub struct VolatilityOutcome {
    pub points: Vec<VolatilityPoint>,
    /// Name of the strategy that produced `points`, if any did.
    pub resolved_by: Option<String>,
    /// Every strategy that was tried and failed, in order.
    pub failures: Vec<(String, VolatilityError)>,
}

impl VolatilityOutcome {
    /// True when every stage failed and the set is empty.
    pub fn is_unavailable(&self) -> bool {
        self.resolved_by.is_none()
    }
}

/// Ordered list of strategies; earlier entries are preferred.
#[derive(Default)]
pub struct VolatilityChain {
    strategies: Vec<Box<dyn VolatilityStrategy>>,
}

impl VolatilityChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl VolatilityStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in order. Never fails.
    pub fn resolve(&self) -> VolatilityOutcome {
        let mut outcome = VolatilityOutcome::default();

        for strategy in &self.strategies {
            match strategy.extract() {
                Ok(points) if !points.is_empty() => {
                    tracing::info!(strategy = strategy.name(), points = points.len(), "volatility resolved");
                    outcome.points = points;
                    outcome.resolved_by = Some(strategy.name().to_string());
                    return outcome;
                }
                Ok(_) => {
                    tracing::warn!(strategy = strategy.name(), "volatility strategy returned no points");
                    outcome.failures.push((
                        strategy.name().to_string(),
                        VolatilityError::NotFound("empty result".into()),
                    ));
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "volatility strategy failed");
                    outcome.failures.push((strategy.name().to_string(), e));
                }
            }
        }

        tracing::warn!(
            tried = outcome.failures.len(),
            "volatility unavailable; continuing with missing values"
        );
        outcome
    }
}

impl std::fmt::Debug for VolatilityChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolatilityChain")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
