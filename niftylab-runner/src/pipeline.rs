//! Pipeline runner: fetch, normalize, merge, attach volatility, aggregate.
//!
//! Stages run strictly in sequence and each one fully materializes its output.
//! Nothing is written here; publishing is a separate step so a failed run
//! never leaves partial files behind.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use niftylab_core::analytics::{aggregate_yearly, AggregateError, YearlyReport};
use niftylab_core::data::volatility::{
    LocalCsvFallback, RatiosExtraction, ScreenerPage, SpanExtraction, VolatilityChain,
    VolatilityOutcome,
};
use niftylab_core::data::{
    attach_volatility, merge_sources, normalize, CircuitBreaker, DataError, MergeError,
    MergeReport, NormalizedSource, SchemaError, SourceProvider, YahooProvider,
};
use niftylab_core::{CanonicalSeries, SourceTag};

use crate::config::{PipelineConfig, VolatilityConfig};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{provider} fetch failed: {error}")]
    Fetch {
        provider: String,
        #[source]
        error: DataError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// The inputs of one run. `live` and `volatility` are optional so offline
/// and volatility-free runs use the same path.
pub struct Sources<'a> {
    pub archive: &'a dyn SourceProvider,
    pub live: Option<&'a dyn SourceProvider>,
    pub volatility: Option<&'a VolatilityChain>,
}

/// Everything a run produced, ready to publish or print.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Canonical series with volatility attached.
    pub series: CanonicalSeries,
    pub merge: MergeReport,
    pub yearly: YearlyReport,
    pub volatility: VolatilityOutcome,
    /// Archive rows kept after the cut-over clip.
    pub archive_rows: usize,
    pub live_rows: usize,
}

fn fetch(provider: &dyn SourceProvider) -> Result<niftylab_core::RawTable, PipelineError> {
    tracing::debug!(provider = provider.name(), "fetching source");
    provider.fetch().map_err(|error| PipelineError::Fetch {
        provider: provider.name().to_string(),
        error,
    })
}

/// Run every stage for one consolidation.
pub fn run_pipeline(
    config: &PipelineConfig,
    sources: Sources<'_>,
) -> Result<PipelineOutput, PipelineError> {
    let archive_table = fetch(sources.archive)?;
    let archive = normalize(&archive_table, SourceTag::Archive)?.clip_before(config.archive.cutover);
    tracing::info!(
        rows = archive.bars.len(),
        unparseable_dates = archive.unparseable_dates,
        cutover = %config.archive.cutover,
        "archive normalized"
    );
    let archive_rows = archive.bars.len();

    let mut normalized: Vec<NormalizedSource> = vec![archive];
    let mut live_rows = 0;
    if let Some(provider) = sources.live {
        let table = fetch(provider)?;
        if table.is_empty() {
            tracing::warn!(
                provider = provider.name(),
                "live feed returned no rows; continuing on archive data only"
            );
        } else {
            let live = normalize(&table, SourceTag::Live)?;
            tracing::info!(
                rows = live.bars.len(),
                unparseable_dates = live.unparseable_dates,
                "live feed normalized"
            );
            live_rows = live.bars.len();
            normalized.push(live);
        }
    }

    let (merged, merge) = merge_sources(&normalized)?;

    let volatility = match sources.volatility {
        Some(chain) => chain.resolve(),
        None => VolatilityOutcome::default(),
    };
    let series = attach_volatility(&merged, &volatility.points);
    tracing::debug!(
        resolved_by = volatility.resolved_by.as_deref().unwrap_or("none"),
        failures = volatility.failures.len(),
        "volatility stage done"
    );

    let yearly = aggregate_yearly(&series)?;
    tracing::info!(
        rows = series.len(),
        years = yearly.metrics.len(),
        skipped_years = yearly.skipped.len(),
        "pipeline complete"
    );

    Ok(PipelineOutput {
        series,
        merge,
        yearly,
        volatility,
        archive_rows,
        live_rows,
    })
}

/// Live provider for the configured symbol, starting at the cut-over date.
pub fn live_provider(
    config: &PipelineConfig,
    breaker: Arc<CircuitBreaker>,
) -> Result<YahooProvider, DataError> {
    let provider = YahooProvider::new(breaker, config.live.symbol.as_str(), config.archive.cutover)?;
    Ok(match config.live.end {
        Some(end) => provider.with_end(end),
        None => provider,
    })
}

/// Volatility chain in preference order: page span, page ratios block, local
/// CSV. `offline` leaves only the local CSV.
pub fn volatility_chain(config: &VolatilityConfig, offline: bool, today: NaiveDate) -> VolatilityChain {
    let mut chain = VolatilityChain::new();

    if !offline {
        match ScreenerPage::new(config.url.as_str()) {
            Ok(page) => {
                let page = Arc::new(page);
                chain = chain
                    .with(SpanExtraction::new(Arc::clone(&page), today))
                    .with(RatiosExtraction::new(page, today));
            }
            Err(e) => tracing::warn!(error = %e, "volatility page client unavailable"),
        }
    }

    if let Some(path) = &config.fallback_path {
        chain = chain.with(LocalCsvFallback::new(path.clone(), config.column.as_str()));
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn offline_chain_is_local_only() {
        let config = VolatilityConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 10, 11).unwrap();
        let chain = volatility_chain(&config, true, today);
        assert_eq!(chain.strategy_names(), vec!["local_csv"]);
    }

    #[test]
    fn online_chain_prefers_page_strategies() {
        let config = VolatilityConfig::default();
        let today = NaiveDate::from_ymd_opt(2024, 10, 11).unwrap();
        let chain = volatility_chain(&config, false, today);
        assert_eq!(
            chain.strategy_names(),
            vec!["screener_span", "screener_ratios", "local_csv"]
        );
    }

    #[test]
    fn chain_without_fallback_path() {
        let config = VolatilityConfig {
            fallback_path: None,
            ..VolatilityConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 10, 11).unwrap();
        assert!(volatility_chain(&config, true, today).strategy_names().is_empty());
    }

    #[test]
    fn live_provider_uses_configured_symbol() {
        let mut config = PipelineConfig::default();
        config.archive.path = PathBuf::from("a.csv");
        let provider = live_provider(&config, Arc::new(CircuitBreaker::default_provider())).unwrap();
        assert_eq!(provider.tag(), SourceTag::Live);
    }
}
