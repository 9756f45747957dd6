//! NiftyLab Runner: pipeline orchestration, configuration, export and publishing.
//!
//! This crate builds on `niftylab-core` to provide:
//! - TOML configuration with per-section defaults
//! - The sequential consolidation pipeline over pluggable source providers
//! - CSV and Parquet export, and reading a published daily file back
//! - Atomic multi-file publishing with a hashed manifest

pub mod config;
pub mod export;
pub mod pipeline;
pub mod publish;

pub use config::{ConfigError, PipelineConfig};
pub use export::{read_daily_csv, DailyFile, ExportError};
pub use pipeline::{live_provider, run_pipeline, volatility_chain, PipelineError, PipelineOutput, Sources};
pub use publish::{Manifest, PublishError, Published, Publisher};
