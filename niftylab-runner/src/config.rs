//! Pipeline configuration loaded from `niftylab.toml`.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Paths are passed explicitly into each stage from here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one consolidation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub archive: ArchiveConfig,
    pub live: LiveConfig,
    pub volatility: VolatilityConfig,
    pub output: OutputConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    pub path: PathBuf,
    /// First date served by the live feed; archive rows on or after it are ignored.
    pub cutover: NaiveDate,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/NIFTY 50_Historical_PR_01011990to11102024.csv"),
            cutover: NaiveDate::from_ymd_opt(2007, 9, 17).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LiveConfig {
    pub symbol: String,
    /// Exclusive end of the requested window. `None` means today.
    pub end: Option<NaiveDate>,
    pub enabled: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbol: "^NSEI".into(),
            end: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Output column name, also the column read from `fallback_path`.
    pub column: String,
    pub url: String,
    pub fallback_path: Option<PathBuf>,
    pub enabled: bool,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            column: "India_VIX".into(),
            url: "https://www.screener.in/company/INDIAVIX/consolidated/".into(),
            fallback_path: Some(PathBuf::from("data/India_VIX_Historical_Data.csv")),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub daily_file: String,
    pub yearly_file: String,
    /// Also write a Parquet mirror of the daily file.
    pub parquet: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            daily_file: "NIFTY50_Historical_Data_From_1995_Clean.csv".into(),
            yearly_file: "NIFTY50_Yearly_Data.csv".into(),
            parquet: false,
        }
    }
}

impl OutputConfig {
    pub fn daily_path(&self) -> PathBuf {
        self.dir.join(&self.daily_file)
    }

    pub fn yearly_path(&self) -> PathBuf {
        self.dir.join(&self.yearly_file)
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.daily_path().with_extension("parquet")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }
}

/// Optional post-publish hook. `{path}` in any argument is replaced by the
/// published file's path; the command runs once per file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    pub command: Vec<String>,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("archive.path is empty".into()));
        }
        if self.output.daily_file.trim().is_empty() || self.output.yearly_file.trim().is_empty() {
            return Err(ConfigError::Invalid("output file names must be non-empty".into()));
        }
        if self.output.daily_file == self.output.yearly_file {
            return Err(ConfigError::Invalid(
                "output.daily_file and output.yearly_file must differ".into(),
            ));
        }
        if self.volatility.column.trim().is_empty() {
            return Err(ConfigError::Invalid("volatility.column is empty".into()));
        }
        if self.live.enabled && self.live.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("live.symbol is empty".into()));
        }
        if let Some(end) = self.live.end {
            if end <= self.archive.cutover {
                return Err(ConfigError::Invalid(format!(
                    "live.end {end} is not after archive.cutover {}",
                    self.archive.cutover
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.archive.cutover, NaiveDate::from_ymd_opt(2007, 9, 17).unwrap());
        assert_eq!(config.live.symbol, "^NSEI");
        assert_eq!(config.volatility.column, "India_VIX");
        assert!(config.publish.command.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
[archive]
path = "archive.csv"

[output]
dir = "out"
parquet = true

[publish]
command = ["git", "add", "{path}"]
"#,
        )
        .unwrap();

        assert_eq!(config.archive.path, PathBuf::from("archive.csv"));
        assert_eq!(config.archive.cutover, ArchiveConfig::default().cutover);
        assert!(config.output.parquet);
        assert_eq!(config.output.daily_path(), PathBuf::from("out").join(&config.output.daily_file));
        assert_eq!(config.publish.command, vec!["git", "add", "{path}"]);
    }

    #[test]
    fn parquet_path_mirrors_daily_file() {
        let output = OutputConfig::default();
        assert_eq!(
            output.parquet_path(),
            PathBuf::from("output/NIFTY50_Historical_Data_From_1995_Clean.parquet")
        );
    }

    #[test]
    fn rejects_blank_volatility_column() {
        let err = PipelineConfig::from_toml("[volatility]\ncolumn = \" \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_same_output_names() {
        let err = PipelineConfig::from_toml("[output]\ndaily_file = \"a.csv\"\nyearly_file = \"a.csv\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_live_end_before_cutover() {
        let err = PipelineConfig::from_toml("[live]\nend = \"2001-01-01\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = PipelineConfig::from_toml("[archive\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
