pub mod cli;
pub mod medications;

use crate::core::filter;
use crate::domain::model::MedicationSpec;
use crate::domain::ports::{ConfigProvider, OutputMode};
use crate::utils::error::{MapError, Result};
use crate::utils::validation::{validate_path, validate_range, validate_source, Validate};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SOURCE: &str =
    "https://www.ema.europa.eu/en/documents/other/article-57-product-data_en.xlsx";
pub const DEFAULT_SKIP_ROWS: usize = 19;

impl FromStr for OutputMode {
    type Err = MapError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "show" => Ok(OutputMode::Show),
            "export" => Ok(OutputMode::Export),
            "both" => Ok(OutputMode::Both),
            other => Err(MapError::configuration(format!(
                "invalid output mode '{}' (expected show, export or both)",
                other
            ))),
        }
    }
}

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "adhd-med-map"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Map where ADHD medications are authorised in Europe")
)]
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Spreadsheet path or URL
    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_SOURCE))]
    pub source: String,

    /// Banner rows before the header row
    #[cfg_attr(feature = "cli", arg(long, default_value_t = DEFAULT_SKIP_ROWS))]
    pub skip_rows: usize,

    /// show | export | both
    #[cfg_attr(feature = "cli", arg(short, long, default_value = "show"))]
    pub output: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./output"))]
    pub output_dir: PathBuf,

    /// TOML file overriding the built-in medication list
    #[cfg_attr(feature = "cli", arg(long))]
    pub medications: Option<PathBuf>,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./cache"))]
    pub cache_dir: PathBuf,

    #[cfg_attr(feature = "cli", arg(long))]
    pub disable_cache: bool,

    /// Remove every cache entry before running
    #[cfg_attr(feature = "cli", arg(long))]
    pub clear_cache: bool,

    /// Minimum Jaro-Winkler similarity for fuzzy country matching
    #[cfg_attr(feature = "cli", arg(long, default_value_t = crate::core::normalizer::DEFAULT_FUZZY_THRESHOLD))]
    pub fuzzy_threshold: f64,

    #[cfg_attr(feature = "cli", arg(short, long, help = "Enable verbose output"))]
    pub verbose: bool,

    /// Print full error details on failure
    #[cfg_attr(feature = "cli", arg(long))]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_json: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            skip_rows: DEFAULT_SKIP_ROWS,
            output: "show".to_string(),
            output_dir: PathBuf::from("./output"),
            medications: None,
            cache_dir: PathBuf::from("./cache"),
            disable_cache: false,
            clear_cache: false,
            fuzzy_threshold: crate::core::normalizer::DEFAULT_FUZZY_THRESHOLD,
            verbose: false,
            debug: false,
            log_json: false,
        }
    }
}

impl CliConfig {
    pub fn output_mode(&self) -> Result<OutputMode> {
        self.output.parse()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        // 輸出模式最先檢查，須早於任何資料載入
        self.output_mode()?;
        validate_source("source", &self.source)?;
        validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        validate_path("cache_dir", &self.cache_dir.to_string_lossy())?;
        validate_range("fuzzy_threshold", self.fuzzy_threshold, 0.0, 1.0)?;
        filter::compile_all(&self.medications()?)?;
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn source(&self) -> &str {
        &self.source
    }

    fn skip_rows(&self) -> usize {
        self.skip_rows
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_enabled(&self) -> bool {
        !self.disable_cache
    }

    fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    fn medications(&self) -> Result<Vec<MedicationSpec>> {
        match &self.medications {
            Some(path) => medications::MedicationFile::from_file(path),
            None => Ok(medications::default_medications()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("show".parse::<OutputMode>().unwrap(), OutputMode::Show);
        assert_eq!(" Export ".parse::<OutputMode>().unwrap(), OutputMode::Export);
        assert_eq!("both".parse::<OutputMode>().unwrap(), OutputMode::Both);
        assert!(matches!(
            "invalid".parse::<OutputMode>(),
            Err(MapError::Configuration { .. })
        ));
    }

    #[test]
    fn test_default_config_validates() {
        assert!(CliConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = CliConfig {
            fuzzy_threshold: 1.2,
            ..CliConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapError::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_invalid_output_mode_rejected_first() {
        let config = CliConfig {
            output: "invalid".to_string(),
            source: String::new(),
            ..CliConfig::default()
        };
        assert!(matches!(config.validate(), Err(MapError::Configuration { .. })));
    }
}
