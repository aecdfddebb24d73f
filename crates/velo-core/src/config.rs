use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Top-level run configuration, parsed from one or more TOML files.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct VeloConfig {
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl VeloConfig {
    /// Parse config from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load and merge multiple TOML files (later files override earlier).
    pub fn from_toml_files(paths: &[&Path]) -> Result<Self, ConfigError> {
        let (first, rest) = paths
            .split_first()
            .ok_or_else(|| ConfigError::Parse("no config files provided".into()))?;

        let mut base = read_value(first)?;
        for path in rest {
            merge_toml(&mut base, read_value(path)?);
        }

        base.try_into::<VeloConfig>()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
    }

    /// Check the ranges the signal and simulator depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.velocity.window < 1 {
            return Err(ConfigError::Invalid(format!(
                "velocity.window must be >= 1, got {}",
                self.velocity.window
            )));
        }
        if !(self.backtest.investment.is_finite() && self.backtest.investment > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.investment must be > 0, got {}",
                self.backtest.investment
            )));
        }
        if let (Some(start), Some(end)) = (self.backtest.start, self.backtest.end) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "backtest.start ({}) is after backtest.end ({})",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

fn read_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    if let (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) =
        (base, overlay)
    {
        for (key, value) in overlay_table {
            if let Some(base_value) = base_table.get_mut(&key) {
                if base_value.is_table() && value.is_table() {
                    merge_toml(base_value, value);
                    continue;
                }
            }
            base_table.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VelocityConfig {
    /// Trailing window in sessions, not calendar days.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    /// Fixed dollar amount committed on every buy.
    #[serde(default = "default_investment")]
    pub investment: f64,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub instruments: Vec<String>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            investment: default_investment(),
            start: None,
            end: None,
            instruments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_price_column")]
    pub price_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            price_column: default_price_column(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Fan instruments out across the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

// Default value helpers
fn default_true() -> bool { true }
fn default_window() -> usize { 100 }
fn default_investment() -> f64 { 10000.0 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_price_column() -> String { "adj close".into() }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[velocity]
window = 50

[backtest]
investment = 5000.0
start = "2015-01-01"
end = "2016-06-30"
instruments = ["AAPL", "MSFT"]

[data]
dir = "prices"
price_column = "close"

[run]
parallel = false
"#;

        let config = VeloConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.velocity.window, 50);
        assert!((config.backtest.investment - 5000.0).abs() < 1e-10);
        assert_eq!(
            config.backtest.start,
            NaiveDate::from_ymd_opt(2015, 1, 1)
        );
        assert_eq!(config.backtest.instruments, vec!["AAPL", "MSFT"]);
        assert_eq!(config.data.dir, PathBuf::from("prices"));
        assert!(!config.run.parallel);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = VeloConfig::from_toml_str("").unwrap();
        assert_eq!(config.velocity.window, 100);
        assert!((config.backtest.investment - 10000.0).abs() < 1e-10);
        assert_eq!(config.data.price_column, "adj close");
        assert!(config.run.parallel);
        assert!(config.backtest.instruments.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = VeloConfig::from_toml_str("[velocity]\nwindow = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_investment() {
        let config = VeloConfig::from_toml_str("[backtest]\ninvestment = -1.0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = VeloConfig::from_toml_str(
            "[backtest]\nstart = \"2016-01-01\"\nend = \"2015-01-01\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_overrides_nested_keys() {
        let mut base: toml::Value =
            toml::from_str("[velocity]\nwindow = 100\n[backtest]\ninvestment = 1.0\n").unwrap();
        let overlay: toml::Value = toml::from_str("[velocity]\nwindow = 20\n").unwrap();
        merge_toml(&mut base, overlay);

        let config = base.try_into::<VeloConfig>().unwrap();
        assert_eq!(config.velocity.window, 20);
        assert!((config.backtest.investment - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_from_toml_files_requires_input() {
        assert!(matches!(
            VeloConfig::from_toml_files(&[]),
            Err(ConfigError::Parse(_))
        ));
    }
}
