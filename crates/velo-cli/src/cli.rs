use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use velo_core::VeloConfig;

const DEFAULT_CONFIG: &str = "config/default.toml";

#[derive(Parser, Debug)]
#[command(name = "velo", about = "Velocity reversal signals and fixed-stake backtests")]
pub struct Cli {
    /// Path to TOML config file(s), comma-separated for merge
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Also write logs to this file
    #[arg(long = "log-file", global = true, value_hint = clap::ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Backtest the velocity crossover strategy over a basket of instruments
    Backtest(BacktestArgs),
    /// Export the up/down velocity series of one instrument
    Velocity(VelocityArgs),
    /// Report session-scaled volatility of one instrument
    Volatility(VolatilityArgs),
}

/// Options shared by every subcommand that reads price history.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Directory holding <SYMBOL>.csv price files
    #[arg(long = "data-dir", value_hint = clap::ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Instruments to simulate (comma-separated); overrides the config list
    #[arg(long, value_delimiter = ',')]
    pub instruments: Vec<String>,

    /// Velocity window in sessions
    #[arg(long)]
    pub window: Option<usize>,

    /// Dollar amount committed on every buy
    #[arg(long)]
    pub investment: Option<f64>,

    /// Run instruments one after another instead of on the thread pool
    #[arg(long, default_value_t = false)]
    pub sequential: bool,

    /// Output file path (stdout if not specified)
    #[arg(long = "output-file")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
pub struct VelocityArgs {
    pub instrument: String,

    /// Velocity window in sessions
    #[arg(long)]
    pub window: Option<usize>,

    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Output file path (stdout if not specified)
    #[arg(long = "output-file")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Args, Debug)]
pub struct VolatilityArgs {
    pub instrument: String,

    /// Sessions in the volatility horizon
    #[arg(long, short = 'w', default_value_t = 21)]
    pub sessions: usize,

    #[command(flatten)]
    pub data: DataArgs,
}

impl Cli {
    /// Load the configured TOML files, or built-in defaults when none exist.
    pub fn load_config(&self) -> Result<VeloConfig> {
        let paths: Vec<PathBuf> = match &self.config {
            Some(list) => list.split(',').map(|p| PathBuf::from(p.trim())).collect(),
            None if Path::new(DEFAULT_CONFIG).is_file() => vec![PathBuf::from(DEFAULT_CONFIG)],
            None => return Ok(VeloConfig::default()),
        };
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        VeloConfig::from_toml_files(&refs)
            .with_context(|| format!("failed to load config from {:?}", paths))
    }
}

impl DataArgs {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut VeloConfig) {
        if let Some(dir) = &self.data_dir {
            config.data.dir = dir.clone();
        }
        if self.start.is_some() {
            config.backtest.start = self.start;
        }
        if self.end.is_some() {
            config.backtest.end = self.end;
        }
    }
}
