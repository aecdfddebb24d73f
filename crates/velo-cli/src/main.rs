mod cli;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::{prelude::*, EnvFilter};

use cli::{BacktestArgs, Cli, Commands, OutputFormat, VelocityArgs, VolatilityArgs};
use velo_core::{CsvDirSource, PriceSeries, PriceSource, VeloConfig};
use velo_engine::{
    BacktestResult, BacktestSimulator, BasketReport, BasketRunner, InstrumentOutcome,
    InstrumentReport, TradeStats,
};
use velo_signal::{volatility, VelocityCrossover, VelocitySeries};

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the machine-readable report
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (non_blocking_writer, guard) = non_blocking(file);
        // Keep the writer alive for the whole process.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking_writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;
    let mut config = cli.load_config()?;

    match &cli.command {
        Commands::Backtest(args) => run_backtest(args, &mut config),
        Commands::Velocity(args) => run_velocity(args, &mut config),
        Commands::Volatility(args) => run_volatility(args, &mut config),
    }
}

fn price_source(config: &VeloConfig) -> CsvDirSource {
    CsvDirSource::new(&config.data.dir, Some(config.data.price_column.clone()))
}

fn write_output(output_file: Option<&PathBuf>, body: &str) -> Result<()> {
    match output_file {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write output file {path:?}"))?;
            info!(path = %path.display(), "results written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            if !body.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// JSON output for a basket run.
#[derive(Debug, Serialize)]
struct OutputReport<'a> {
    meta: OutputMeta,
    summary: Summary<'a>,
    trade_stats: TradeStats,
    instruments: &'a [InstrumentReport],
}

#[derive(Debug, Serialize)]
struct OutputMeta {
    strategy_id: String,
    window: usize,
    investment: f64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    instruments_requested: usize,
    instruments_skipped: usize,
    elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    totals: &'a BacktestResult,
    /// Null when no capital was ever at risk.
    average_yearly_return: Option<f64>,
}

fn run_backtest(args: &BacktestArgs, config: &mut VeloConfig) -> Result<()> {
    let start = Instant::now();

    args.data.apply(config);
    if let Some(window) = args.window {
        config.velocity.window = window;
    }
    if let Some(investment) = args.investment {
        config.backtest.investment = investment;
    }
    if !args.instruments.is_empty() {
        config.backtest.instruments = args.instruments.clone();
    }
    if args.sequential {
        config.run.parallel = false;
    }
    config.validate()?;
    if config.backtest.instruments.is_empty() {
        return Err(anyhow!(
            "no instruments given; pass --instruments or set backtest.instruments"
        ));
    }

    let source = price_source(config);
    let runner = BasketRunner::new(
        BacktestSimulator::new(config.backtest.investment),
        Box::new(VelocityCrossover::new(&config.velocity)),
    )
    .parallel(config.run.parallel);

    info!(
        data_dir = %source.dir().display(),
        instruments = config.backtest.instruments.len(),
        window = config.velocity.window,
        investment = config.backtest.investment,
        parallel = config.run.parallel,
        "running basket"
    );
    let report = runner.run(
        &source,
        &config.backtest.instruments,
        config.backtest.start,
        config.backtest.end,
    );

    let average_yearly_return = match report.result.average_yearly_return() {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(error = %e, "average yearly return is undefined");
            None
        }
    };

    let output = OutputReport {
        meta: OutputMeta {
            strategy_id: report.strategy_id.clone(),
            window: config.velocity.window,
            investment: report.investment,
            start: config.backtest.start,
            end: config.backtest.end,
            instruments_requested: config.backtest.instruments.len(),
            instruments_skipped: report.skipped().count(),
            elapsed_ms: start.elapsed().as_millis(),
        },
        summary: Summary {
            totals: &report.result,
            average_yearly_return,
        },
        trade_stats: report.trade_stats(),
        instruments: &report.instruments,
    };

    print_summary(&output, &report);

    let json = serde_json::to_string_pretty(&output).context("JSON serialization failed")?;
    write_output(args.output_file.as_ref(), &json)
}

fn print_summary(output: &OutputReport<'_>, report: &BasketReport) {
    let r = output.summary.totals;
    eprintln!("\n{}", "=".repeat(72));
    eprintln!("Velocity Backtest Results");
    eprintln!("{}", "=".repeat(72));
    eprintln!(
        "Window: {} | Investment: {:.2} | Instruments: {} ({} skipped) | Elapsed: {}ms",
        output.meta.window,
        output.meta.investment,
        output.meta.instruments_requested,
        output.meta.instruments_skipped,
        output.meta.elapsed_ms
    );
    eprintln!("{}", "-".repeat(72));
    eprintln!(
        "{:<12} {:>8} {:>8} {:>14} {:>14} {:>10}",
        "Instrument", "Buys", "Sells", "Invested", "Sales", "Days"
    );
    eprintln!("{}", "-".repeat(72));

    for inst in &report.instruments {
        match &inst.outcome {
            InstrumentOutcome::Completed { run, .. } => eprintln!(
                "{:<12} {:>8} {:>8} {:>14.2} {:>14.2} {:>10}",
                inst.instrument,
                run.buy_count,
                run.triggered_sell_count,
                run.total_invested,
                run.total_sales,
                run.days_at_risk,
            ),
            InstrumentOutcome::Skipped { reason } => {
                eprintln!("{:<12} skipped: {}", inst.instrument, reason)
            }
        }
    }

    eprintln!("{}", "-".repeat(72));
    eprintln!("Buy Count:            {}", r.buy_count);
    eprintln!("Triggered Sell Count: {}", r.triggered_sell_count);
    eprintln!("Total Invested:       {:.2}", r.total_invested);
    eprintln!("Total Sales:          {:.2}", r.total_sales);
    eprintln!("Total Profit:         {:.2}", r.total_profit);
    eprintln!("Days at Risk:         {}", r.days_at_risk);
    eprintln!("Years at Risk:        {:.2}", r.years_at_risk);
    match output.summary.average_yearly_return {
        Some(ret) => eprintln!("Ave Yrly Return:      {:.2}%", ret * 100.0),
        None => eprintln!("Ave Yrly Return:      n/a"),
    }
    eprintln!(
        "Win Rate:             {:.1}% over {} trades",
        output.trade_stats.win_rate * 100.0,
        output.trade_stats.total_trades
    );
    eprintln!("{}", "=".repeat(72));
}

#[derive(Debug, Serialize)]
struct VelocityRow {
    index: usize,
    date: NaiveDate,
    price: f64,
    up: f64,
    down: f64,
}

fn velocity_rows(series: &PriceSeries, velocity: &VelocitySeries) -> Vec<VelocityRow> {
    velocity
        .points()
        .iter()
        .filter_map(|p| {
            let obs = series.observation(p.index)?;
            Some(VelocityRow {
                index: p.index,
                date: obs.date,
                price: obs.price,
                up: p.up,
                down: p.down,
            })
        })
        .collect()
}

fn velocity_csv(rows: &[VelocityRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|err| anyhow!("failed to flush CSV: {}", err.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn run_velocity(args: &VelocityArgs, config: &mut VeloConfig) -> Result<()> {
    args.data.apply(config);
    if let Some(window) = args.window {
        config.velocity.window = window;
    }
    config.validate()?;

    let series = price_source(config).history(
        &args.instrument,
        config.backtest.start,
        config.backtest.end,
    )?;
    let velocity = VelocityCrossover::new(&config.velocity)
        .velocity(&series)
        .with_context(|| format!("velocity for '{}'", args.instrument))?;

    let rows = velocity_rows(&series, &velocity);
    info!(
        instrument = %args.instrument,
        window = velocity.window(),
        points = rows.len(),
        "velocity computed"
    );

    let body = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&rows)?,
        OutputFormat::Csv => velocity_csv(&rows)?,
    };
    write_output(args.output_file.as_ref(), &body)
}

fn run_volatility(args: &VolatilityArgs, config: &mut VeloConfig) -> Result<()> {
    args.data.apply(config);

    let series = price_source(config).history(
        &args.instrument,
        config.backtest.start,
        config.backtest.end,
    )?;
    let vol = volatility::over_sessions(series.prices(), args.sessions)
        .with_context(|| format!("volatility for '{}'", args.instrument))?;
    let last = series
        .last()
        .ok_or_else(|| anyhow!("no prices for '{}'", args.instrument))?;

    let suffix = if args.sessions == 1 { "" } else { "s" };
    let diff = last.price * vol;
    println!(
        "Volatility over {} session{} : {:.2} pct",
        args.sessions,
        suffix,
        vol * 100.0
    );
    println!("Reference price: $ {:.2} ({})", last.price, last.date);
    println!("Range of 1 std for given period:");
    println!("Low price: $ {:.2}", last.price - diff);
    println!("High price: $ {:.2}", last.price + diff);
    Ok(())
}
