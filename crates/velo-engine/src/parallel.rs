use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use velo_core::{PriceSource, Result};
use velo_signal::traits::Strategy;
use velo_signal::volatility;

use crate::metrics::{BuyAndHold, TradeStats};
use crate::simulator::{BacktestResult, BacktestSimulator, InstrumentRun};

/// What happened to one instrument in a basket run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstrumentOutcome {
    Completed {
        observations: usize,
        /// Date of the first observation that produces a signal.
        first_signal_date: Option<NaiveDate>,
        events: usize,
        run: InstrumentRun,
        buy_and_hold: Option<BuyAndHold>,
        daily_volatility: Option<f64>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentReport {
    pub instrument: String,
    pub outcome: InstrumentOutcome,
}

impl InstrumentReport {
    pub fn run(&self) -> Option<&InstrumentRun> {
        match &self.outcome {
            InstrumentOutcome::Completed { run, .. } => Some(run),
            InstrumentOutcome::Skipped { .. } => None,
        }
    }
}

/// Aggregate result plus per-instrument detail for one basket.
#[derive(Debug, Clone, Serialize)]
pub struct BasketReport {
    pub strategy_id: String,
    pub investment: f64,
    pub result: BacktestResult,
    pub instruments: Vec<InstrumentReport>,
}

impl BasketReport {
    pub fn trade_stats(&self) -> TradeStats {
        TradeStats::from_trades(
            self.instruments
                .iter()
                .filter_map(InstrumentReport::run)
                .flat_map(|run| run.trades.iter()),
        )
    }

    pub fn skipped(&self) -> impl Iterator<Item = &InstrumentReport> + '_ {
        self.instruments.iter().filter(|r| r.run().is_none())
    }
}

/// Backtest a basket of instruments, optionally fanning out on rayon.
///
/// Each instrument owns its trackers and simulator state. Outcomes are
/// collected in input order and folded into a single `BacktestResult` on the
/// calling thread, so parallel and sequential runs produce identical totals.
/// A failing instrument is reported as skipped and never aborts the basket.
pub struct BasketRunner {
    simulator: BacktestSimulator,
    strategy: Box<dyn Strategy>,
    parallel: bool,
}

impl BasketRunner {
    pub fn new(simulator: BacktestSimulator, strategy: Box<dyn Strategy>) -> Self {
        Self {
            simulator,
            strategy,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn run(
        &self,
        source: &dyn PriceSource,
        instruments: &[String],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> BasketReport {
        let reports: Vec<InstrumentReport> = if self.parallel {
            instruments
                .par_iter()
                .map(|name| self.report(source, name, start, end))
                .collect()
        } else {
            instruments
                .iter()
                .map(|name| self.report(source, name, start, end))
                .collect()
        };

        let mut result = BacktestResult::default();
        for run in reports.iter().filter_map(InstrumentReport::run) {
            result.absorb(run);
        }

        BasketReport {
            strategy_id: self.strategy.id().to_string(),
            investment: self.simulator.investment(),
            result,
            instruments: reports,
        }
    }

    fn report(
        &self,
        source: &dyn PriceSource,
        instrument: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> InstrumentReport {
        info!(instrument, "running simulation");
        let outcome = match self.run_instrument(source, instrument, start, end) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(instrument, error = %e, "skipping instrument");
                InstrumentOutcome::Skipped {
                    reason: e.to_string(),
                }
            }
        };
        InstrumentReport {
            instrument: instrument.to_string(),
            outcome,
        }
    }

    fn run_instrument(
        &self,
        source: &dyn PriceSource,
        instrument: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<InstrumentOutcome> {
        let series = source.history(instrument, start, end)?;
        let events = self.strategy.reversals(&series)?;
        let first_signal_date = series
            .observation(self.strategy.warmup())
            .map(|obs| obs.date);
        if let Some(date) = first_signal_date {
            info!(instrument, %date, events = events.len(), "valid data starts");
        }

        let run = self.simulator.simulate(instrument, &series, &events);

        Ok(InstrumentOutcome::Completed {
            observations: series.len(),
            first_signal_date,
            events: events.len(),
            run,
            buy_and_hold: BuyAndHold::from_series(&series).ok(),
            daily_volatility: volatility::daily(series.prices()).ok(),
        })
    }
}
