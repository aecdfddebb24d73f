use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use velo_core::{Action, PriceSeries, Result, ReversalEvent, VeloError};

use crate::metrics::{yearly_return, DAYS_PER_YEAR};

/// A single closed position.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub instrument: String,
    pub buy_date: NaiveDate,
    pub sell_date: NaiveDate,
    pub buy_price: f64,
    pub sell_price: f64,
    pub proceeds: f64,
    pub pnl: f64,
    pub days_held: i64,
    /// False when the position was closed because the data ran out.
    pub triggered: bool,
}

/// Accounting for one instrument's pass over its reversal events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentRun {
    pub buy_count: usize,
    pub triggered_sell_count: usize,
    pub total_invested: f64,
    pub total_sales: f64,
    pub days_at_risk: i64,
    pub trades: Vec<Trade>,
}

impl InstrumentRun {
    /// Whether the last position had to be closed at the end of the series.
    pub fn forced_close(&self) -> bool {
        self.trades.last().map_or(false, |t| !t.triggered)
    }
}

/// Aggregate statistics across every instrument in a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestResult {
    pub buy_count: usize,
    pub triggered_sell_count: usize,
    pub total_invested: f64,
    pub total_sales: f64,
    pub total_profit: f64,
    pub days_at_risk: i64,
    pub years_at_risk: f64,
}

impl BacktestResult {
    /// Fold one instrument's accounting into the totals.
    pub fn absorb(&mut self, run: &InstrumentRun) {
        self.buy_count += run.buy_count;
        self.triggered_sell_count += run.triggered_sell_count;
        self.total_invested += run.total_invested;
        self.total_sales += run.total_sales;
        self.days_at_risk += run.days_at_risk;
        self.total_profit = self.total_sales - self.total_invested;
        self.years_at_risk = self.days_at_risk as f64 / DAYS_PER_YEAR;
    }

    /// `total_profit / total_invested`.
    pub fn simple_return(&self) -> Result<f64> {
        if self.total_invested == 0.0 {
            return Err(VeloError::DivisionByZero("total invested is zero"));
        }
        Ok(self.total_profit / self.total_invested)
    }

    /// Simple return annualized over the years at risk.
    pub fn average_yearly_return(&self) -> Result<f64> {
        yearly_return(self.simple_return()?, self.years_at_risk)
    }
}

#[derive(Debug, Clone, Copy)]
struct PositionRecord {
    buy_price: f64,
    buy_date: NaiveDate,
}

/// Fixed-stake long-only simulator driven by reversal events.
///
/// Every Buy commits the same `investment`; every exit realizes
/// `investment * sell_price / buy_price`. A position still open when the
/// series ends is closed at the last observation but is not counted as a
/// triggered sell.
#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    investment: f64,
}

impl BacktestSimulator {
    pub fn new(investment: f64) -> Self {
        Self { investment }
    }

    #[inline]
    pub fn investment(&self) -> f64 {
        self.investment
    }

    pub fn simulate(
        &self,
        instrument: &str,
        series: &PriceSeries,
        events: &[ReversalEvent],
    ) -> InstrumentRun {
        let mut run = InstrumentRun::default();
        let mut position: Option<PositionRecord> = None;

        for event in events {
            match (event.action, position) {
                (Action::Buy, None) => {
                    position = Some(PositionRecord {
                        buy_price: event.price,
                        buy_date: event.date,
                    });
                    run.buy_count += 1;
                    run.total_invested += self.investment;
                }
                (Action::Sell, Some(open)) => {
                    self.close(&mut run, instrument, open, event.date, event.price, true);
                    run.triggered_sell_count += 1;
                    position = None;
                }
                // Alternation makes these unreachable for detector output.
                (action, _) => {
                    debug!(instrument, index = event.index, %action, "ignoring out-of-turn action");
                }
            }
        }

        if let (Some(open), Some(last)) = (position, series.last()) {
            info!(
                instrument,
                date = %last.date,
                price = last.price,
                "still invested at end of series, closing position"
            );
            self.close(&mut run, instrument, open, last.date, last.price, false);
        }

        run
    }

    fn close(
        &self,
        run: &mut InstrumentRun,
        instrument: &str,
        open: PositionRecord,
        sell_date: NaiveDate,
        sell_price: f64,
        triggered: bool,
    ) {
        let proceeds = self.investment * sell_price / open.buy_price;
        let days_held = (sell_date - open.buy_date).num_days();
        run.total_sales += proceeds;
        run.days_at_risk += days_held;
        run.trades.push(Trade {
            instrument: instrument.to_string(),
            buy_date: open.buy_date,
            sell_date,
            buy_price: open.buy_price,
            sell_price,
            proceeds,
            pnl: proceeds - self.investment,
            days_held,
            triggered,
        });
    }
}

impl Default for BacktestSimulator {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}
