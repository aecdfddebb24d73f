use chrono::NaiveDate;
use serde::Serialize;

use velo_core::{PriceSeries, Result, VeloError};

use crate::simulator::Trade;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Annualize a simple return earned over `years`: `(1 + r)^(1/years) - 1`.
pub fn yearly_return(total_return: f64, years: f64) -> Result<f64> {
    if years == 0.0 {
        return Err(VeloError::DivisionByZero("zero years at risk"));
    }
    Ok((1.0 + total_return).powf(1.0 / years) - 1.0)
}

/// Annualize a growth multiple (`end / start`) realized over `years`.
pub fn yearly_growth(growth: f64, years: f64) -> Result<f64> {
    yearly_return(growth - 1.0, years)
}

/// Passive benchmark: buy at the first observation, hold to the last.
#[derive(Debug, Clone, Serialize)]
pub struct BuyAndHold {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub years: f64,
    pub start_price: f64,
    pub end_price: f64,
    pub growth: f64,
    pub yearly_growth: f64,
}

impl BuyAndHold {
    pub fn from_series(series: &PriceSeries) -> Result<Self> {
        let (first, last) = match (series.first(), series.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Err(VeloError::InsufficientHistory {
                    required: 1,
                    actual: 0,
                })
            }
        };
        let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
        let growth = last.price / first.price;

        Ok(Self {
            start: first.date,
            end: last.date,
            years,
            start_price: first.price,
            end_price: last.price,
            growth,
            yearly_growth: yearly_growth(growth, years)?,
        })
    }
}

/// Per-trade statistics over a ledger.
#[derive(Debug, Clone, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub forced_closes: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_days_held: f64,
}

impl TradeStats {
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let trades: Vec<&Trade> = trades.into_iter().collect();
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let avg_days_held = if trades.is_empty() {
            0.0
        } else {
            trades.iter().map(|t| t.days_held as f64).sum::<f64>() / trades.len() as f64
        };

        Self {
            total_trades: trades.len(),
            forced_closes: trades.iter().filter(|t| !t.triggered).count(),
            win_rate: win_rate(&pnls),
            profit_factor: profit_factor(&pnls),
            avg_days_held,
        }
    }
}

fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let wins = pnls.iter().filter(|&&p| p > 0.0).count();
    wins as f64 / pnls.len() as f64
}

fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}
