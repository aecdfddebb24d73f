use velo_core::{PriceSeries, Result, ReversalEvent};

/// Unique strategy identifier.
pub type StrategyId = &'static str;

/// Signal interface for backtesting.
///
/// A strategy turns one instrument's price history into an ordered stream of
/// alternating Buy/Sell events. All strategies must be Send + Sync so a
/// basket can be evaluated on the rayon pool.
pub trait Strategy: Send + Sync {
    /// Reversal events over `series`, in time order.
    ///
    /// Fails with `InsufficientHistory` when `series` is too short to
    /// produce any signal.
    fn reversals(&self, series: &PriceSeries) -> Result<Vec<ReversalEvent>>;

    /// Number of leading observations that only prime the indicator.
    fn warmup(&self) -> usize;

    /// Return the strategy's unique identifier.
    fn id(&self) -> StrategyId;
}
