pub mod metrics;
pub mod parallel;
pub mod simulator;

pub use metrics::{BuyAndHold, TradeStats};
pub use parallel::{BasketReport, BasketRunner, InstrumentOutcome, InstrumentReport};
pub use simulator::{BacktestResult, BacktestSimulator, InstrumentRun, Trade};
