pub mod crossover;
pub mod extremum;
pub mod reversal;
pub mod traits;
pub mod velocity;
pub mod volatility;

pub use crossover::VelocityCrossover;
pub use extremum::ExtremumTracker;
pub use reversal::{ReversalDetector, Trend};
pub use traits::{Strategy, StrategyId};
pub use velocity::{VelocityPoint, VelocitySeries};
