use velo_core::config::VelocityConfig;
use velo_core::{PriceSeries, Result, ReversalEvent};

use crate::reversal::ReversalDetector;
use crate::traits::{Strategy, StrategyId};
use crate::velocity::VelocitySeries;

/// Velocity crossover: buy when the trailing high becomes fresher than the
/// trailing low, sell on the opposite crossing.
#[derive(Debug, Clone)]
pub struct VelocityCrossover {
    window: usize,
}

impl VelocityCrossover {
    pub fn new(config: &VelocityConfig) -> Self {
        Self::with_window(config.window)
    }

    pub fn with_window(window: usize) -> Self {
        Self { window }
    }

    pub fn velocity(&self, series: &PriceSeries) -> Result<VelocitySeries> {
        VelocitySeries::compute(series.prices(), self.window)
    }
}

impl Strategy for VelocityCrossover {
    fn reversals(&self, series: &PriceSeries) -> Result<Vec<ReversalEvent>> {
        let velocity = self.velocity(series)?;
        ReversalDetector::detect(velocity.points(), series)
    }

    fn warmup(&self) -> usize {
        self.window
    }

    fn id(&self) -> StrategyId {
        "velocity_crossover"
    }
}
