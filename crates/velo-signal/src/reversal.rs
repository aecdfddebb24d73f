use tracing::debug;

use velo_core::{Action, PriceSeries, ReversalEvent, Result, VeloError};

use crate::velocity::VelocityPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
}

/// Turns paired velocity into alternating Buy/Sell events at crossovers.
pub struct ReversalDetector;

impl ReversalDetector {
    /// Trend at the first point where up and down velocity differ.
    ///
    /// `None` when they are equal everywhere, in which case no events are
    /// ever emitted.
    pub fn initial_trend(points: &[VelocityPoint]) -> Option<Trend> {
        points.iter().find(|p| p.up != p.down).map(|p| {
            if p.up > p.down {
                Trend::Bullish
            } else {
                Trend::Bearish
            }
        })
    }

    /// Crossover actions as `(index, action)`, in time order.
    ///
    /// Equal velocities never trigger a transition.
    pub fn crossovers(points: &[VelocityPoint]) -> Vec<(usize, Action)> {
        let mut trend = match Self::initial_trend(points) {
            Some(t) => t,
            None => return Vec::new(),
        };

        let mut out = Vec::new();
        for p in points {
            match trend {
                Trend::Bullish if p.up < p.down => {
                    trend = Trend::Bearish;
                    out.push((p.index, Action::Sell));
                }
                Trend::Bearish if p.up > p.down => {
                    trend = Trend::Bullish;
                    out.push((p.index, Action::Buy));
                }
                _ => {}
            }
        }
        out
    }

    /// Dated, priced reversal events for velocity computed from `series`.
    pub fn detect(points: &[VelocityPoint], series: &PriceSeries) -> Result<Vec<ReversalEvent>> {
        Self::crossovers(points)
            .into_iter()
            .map(|(index, action)| {
                let obs = series
                    .observation(index)
                    .ok_or(VeloError::InsufficientHistory {
                        required: index + 1,
                        actual: series.len(),
                    })?;
                debug!(index, date = %obs.date, price = obs.price, %action, "reversal");
                Ok(ReversalEvent {
                    index,
                    date: obs.date,
                    action,
                    price: obs.price,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velocity::VelocitySeries;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn point(index: usize, up: f64, down: f64) -> VelocityPoint {
        VelocityPoint {
            index,
            up,
            down,
            days_since_high: 0,
            days_since_low: 0,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
    }

    #[test]
    fn test_initial_trend() {
        let flat = [point(0, 0.5, 0.5), point(1, 0.5, 0.5)];
        assert_eq!(ReversalDetector::initial_trend(&flat), None);

        let bull = [point(0, 0.5, 0.5), point(1, 0.7, 0.2)];
        assert_eq!(ReversalDetector::initial_trend(&bull), Some(Trend::Bullish));

        let bear = [point(0, 0.1, 0.9)];
        assert_eq!(ReversalDetector::initial_trend(&bear), Some(Trend::Bearish));
    }

    #[test]
    fn test_no_events_when_velocities_never_differ() {
        let flat: Vec<VelocityPoint> = (0..10).map(|i| point(i, 1.0, 1.0)).collect();
        assert!(ReversalDetector::crossovers(&flat).is_empty());
    }

    #[test]
    fn test_equality_does_not_flip() {
        let points = [
            point(0, 0.9, 0.1),
            point(1, 0.5, 0.5),
            point(2, 0.8, 0.2),
            point(3, 0.2, 0.8),
            point(4, 0.4, 0.4),
            point(5, 0.6, 0.3),
        ];
        assert_eq!(
            ReversalDetector::crossovers(&points),
            vec![(3, Action::Sell), (5, Action::Buy)]
        );
    }

    #[test]
    fn test_scenario_events() {
        let prices = [10.0, 9.0, 8.0, 7.0, 6.0, 9.0, 6.0, 8.0, 5.0, 7.0];
        let series = PriceSeries::daily(start(), &prices);
        let vel = VelocitySeries::compute(series.prices(), 3).unwrap();

        let events = ReversalDetector::detect(vel.points(), &series).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].action, Action::Buy);
        assert_eq!(events[0].index, 5);
        assert_eq!(events[0].price, 9.0);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2015, 1, 6).unwrap());

        assert_eq!(events[1].action, Action::Sell);
        assert_eq!(events[1].index, 8);
        assert_eq!(events[1].price, 5.0);
    }

    #[test]
    fn test_detect_rejects_foreign_series() {
        let series = PriceSeries::daily(start(), &[1.0, 2.0]);
        let points = [point(0, 0.1, 0.9), point(5, 0.9, 0.1)];
        assert!(ReversalDetector::detect(&points, &series).is_err());
    }

    proptest! {
        #[test]
        fn test_events_alternate(
            raw in prop::collection::vec(1u16..500, 2..300),
            window in 1usize..30,
        ) {
            let prices: Vec<f64> = raw.into_iter().map(f64::from).collect();
            prop_assume!(prices.len() > window);
            let vel = VelocitySeries::compute(&prices, window).unwrap();
            let events = ReversalDetector::crossovers(vel.points());

            for pair in events.windows(2) {
                prop_assert!(pair[0].0 < pair[1].0);
                prop_assert_eq!(pair[1].1, pair[0].1.opposite());
            }
        }
    }
}
