use velo_core::{Result, VeloError};

use crate::extremum::ExtremumTracker;

/// Up/down velocity at one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityPoint {
    /// Position in the source price series.
    pub index: usize,
    /// `(window - days_since_high) / window`, in `[0, 1]`.
    pub up: f64,
    /// `(window - days_since_low) / window`, in `[0, 1]`.
    pub down: f64,
    pub days_since_high: usize,
    pub days_since_low: usize,
}

/// Paired up/down velocity for every observation from `window` onward.
///
/// The first `window` observations only prime the trackers and produce no
/// points, so `points()[k].index == window + k`.
#[derive(Debug, Clone)]
pub struct VelocitySeries {
    window: usize,
    points: Vec<VelocityPoint>,
}

impl VelocitySeries {
    pub fn compute(prices: &[f64], window: usize) -> Result<Self> {
        if window == 0 {
            return Err(VeloError::InvalidWindow(window));
        }
        let required = window + 1;
        if prices.len() < required {
            return Err(VeloError::InsufficientHistory {
                required,
                actual: prices.len(),
            });
        }

        let mut highs = ExtremumTracker::highs(prices, window)?;
        let mut lows = ExtremumTracker::lows(prices, window)?;
        for i in 0..window {
            highs.insert(i)?;
            lows.insert(i)?;
        }

        let scale = window as f64;
        let mut points = Vec::with_capacity(prices.len() - window);
        for i in window..prices.len() {
            let days_since_high = highs.insert(i)?;
            let days_since_low = lows.insert(i)?;
            points.push(VelocityPoint {
                index: i,
                up: (window - days_since_high) as f64 / scale,
                down: (window - days_since_low) as f64 / scale,
                days_since_high,
                days_since_low,
            });
        }

        Ok(Self { window, points })
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn points(&self) -> &[VelocityPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SCENARIO: [f64; 10] = [10.0, 9.0, 8.0, 7.0, 6.0, 9.0, 6.0, 8.0, 5.0, 7.0];

    #[test]
    fn test_scenario_values() {
        let vel = VelocitySeries::compute(&SCENARIO, 3).unwrap();
        assert_eq!(vel.len(), 7);
        assert_eq!(vel.points()[0].index, 3);

        let highs: Vec<usize> = vel.points().iter().map(|p| p.days_since_high).collect();
        let lows: Vec<usize> = vel.points().iter().map(|p| p.days_since_low).collect();
        assert_eq!(highs, vec![3, 3, 0, 1, 2, 3, 2]);
        assert_eq!(lows, vec![0, 0, 1, 2, 3, 0, 1]);

        for p in vel.points() {
            assert!((0.0..=1.0).contains(&p.up));
            assert!((0.0..=1.0).contains(&p.down));
            assert_eq!(p.up, (3 - p.days_since_high) as f64 / 3.0);
            assert_eq!(p.down, (3 - p.days_since_low) as f64 / 3.0);
        }
    }

    #[test]
    fn test_exact_minimum_history() {
        let vel = VelocitySeries::compute(&[1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(vel.len(), 1);
        let p = vel.points()[0];
        assert_eq!(p.index, 2);
        assert_eq!(p.up, 1.0);
        // The low at index 0 is exactly `window` steps old and still counts.
        assert_eq!(p.days_since_low, 2);
        assert_eq!(p.down, 0.0);
    }

    #[test]
    fn test_insufficient_history() {
        let err = VelocitySeries::compute(&[1.0, 2.0, 3.0], 3).unwrap_err();
        assert!(matches!(
            err,
            VeloError::InsufficientHistory { required: 4, actual: 3 }
        ));
    }

    #[test]
    fn test_zero_window() {
        assert!(matches!(
            VelocitySeries::compute(&[1.0, 2.0], 0),
            Err(VeloError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_priming_does_not_depend_on_early_prices() {
        // Output only starts at `window`, whatever the priming prices are.
        let a = VelocitySeries::compute(&[1.0, 1.0, 1.0, 5.0, 6.0], 3).unwrap();
        let b = VelocitySeries::compute(&[9.0, 0.5, 3.0, 5.0, 6.0], 3).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.points()[0].index, 3);
        assert_eq!(b.points()[0].index, 3);
        assert_eq!(a.window(), 3);
    }

    proptest! {
        #[test]
        fn test_points_start_at_window(
            raw in prop::collection::vec(1u16..500, 2..200),
            window in 1usize..40,
        ) {
            let prices: Vec<f64> = raw.into_iter().map(f64::from).collect();
            prop_assume!(prices.len() > window);
            let vel = VelocitySeries::compute(&prices, window).unwrap();

            prop_assert_eq!(vel.window(), window);
            prop_assert_eq!(vel.len(), prices.len() - window);
            for (k, p) in vel.points().iter().enumerate() {
                prop_assert!(p.index >= window);
                prop_assert_eq!(p.index, window + k);
                prop_assert!(p.days_since_high <= window);
                prop_assert!(p.days_since_low <= window);
                prop_assert!((0.0..=1.0).contains(&p.up));
                prop_assert!((0.0..=1.0).contains(&p.down));
            }
        }
    }
}
