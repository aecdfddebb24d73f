use velo_core::{Result, VeloError};

/// Population standard deviation of session-over-session growth `p[i] / p[i-1]`.
pub fn daily(prices: &[f64]) -> Result<f64> {
    if prices.len() < 2 {
        return Err(VeloError::InsufficientHistory {
            required: 2,
            actual: prices.len(),
        });
    }
    let growth: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0]).collect();
    let n = growth.len() as f64;
    let mean = growth.iter().sum::<f64>() / n;
    let variance = growth.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / n;
    Ok(variance.sqrt())
}

/// Daily volatility scaled to `sessions` sessions.
pub fn over_sessions(prices: &[f64], sessions: usize) -> Result<f64> {
    Ok((sessions as f64).sqrt() * daily(prices)?)
}
