//! Descriptive statistics over plain `f64` slices.
//!
//! Sample statistics use the `n - 1` denominator so they agree with the
//! estimators the rest of the engine documents (return volatility, beta).
//! Functions that cannot produce a meaningful figure return `None` instead
//! of a placeholder zero.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample variance.
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let sum_sq = data.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    Some(sum_sq / (data.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Sample covariance of two equally long series.
pub fn covariance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let sum = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum::<f64>();
    Some(sum / (a.len() - 1) as f64)
}

/// Simple period-over-period returns: `p[i] / p[i-1] - 1`.
pub fn pct_change(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Natural-log returns: `ln(p[i] / p[i-1])`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Mean of the trailing `window` values.
pub fn trailing_mean(data: &[f64], window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let start = data.len().saturating_sub(window);
    mean(&data[start..])
}

/// Ratio that stays undefined instead of blowing up on a zero denominator.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        None
    } else {
        Some(numerator / denominator)
    }
}
