use analysis_core::stats;
use statrs::statistics::Statistics;

use crate::TRADING_DAYS_PER_YEAR;

/// Annualized historical volatility from daily closes.
///
/// Uses the sample standard deviation of daily log-returns over the trailing
/// `window` returns (all of them when `None`), scaled by √252. `None` when the
/// history is empty or too short to estimate a dispersion.
pub fn historical_volatility(closes: &[f64], window: Option<usize>) -> Option<f64> {
    if closes.is_empty() {
        return None;
    }

    let returns = stats::log_returns(closes);
    let start = window.map_or(0, |w| returns.len().saturating_sub(w));
    let trailing = &returns[start..];
    if trailing.len() < 2 {
        return None;
    }

    let daily = trailing.std_dev();
    if daily.is_finite() {
        Some(daily * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_history_is_unavailable() {
        assert!(historical_volatility(&[], None).is_none());
        assert!(historical_volatility(&[10.0], None).is_none());
        assert!(historical_volatility(&[10.0, 11.0], None).is_none());
    }

    #[test]
    fn test_constant_growth_has_zero_volatility() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let vol = historical_volatility(&closes, None).unwrap();
        assert!(vol.abs() < 1e-9);
    }

    #[test]
    fn test_alternating_returns() {
        // log-returns alternate between +ln(1.1) and -ln(1.1)
        let closes = vec![100.0, 110.0, 100.0, 110.0, 100.0];
        let r = (1.1f64).ln();
        let returns = [r, -r, r, -r];
        let mean = 0.0;
        let var = returns.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 3.0;
        let expected = var.sqrt() * 252f64.sqrt();
        let vol = historical_volatility(&closes, None).unwrap();
        assert_relative_eq!(vol, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_window_uses_trailing_returns() {
        // Calm first half, choppy second half
        let mut closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.01).collect();
        let last = *closes.last().unwrap();
        closes.extend((0..20).map(|i| if i % 2 == 0 { last * 1.05 } else { last }));
        let full = historical_volatility(&closes, None).unwrap();
        let recent = historical_volatility(&closes, Some(10)).unwrap();
        assert!(recent > full);
    }
}
