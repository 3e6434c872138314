use analysis_core::{stats, PricePoint};
use serde::{Deserialize, Serialize};

use crate::TRADING_DAYS_PER_YEAR;

/// Values used when the market-data collaborator could not provide a figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketFallbacks {
    pub risk_free_rate: f64,
    pub market_return: f64,
}

impl Default for MarketFallbacks {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.105,
            market_return: 0.12,
        }
    }
}

/// Market conditions as of analysis time. Immutable for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub risk_free_rate: f64,
    pub expected_market_return: f64,
    pub market_risk_premium: f64,
    /// Daily closes of the benchmark index, oldest first.
    pub benchmark: Vec<PricePoint>,
}

impl MarketSnapshot {
    pub fn new(
        risk_free_rate: f64,
        expected_market_return: f64,
        benchmark: Vec<PricePoint>,
    ) -> Self {
        Self {
            risk_free_rate,
            expected_market_return,
            market_risk_premium: expected_market_return - risk_free_rate,
            benchmark,
        }
    }

    /// Assemble a snapshot from pre-fetched inputs.
    ///
    /// The expected market return compounds the benchmark's mean daily return
    /// over a trading year. Missing inputs fall back to `fallbacks`.
    pub fn build(
        risk_free_rate: Option<f64>,
        mut benchmark: Vec<PricePoint>,
        fallbacks: &MarketFallbacks,
    ) -> Self {
        benchmark.sort_by_key(|p| p.date);

        let risk_free_rate = match risk_free_rate {
            Some(rate) if rate.is_finite() => rate,
            _ => {
                tracing::warn!(
                    "Risk-free rate unavailable, using fallback {:.4}",
                    fallbacks.risk_free_rate
                );
                fallbacks.risk_free_rate
            }
        };

        let closes: Vec<f64> = benchmark.iter().map(|p| p.close).collect();
        let expected_market_return = match stats::mean(&stats::pct_change(&closes)) {
            Some(daily) if daily.is_finite() => (1.0 + daily).powf(TRADING_DAYS_PER_YEAR) - 1.0,
            _ => {
                tracing::warn!(
                    "Benchmark series too short, using fallback market return {:.4}",
                    fallbacks.market_return
                );
                fallbacks.market_return
            }
        };

        Self::new(risk_free_rate, expected_market_return, benchmark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn benchmark(daily_return: f64, days: usize) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut price = 100_000.0;
        (0..days)
            .map(|i| {
                let point = PricePoint::new(start + Duration::days(i as i64), price);
                price *= 1.0 + daily_return;
                point
            })
            .collect()
    }

    #[test]
    fn test_premium_is_market_return_minus_risk_free() {
        let snapshot = MarketSnapshot::new(0.10, 0.15, vec![]);
        assert_relative_eq!(snapshot.market_risk_premium, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_build_annualizes_mean_daily_return() {
        let snapshot =
            MarketSnapshot::build(Some(0.11), benchmark(0.0005, 60), &MarketFallbacks::default());
        let expected = (1.0005f64).powf(252.0) - 1.0;
        assert_relative_eq!(snapshot.expected_market_return, expected, epsilon = 1e-9);
        assert_relative_eq!(snapshot.risk_free_rate, 0.11);
        assert_relative_eq!(snapshot.market_risk_premium, expected - 0.11, epsilon = 1e-9);
    }

    #[test]
    fn test_build_uses_fallbacks() {
        let snapshot = MarketSnapshot::build(None, vec![], &MarketFallbacks::default());
        assert_relative_eq!(snapshot.risk_free_rate, 0.105);
        assert_relative_eq!(snapshot.expected_market_return, 0.12);
        assert_relative_eq!(snapshot.market_risk_premium, 0.015, epsilon = 1e-12);
    }

    #[test]
    fn test_build_sorts_benchmark() {
        let mut points = benchmark(0.001, 5);
        points.reverse();
        let snapshot = MarketSnapshot::build(Some(0.1), points, &MarketFallbacks::default());
        assert!(snapshot.benchmark.windows(2).all(|w| w[0].date < w[1].date));
        assert!(snapshot.expected_market_return > 0.0);
    }
}
