use std::collections::BTreeMap;

use analysis_core::{stats, PricePoint};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Market beta of an asset against a benchmark from monthly returns.
///
/// Both daily series are inner-joined on date, restricted to the trailing
/// `lookback_years`, and sampled at the last close of each calendar month.
/// Returns `1.0` when fewer than two monthly returns survive or when the
/// benchmark shows no variance.
pub fn market_beta(asset: &[PricePoint], benchmark: &[PricePoint], lookback_years: u32) -> f64 {
    let joined = join_on_date(asset, benchmark);
    let Some(&(latest, _, _)) = joined.last() else {
        tracing::debug!("No overlapping asset/benchmark dates, beta defaults to 1.0");
        return 1.0;
    };

    let cutoff = latest
        .checked_sub_months(Months::new(lookback_years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN);
    let window: Vec<(NaiveDate, f64, f64)> = joined
        .into_iter()
        .filter(|(d, _, _)| *d >= cutoff)
        .collect();

    let (asset_monthly, bench_monthly) = month_end_closes(&window);
    let asset_returns = stats::pct_change(&asset_monthly);
    let bench_returns = stats::pct_change(&bench_monthly);

    if asset_returns.len() < 2 {
        tracing::debug!("Fewer than 2 monthly returns, beta defaults to 1.0");
        return 1.0;
    }

    let covariance = stats::covariance(&asset_returns, &bench_returns);
    let bench_variance = stats::covariance(&bench_returns, &bench_returns);
    match (covariance, bench_variance) {
        (Some(cov), Some(var)) if var != 0.0 && cov.is_finite() && var.is_finite() => cov / var,
        _ => 1.0,
    }
}

fn join_on_date(asset: &[PricePoint], benchmark: &[PricePoint]) -> Vec<(NaiveDate, f64, f64)> {
    let bench: BTreeMap<NaiveDate, f64> = benchmark.iter().map(|p| (p.date, p.close)).collect();
    let asset: BTreeMap<NaiveDate, f64> = asset.iter().map(|p| (p.date, p.close)).collect();
    asset
        .into_iter()
        .filter_map(|(date, close)| bench.get(&date).map(|&b| (date, close, b)))
        .filter(|(_, a, b)| a.is_finite() && b.is_finite())
        .collect()
}

fn month_end_closes(rows: &[(NaiveDate, f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    let mut months: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    // rows are date-ordered, so the last insert per month wins
    for (date, asset, bench) in rows {
        months.insert((date.year(), date.month()), (*asset, *bench));
    }
    months.values().copied().unzip()
}

/// Beta after the Hamada unlever/relever round trip.
///
/// Relevering uses the same current debt/equity ratio as unlevering, so
/// `relevered == market_beta` by construction. The step is kept as an explicit
/// identity; a distinct target leverage would be a new input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HamadaBeta {
    pub market_beta: f64,
    pub unlevered: f64,
    pub relevered: f64,
    /// `None` when market cap is zero and leverage cannot be measured.
    pub debt_to_equity: Option<f64>,
}

pub fn hamada_beta(
    market_beta: f64,
    tax_rate: f64,
    total_debt: f64,
    market_cap: f64,
) -> HamadaBeta {
    if market_cap == 0.0 || market_cap + total_debt == 0.0 {
        return HamadaBeta {
            market_beta,
            unlevered: market_beta,
            relevered: market_beta,
            debt_to_equity: None,
        };
    }

    let debt_to_equity = total_debt / market_cap;
    let leverage_factor = 1.0 + (1.0 - tax_rate) * debt_to_equity;
    let unlevered = market_beta / leverage_factor;
    HamadaBeta {
        market_beta,
        unlevered,
        relevered: unlevered * leverage_factor,
        debt_to_equity: Some(debt_to_equity),
    }
}
