use fundamental_analysis::{
    CompanyFinancials, CompanyStatements, FundamentalAnalysisEngine, MarketQuote, ValuationResult,
};
use quant_analysis::MarketSnapshot;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default number of rows kept per ranking.
pub const DEFAULT_RANKING_LIMIT: usize = 20;

/// Inputs for one company in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInput {
    pub statements: CompanyStatements,
    pub quote: MarketQuote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenFailure {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenerResult {
    pub valuations: Vec<ValuationResult>,
    pub failures: Vec<ScreenFailure>,
    pub total_analyzed: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ScreenerResult {
    pub fn succeeded(&self) -> usize {
        self.valuations.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Value every company independently on the rayon pool.
///
/// A failed company is logged and reported in `failures`; it never stops the
/// batch. Output keeps the input order.
pub fn screen_companies(
    engine: &FundamentalAnalysisEngine,
    companies: &[CompanyInput],
    market: &MarketSnapshot,
) -> ScreenerResult {
    let total_analyzed = companies.len();
    tracing::info!("Starting valuation screen of {} companies", total_analyzed);

    let outcomes: Vec<Result<ValuationResult, ScreenFailure>> = companies
        .par_iter()
        .map(|company| {
            let financials = CompanyFinancials::from_statements(&company.statements);
            engine
                .value_company(&financials, &company.quote, market)
                .map_err(|e| {
                    tracing::warn!("Valuation of {} skipped: {}", company.quote.ticker, e);
                    ScreenFailure {
                        ticker: company.quote.ticker.clone(),
                        reason: e.to_string(),
                    }
                })
        })
        .collect();

    let mut valuations = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(v) => valuations.push(v),
            Err(f) => failures.push(f),
        }
    }

    tracing::info!(
        "Screen complete: {} analyzed, {} valued, {} failed",
        total_analyzed,
        valuations.len(),
        failures.len()
    );

    ScreenerResult {
        valuations,
        failures,
        total_analyzed,
        timestamp: chrono::Utc::now(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankingMetric {
    MarginOfSafety,
    Roic,
    Eva,
    Efv,
}

impl RankingMetric {
    pub fn value(&self, v: &ValuationResult) -> Option<f64> {
        let raw = match self {
            RankingMetric::MarginOfSafety => v.margin_of_safety_pct?,
            RankingMetric::Roic => v.roic,
            RankingMetric::Eva => v.eva,
            RankingMetric::Efv => v.efv,
        };
        raw.is_finite().then_some(raw)
    }
}

/// Best `limit` companies by `metric`, descending. Undefined values sort last.
pub fn rank(
    valuations: &[ValuationResult],
    metric: RankingMetric,
    limit: usize,
) -> Vec<ValuationResult> {
    let mut ranked: Vec<&ValuationResult> = valuations.iter().collect();
    ranked.sort_by(|a, b| match (metric.value(a), metric.value(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked.into_iter().take(limit).cloned().collect()
}
