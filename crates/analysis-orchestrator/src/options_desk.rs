use chrono::NaiveDate;
use quant_analysis::{
    historical_volatility, price_option, time_to_expiry_years, OptionQuote, OptionType,
    PricingInputs, PricingResult,
};
use serde::{Deserialize, Serialize};

use crate::recommendation::{synthesize, Recommendation, SignalContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilitySource {
    Historical,
    Fallback,
}

/// Annualized volatility of the underlying, or the configured fallback when
/// the history is too short. A measured zero volatility is kept, so the
/// option prices as degenerate.
pub fn resolve_volatility(
    closes: &[f64],
    window_days: usize,
    fallback: f64,
) -> (f64, VolatilitySource) {
    match historical_volatility(closes, Some(window_days)) {
        Some(vol) => (vol, VolatilitySource::Historical),
        None => {
            tracing::debug!("Historical volatility unavailable, using fallback {:.2}", fallback);
            (fallback, VolatilitySource::Fallback)
        }
    }
}

/// Everything known about the underlying when its chain is priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingView {
    pub ticker: String,
    pub spot: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub volatility_source: VolatilitySource,
    pub signals: SignalContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionAnalysis {
    pub quote: OptionQuote,
    pub inputs: PricingInputs,
    pub pricing: PricingResult,
    /// Mispricing at or below the underpricing threshold.
    pub underpriced: bool,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainAnalysis {
    pub underlying: UnderlyingView,
    pub calls: Vec<OptionAnalysis>,
    pub puts: Vec<OptionAnalysis>,
}

impl ChainAnalysis {
    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Price one observed option and attach its recommendation.
pub fn analyze_option(
    quote: &OptionQuote,
    underlying: &UnderlyingView,
    today: NaiveDate,
    underpricing_threshold_pct: f64,
) -> OptionAnalysis {
    let inputs = PricingInputs {
        spot: underlying.spot,
        strike: quote.strike,
        time_to_expiry: time_to_expiry_years(today, quote.expiry),
        risk_free_rate: underlying.risk_free_rate,
        volatility: underlying.volatility,
    };
    let pricing = price_option(&inputs, quote.option_type, quote.market_price);
    let underpriced = pricing
        .mispricing_pct
        .is_some_and(|m| m <= underpricing_threshold_pct);
    let recommendation = synthesize(quote.option_type, underpriced, &underlying.signals);

    OptionAnalysis {
        quote: quote.clone(),
        inputs,
        pricing,
        underpriced,
        recommendation,
    }
}

/// Price a whole chain, split into calls and puts in chain order.
pub fn analyze_chain(
    chain: &[OptionQuote],
    underlying: UnderlyingView,
    today: NaiveDate,
    underpricing_threshold_pct: f64,
) -> ChainAnalysis {
    let (calls, puts): (Vec<_>, Vec<_>) = chain
        .iter()
        .map(|quote| analyze_option(quote, &underlying, today, underpricing_threshold_pct))
        .partition(|a| a.quote.option_type == OptionType::Call);

    tracing::debug!(
        "Priced {} calls and {} puts on {} (vol {:.3})",
        calls.len(),
        puts.len(),
        underlying.ticker,
        underlying.volatility
    );

    ChainAnalysis {
        underlying,
        calls,
        puts,
    }
}
