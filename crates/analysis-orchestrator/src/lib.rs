use analysis_core::{closes, AnalysisError, AnalysisResult, Bar, PricePoint, TrendBias};
use chrono::NaiveDate;
use fundamental_analysis::{
    assess_health, fundamental_bias, CompanyFinancials, CompanyStatements,
    FundamentalAnalysisEngine, HealthInputs, HealthResult, MarketQuote, ValuationResult,
};
use quant_analysis::{MarketSnapshot, OptionQuote};
use serde::{Deserialize, Serialize};
use technical_analysis::{TechnicalAnalysisEngine, TechnicalSignal, WeeklyTrend};

pub mod config;
pub mod options_desk;
pub mod recommendation;
pub mod screener;

pub use config::AnalysisConfig;
pub use options_desk::{
    analyze_chain, analyze_option, ChainAnalysis, OptionAnalysis, UnderlyingView, VolatilitySource,
};
pub use recommendation::{synthesize, Recommendation, RecommendationKind, SignalContext};
pub use screener::{
    rank, screen_companies, CompanyInput, RankingMetric, ScreenFailure, ScreenerResult,
};

/// Daily signal together with the weekly trend that adjusted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalView {
    pub weekly: WeeklyTrend,
    pub daily: TechnicalSignal,
}

/// Price history of an option's underlying.
#[derive(Debug, Clone, Copy)]
pub struct UnderlyingHistory<'a> {
    pub ticker: &'a str,
    pub daily_bars: &'a [Bar],
    pub weekly_bars: &'a [Bar],
}

/// Wires the analysis engines together under one configuration.
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self {
            technical_analyzer: TechnicalAnalysisEngine::new(config.thresholds),
            fundamental_analyzer: FundamentalAnalysisEngine::new(config.valuation.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn technical_engine(&self) -> &TechnicalAnalysisEngine {
        &self.technical_analyzer
    }

    pub fn fundamental_engine(&self) -> &FundamentalAnalysisEngine {
        &self.fundamental_analyzer
    }

    /// Market conditions for one run, with the configured fallbacks.
    pub fn market_snapshot(
        &self,
        risk_free_rate: Option<f64>,
        benchmark: Vec<PricePoint>,
    ) -> MarketSnapshot {
        MarketSnapshot::build(risk_free_rate, benchmark, &self.config.market)
    }

    pub fn value_company(
        &self,
        statements: &CompanyStatements,
        quote: &MarketQuote,
        market: &MarketSnapshot,
    ) -> AnalysisResult<ValuationResult> {
        let financials = CompanyFinancials::from_statements(statements);
        self.fundamental_analyzer.value_company(&financials, quote, market)
    }

    pub fn assess_health(
        &self,
        statements: &CompanyStatements,
        quote: &MarketQuote,
    ) -> AnalysisResult<HealthResult> {
        let inputs = HealthInputs::from_statements(statements);
        assess_health(&quote.name, &quote.ticker, &inputs, quote.market_cap)
    }

    /// Weekly bias first, then the daily score it adjusts.
    pub fn technical_view(&self, daily_bars: &[Bar], weekly_bars: &[Bar]) -> TechnicalView {
        let weekly = self.technical_analyzer.weekly_trend(weekly_bars);
        let daily = self.technical_analyzer.daily_signal(daily_bars, weekly.bias);
        TechnicalView { weekly, daily }
    }

    /// Fundamental view from a valuation outcome; a failed valuation is Neutro.
    pub fn fundamental_bias(&self, valuation: Option<&ValuationResult>) -> TrendBias {
        fundamental_bias(
            valuation.and_then(|v| v.margin_of_safety_pct),
            self.config.fundamental_bias_margin_pct,
        )
    }

    pub fn screen(&self, companies: &[CompanyInput], market: &MarketSnapshot) -> ScreenerResult {
        screen_companies(&self.fundamental_analyzer, companies, market)
    }

    /// Price an option chain against the combined view of its underlying.
    ///
    /// Spot is the latest daily close. Fails only when there is no daily
    /// history at all.
    pub fn analyze_options(
        &self,
        underlying: UnderlyingHistory<'_>,
        valuation: Option<&ValuationResult>,
        market: &MarketSnapshot,
        chain: &[OptionQuote],
        today: NaiveDate,
    ) -> AnalysisResult<ChainAnalysis> {
        let spot = underlying
            .daily_bars
            .last()
            .map(|b| b.close)
            .filter(|c| c.is_finite() && *c > 0.0)
            .ok_or_else(|| {
                AnalysisError::DataUnavailable(format!("no daily prices for {}", underlying.ticker))
            })?;

        let technical = self.technical_view(underlying.daily_bars, underlying.weekly_bars);
        let (volatility, volatility_source) = options_desk::resolve_volatility(
            &closes(underlying.daily_bars),
            self.config.volatility_window_days,
            self.config.fallback_volatility,
        );

        let view = UnderlyingView {
            ticker: underlying.ticker.to_string(),
            spot,
            risk_free_rate: market.risk_free_rate,
            volatility,
            volatility_source,
            signals: SignalContext {
                fundamental_bias: self.fundamental_bias(valuation),
                daily_label: technical.daily.label,
                weekly_bias: technical.weekly.bias,
            },
        };

        tracing::info!(
            "Analyzing {} options on {} (fundamental {}, weekly {}, daily {})",
            chain.len(),
            underlying.ticker,
            view.signals.fundamental_bias,
            view.signals.weekly_bias,
            view.signals.daily_label
        );

        Ok(analyze_chain(chain, view, today, self.config.underpricing_threshold_pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use quant_analysis::OptionType;
    use technical_analysis::TechnicalLabel;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn orchestrator() -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AnalysisConfig::default();
        config.thresholds.normal = 0.9;
        assert!(AnalysisOrchestrator::new(config).is_err());
    }

    #[test]
    fn test_market_snapshot_uses_fallbacks() {
        let market = orchestrator().market_snapshot(None, vec![]);
        assert_eq!(market.risk_free_rate, 0.105);
        assert_eq!(market.expected_market_return, 0.12);
    }

    #[test]
    fn test_fundamental_bias_from_valuation_outcome() {
        let o = orchestrator();
        assert_eq!(o.fundamental_bias(None), TrendBias::Neutral);
    }

    #[test]
    fn test_options_without_prices_are_unavailable() {
        let o = orchestrator();
        let market = o.market_snapshot(Some(0.1), vec![]);
        let history = UnderlyingHistory {
            ticker: "VALE3",
            daily_bars: &[],
            weekly_bars: &[],
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let err = o.analyze_options(history, None, &market, &[], today).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(_)));
    }

    #[test]
    fn test_option_pipeline_without_valuation_is_never_recommended() {
        let o = orchestrator();
        let market = o.market_snapshot(Some(0.1), vec![]);
        let daily: Vec<f64> = (0..120).map(|i| 30.0 + (i as f64 / 7.0).sin()).collect();
        let daily_bars = bars(&daily);
        let weekly_bars = bars(&daily[..30]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let chain = vec![
            OptionQuote {
                underlying: "VALE3".to_string(),
                symbol: "VALEF30".to_string(),
                expiry: today + Duration::days(45),
                strike: 30.0,
                option_type: OptionType::Call,
                market_price: 0.5,
            },
            OptionQuote {
                underlying: "VALE3".to_string(),
                symbol: "VALER30".to_string(),
                expiry: today + Duration::days(45),
                strike: 30.0,
                option_type: OptionType::Put,
                market_price: 0.5,
            },
        ];

        let history = UnderlyingHistory {
            ticker: "VALE3",
            daily_bars: &daily_bars,
            weekly_bars: &weekly_bars,
        };
        let analysis = o.analyze_options(history, None, &market, &chain, today).unwrap();

        assert_eq!(analysis.calls.len(), 1);
        assert_eq!(analysis.puts.len(), 1);
        assert_eq!(analysis.underlying.signals.fundamental_bias, TrendBias::Neutral);
        assert_eq!(analysis.underlying.volatility_source, VolatilitySource::Historical);
        assert!((analysis.underlying.spot - daily.last().copied().unwrap()).abs() < 1e-12);
        for option in analysis.calls.iter().chain(&analysis.puts) {
            assert_eq!(option.recommendation.kind, RecommendationKind::NotRecommended);
            assert!(option.pricing.theoretical_price > 0.0);
        }
    }

    #[test]
    fn test_technical_view_feeds_weekly_bias_into_daily() {
        let o = orchestrator();
        let rising: Vec<f64> = (0..80).map(|i| 10.0 * 1.02f64.powi(i)).collect();
        let view = o.technical_view(&bars(&rising), &bars(&rising));
        assert_eq!(view.daily.weekly_bias, view.weekly.bias);
        assert!(view.daily.label != TechnicalLabel::StrongSell);
    }
}
