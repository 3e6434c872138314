use analysis_core::{AnalysisError, AnalysisResult};
use fundamental_analysis::ValuationParams;
use quant_analysis::MarketFallbacks;
use serde::{Deserialize, Serialize};
use technical_analysis::SignalThresholds;

/// Every tunable of the engine in one place.
///
/// Missing fields in a JSON document take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub valuation: ValuationParams,
    pub thresholds: SignalThresholds,
    pub market: MarketFallbacks,
    /// Margin of safety (in %) beyond which the fundamental view is directional.
    pub fundamental_bias_margin_pct: f64,
    /// Mispricing (in %) at or below which an option counts as underpriced.
    pub underpricing_threshold_pct: f64,
    /// Used when no volatility can be estimated from the price history.
    pub fallback_volatility: f64,
    /// Daily returns in the historical-volatility window.
    pub volatility_window_days: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            valuation: ValuationParams::default(),
            thresholds: SignalThresholds::default(),
            market: MarketFallbacks::default(),
            fundamental_bias_margin_pct: 15.0,
            underpricing_threshold_pct: -20.0,
            fallback_volatility: 0.30,
            volatility_window_days: 252,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(json: &str) -> AnalysisResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidData(format!("invalid analysis config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidData(msg));

        let t = &self.thresholds;
        if !(t.strong > 0.0 && t.normal > 0.0) {
            return invalid(format!(
                "signal thresholds must be positive (strong {}, normal {})",
                t.strong, t.normal
            ));
        }
        if t.normal > t.strong {
            return invalid(format!(
                "normal threshold {} exceeds strong threshold {}",
                t.normal, t.strong
            ));
        }
        if self.valuation.averaging_window_years == 0 {
            return invalid("averaging window must cover at least one year".to_string());
        }
        if self.valuation.beta_lookback_years == 0 {
            return invalid("beta lookback must cover at least one year".to_string());
        }
        if !(self.fallback_volatility > 0.0) {
            return invalid(format!(
                "fallback volatility {} must be positive",
                self.fallback_volatility
            ));
        }
        if self.volatility_window_days < 2 {
            return invalid(format!(
                "volatility window of {} days is too short",
                self.volatility_window_days
            ));
        }
        Ok(())
    }
}
