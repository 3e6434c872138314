use analysis_core::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::statements::{AccountSeries, CompanyStatements};

/// Statement series read by the Fleuriet model and the Z-score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub inventory: AccountSeries,
    pub receivables: AccountSeries,
    pub payables: AccountSeries,
    pub non_current_assets: AccountSeries,
    pub equity: AccountSeries,
    pub non_current_liabilities: AccountSeries,
    pub total_assets: AccountSeries,
    pub total_liabilities: AccountSeries,
    pub ebit: AccountSeries,
    pub net_revenue: AccountSeries,
}

impl HealthInputs {
    pub fn from_statements(statements: &CompanyStatements) -> Self {
        let assets = &statements.assets;
        let liabilities = &statements.liabilities;
        Self {
            inventory: assets.series(accounts::INVENTORY),
            receivables: assets.series(accounts::RECEIVABLES),
            payables: liabilities.series(accounts::PAYABLES),
            non_current_assets: assets.series(accounts::NON_CURRENT_ASSETS),
            equity: liabilities.series(accounts::EQUITY),
            non_current_liabilities: liabilities.series(accounts::NON_CURRENT_LIABILITIES),
            total_assets: assets.series(accounts::TOTAL_ASSETS),
            total_liabilities: liabilities.series(accounts::TOTAL_LIABILITIES),
            ebit: statements.income.series(accounts::EBIT),
            net_revenue: statements.income.series(accounts::NET_REVENUE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    #[serde(rename = "Risco Elevado")]
    HighRisk,
    #[serde(rename = "Zona Cinzenta")]
    GreyZone,
    #[serde(rename = "Saudável")]
    Healthy,
    /// The Z-score inputs could not be evaluated.
    #[serde(rename = "Erro no cálculo")]
    CalculationError,
}

impl RiskClass {
    pub fn from_z_score(z: f64) -> Self {
        if z < 1.81 {
            RiskClass::HighRisk
        } else if z < 2.99 {
            RiskClass::GreyZone
        } else {
            RiskClass::Healthy
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            RiskClass::HighRisk => "Risco Elevado",
            RiskClass::GreyZone => "Zona Cinzenta",
            RiskClass::Healthy => "Saudável",
            RiskClass::CalculationError => "Erro no cálculo",
        }
    }
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_label())
    }
}

/// The five ratios behind the Z-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreFactors {
    /// Working capital over total assets.
    pub x1: f64,
    /// Equity growth since the earliest year over total assets.
    pub x2: f64,
    pub x3: f64,
    /// Market cap over total liabilities; 0 without liabilities.
    pub x4: f64,
    pub x5: f64,
}

impl ZScoreFactors {
    pub fn score(&self) -> f64 {
        0.038 * self.x1 + 1.253 * self.x2 + 2.331 * self.x3 + 0.511 * self.x4 + 0.824 * self.x5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    pub name: String,
    pub ticker: String,
    pub fiscal_year: i32,
    /// Working-capital need (NCG), latest year.
    pub ncg: f64,
    /// Working capital (CDG), latest year.
    pub cdg: f64,
    pub treasury: f64,
    pub scissors_effect: bool,
    /// `None` when the risk class is `CalculationError`.
    pub z_score: Option<f64>,
    pub z_factors: Option<ZScoreFactors>,
    pub risk_class: RiskClass,
    pub ncg_series: AccountSeries,
    pub cdg_series: AccountSeries,
    pub treasury_series: AccountSeries,
}

/// Structural insolvency warning: NCG outgrowing CDG while treasury is
/// negative. Growth from a zero base is infinite and still compares; a NaN
/// growth rate (0 to 0) never triggers it.
pub fn scissors_effect(ncg: &AccountSeries, cdg: &AccountSeries, treasury: &AccountSeries) -> bool {
    if ncg.len() < 2 || cdg.len() < 2 {
        return false;
    }
    match (ncg.last_growth(), cdg.last_growth(), treasury.last_value()) {
        (Some(ncg_growth), Some(cdg_growth), Some(t)) => ncg_growth > cdg_growth && t < 0.0,
        _ => false,
    }
}

/// Z-score factors from the latest figure of each series.
pub fn z_score_factors(
    inputs: &HealthInputs,
    cdg: &AccountSeries,
    market_cap: f64,
) -> AnalysisResult<ZScoreFactors> {
    let latest = |series: &AccountSeries, name: &str| {
        series
            .last_value()
            .ok_or_else(|| AnalysisError::InsufficientData(format!("{name} not reported")))
    };

    let total_assets = latest(&inputs.total_assets, "total assets")?;
    let total_liabilities = latest(&inputs.total_liabilities, "total liabilities")?;
    let equity_first = inputs
        .equity
        .first()
        .map(|(_, v)| v)
        .ok_or_else(|| AnalysisError::InsufficientData("equity not reported".to_string()))?;
    let equity_last = latest(&inputs.equity, "equity")?;
    let ebit = latest(&inputs.ebit, "EBIT")?;
    let revenue = latest(&inputs.net_revenue, "net revenue")?;
    let working_capital = latest(cdg, "working capital")?;

    if total_assets == 0.0 {
        return Err(AnalysisError::ComputationDegenerate("total assets are zero".to_string()));
    }

    Ok(ZScoreFactors {
        x1: working_capital / total_assets,
        x2: (equity_last - equity_first) / total_assets,
        x3: ebit / total_assets,
        x4: if total_liabilities > 0.0 { market_cap / total_liabilities } else { 0.0 },
        x5: revenue / total_assets,
    })
}

/// Fleuriet working-capital model plus the Z-score classification.
///
/// Fails only when the Fleuriet accounts are missing. A Z-score that cannot
/// be computed is reported as `CalculationError` next to an otherwise
/// complete result.
pub fn assess_health(
    name: &str,
    ticker: &str,
    inputs: &HealthInputs,
    market_cap: f64,
) -> AnalysisResult<HealthResult> {
    // inventory and receivables may each be absent; only their sum is required
    let operating_assets = inputs.inventory.add_filled(&inputs.receivables);
    let required = [
        ("inventory and receivables", &operating_assets),
        ("payables", &inputs.payables),
        ("non-current assets", &inputs.non_current_assets),
        ("equity", &inputs.equity),
        ("non-current liabilities", &inputs.non_current_liabilities),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, s)| s.is_empty())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::DataUnavailable(format!(
            "{ticker}: {} not reported",
            missing.join(", ")
        )));
    }

    let ncg = operating_assets.sub_filled(&inputs.payables);
    let cdg = inputs
        .equity
        .add_filled(&inputs.non_current_liabilities)
        .sub_filled(&inputs.non_current_assets);
    let treasury = cdg.sub_filled(&ncg);

    let Some((fiscal_year, treasury_latest)) = treasury.last() else {
        return Err(AnalysisError::InsufficientData(format!("{ticker}: empty treasury series")));
    };
    let scissors = scissors_effect(&ncg, &cdg, &treasury);

    let (z_score, z_factors, risk_class) = match z_score_factors(inputs, &cdg, market_cap) {
        Ok(factors) => {
            let z = factors.score();
            if z.is_finite() {
                (Some(z), Some(factors), RiskClass::from_z_score(z))
            } else {
                tracing::warn!("Z-score for {} is not finite", ticker);
                (None, Some(factors), RiskClass::CalculationError)
            }
        }
        Err(e) => {
            tracing::warn!("Z-score for {} unavailable: {}", ticker, e);
            (None, None, RiskClass::CalculationError)
        }
    };

    Ok(HealthResult {
        name: name.to_string(),
        ticker: ticker.to_string(),
        fiscal_year,
        ncg: ncg.get(fiscal_year).unwrap_or(0.0),
        cdg: cdg.get(fiscal_year).unwrap_or(0.0),
        treasury: treasury_latest,
        scissors_effect: scissors,
        z_score,
        z_factors,
        risk_class,
        ncg_series: ncg,
        cdg_series: cdg,
        treasury_series: treasury,
    })
}
