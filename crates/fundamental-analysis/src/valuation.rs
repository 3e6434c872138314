use analysis_core::{stats, AnalysisError, AnalysisResult, PricePoint, TrendBias};
use quant_analysis::{hamada_beta, market_beta, HamadaBeta, MarketSnapshot};
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::statements::{AccountSeries, CompanyStatements};

/// Model parameters supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationParams {
    /// Growth rate the WACC must exceed for a terminal value to make sense.
    pub perpetuity_growth: f64,
    /// Trailing years averaged for the reported mean NOPAT.
    pub averaging_window_years: usize,
    pub beta_lookback_years: u32,
}

impl Default for ValuationParams {
    fn default() -> Self {
        Self {
            perpetuity_growth: 0.04,
            averaging_window_years: 3,
            beta_lookback_years: 5,
        }
    }
}

/// Yearly statement series the valuation reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    pub ebit: AccountSeries,
    pub income_taxes: AccountSeries,
    pub pre_tax_income: AccountSeries,
    pub net_revenue: AccountSeries,
    pub net_income: AccountSeries,
    pub receivables: AccountSeries,
    pub inventory: AccountSeries,
    pub payables: AccountSeries,
    pub fixed_assets: AccountSeries,
    pub intangible_assets: AccountSeries,
    pub short_term_debt: AccountSeries,
    pub long_term_debt: AccountSeries,
    /// Absolute value; filings report it as a negative line.
    pub financial_expense: AccountSeries,
    pub equity: AccountSeries,
    pub depreciation: AccountSeries,
}

impl CompanyFinancials {
    pub fn from_statements(statements: &CompanyStatements) -> Self {
        let income = &statements.income;
        let assets = &statements.assets;
        let liabilities = &statements.liabilities;

        Self {
            ebit: income.series(accounts::EBIT),
            income_taxes: income.series(accounts::INCOME_TAXES),
            pre_tax_income: income.series(accounts::PRE_TAX_INCOME),
            net_revenue: income.series(accounts::NET_REVENUE),
            net_income: income.series(accounts::NET_INCOME),
            receivables: assets.series(accounts::RECEIVABLES),
            inventory: assets.series(accounts::INVENTORY),
            payables: liabilities.series(accounts::PAYABLES),
            fixed_assets: assets.series(accounts::FIXED_ASSETS),
            intangible_assets: assets.series(accounts::INTANGIBLE_ASSETS),
            short_term_debt: liabilities.series(accounts::SHORT_TERM_DEBT),
            long_term_debt: liabilities.series(accounts::LONG_TERM_DEBT),
            financial_expense: income.series(accounts::FINANCIAL_EXPENSE).abs(),
            equity: liabilities.series(accounts::EQUITY),
            depreciation: statements.cash_flow.series(accounts::DEPRECIATION),
        }
    }
}

/// Current market figures for one listed company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub name: String,
    pub ticker: String,
    pub market_cap: f64,
    pub share_price: f64,
    pub shares_outstanding: f64,
    /// Daily closes of the stock, used for beta.
    pub prices: Vec<PricePoint>,
}

impl MarketQuote {
    fn validate(&self) -> AnalysisResult<()> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !usable(self.market_cap)
            || !usable(self.share_price)
            || !self.shares_outstanding.is_finite()
        {
            return Err(AnalysisError::DataUnavailable(format!(
                "incomplete market data for {} (market cap {}, price {}, shares {})",
                self.ticker, self.market_cap, self.share_price, self.shares_outstanding
            )));
        }
        Ok(())
    }
}

/// One fiscal year where every required account is reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearFigures {
    pub year: i32,
    pub ebit: f64,
    pub nopat: f64,
    pub operating_cash_flow: f64,
    pub capital_employed: f64,
    pub total_debt: f64,
    pub financial_expense: f64,
    pub equity: f64,
    pub net_revenue: f64,
    pub net_income: f64,
    pub receivables: f64,
    pub inventory: f64,
    pub payables: f64,
    pub depreciation: f64,
}

/// Yearly series reported alongside the headline figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationHistory {
    pub nopat: AccountSeries,
    pub operating_cash_flow: AccountSeries,
    /// Fraction; NaN where capital employed is zero.
    pub roic: AccountSeries,
    /// Constant across years.
    pub wacc: AccountSeries,
    pub future_wealth_pct: AccountSeries,
    pub current_wealth_pct: AccountSeries,
    pub efv_pct: AccountSeries,
    pub eva_pct: AccountSeries,
}

/// Economic valuation of one company. Rates are fractions unless the field
/// name ends in `_pct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub name: String,
    pub ticker: String,
    pub fiscal_year: i32,
    pub current_price: f64,
    /// `None` when shares outstanding is not positive.
    pub fair_price: Option<f64>,
    pub margin_of_safety_pct: Option<f64>,
    pub market_cap: f64,
    pub capital_employed: f64,
    pub total_debt: f64,
    pub average_nopat: Option<f64>,
    pub tax_rate: f64,
    pub roic: f64,
    pub beta: HamadaBeta,
    pub cost_of_equity: f64,
    /// 0 when the company carries no debt.
    pub cost_of_debt: f64,
    pub wacc: f64,
    /// ROIC minus WACC.
    pub spread: f64,
    pub eva: f64,
    pub current_wealth: f64,
    pub future_wealth: f64,
    pub efv: f64,
    pub sales_growth_pct: Option<f64>,
    pub net_margin_pct: Option<f64>,
    /// Book debt over book equity.
    pub debt_to_equity: Option<f64>,
    pub collection_days: Option<f64>,
    pub payment_days: Option<f64>,
    pub inventory_turnover: Option<f64>,
    pub history: ValuationHistory,
}

/// Directional view implied by a margin of safety.
///
/// Above `+threshold_pct` is Alta, below `-threshold_pct` is Baixa. An
/// undefined margin (failed or partial valuation) is Neutro.
pub fn fundamental_bias(margin_of_safety_pct: Option<f64>, threshold_pct: f64) -> TrendBias {
    match margin_of_safety_pct {
        Some(m) if m > threshold_pct => TrendBias::Up,
        Some(m) if m < -threshold_pct => TrendBias::Down,
        _ => TrendBias::Neutral,
    }
}

/// Effective tax rate over every available year: |Σ taxes| / |Σ pre-tax income|.
pub fn effective_tax_rate(financials: &CompanyFinancials) -> AnalysisResult<f64> {
    let pre_tax = financials.pre_tax_income.sum();
    if financials.ebit.is_empty() || pre_tax == 0.0 {
        return Err(AnalysisError::InsufficientData(
            "EBIT or pre-tax income missing, cannot derive the tax rate".to_string(),
        ));
    }
    Ok(financials.income_taxes.sum().abs() / pre_tax.abs())
}

/// Inner-join the valuation series on year. Depreciation is optional per
/// year and counts as zero when absent.
pub fn joined_years(financials: &CompanyFinancials, tax_rate: f64) -> Vec<YearFigures> {
    let f = financials;
    let nopat = f.ebit.map(|ebit| ebit * (1.0 - tax_rate));
    let working_capital_need = f.receivables.add_filled(&f.inventory).sub_filled(&f.payables);
    let capital_employed = working_capital_need
        .add_filled(&f.fixed_assets)
        .add_filled(&f.intangible_assets);

    nopat
        .iter()
        .filter_map(|(year, nopat)| {
            let depreciation = f.depreciation.get(year).unwrap_or(0.0);
            Some(YearFigures {
                year,
                ebit: f.ebit.get(year)?,
                nopat,
                operating_cash_flow: nopat + depreciation,
                capital_employed: capital_employed.get(year)?,
                total_debt: f.short_term_debt.get(year)? + f.long_term_debt.get(year)?,
                financial_expense: f.financial_expense.get(year)?,
                equity: f.equity.get(year)?,
                net_revenue: f.net_revenue.get(year)?,
                net_income: f.net_income.get(year)?,
                receivables: f.receivables.get(year)?,
                inventory: f.inventory.get(year)?,
                payables: f.payables.get(year)?,
                depreciation,
            })
        })
        .collect()
}

/// Weighted average cost of capital from market-cap and latest-debt weights.
///
/// Returns `(wacc, cost_of_debt)`. With no debt the WACC is the cost of equity.
pub fn weighted_cost_of_capital(
    cost_of_equity: f64,
    market_cap: f64,
    total_debt: f64,
    mean_financial_expense: f64,
    tax_rate: f64,
) -> (f64, f64) {
    let enterprise_value = market_cap + total_debt;
    if enterprise_value > 0.0 && total_debt > 0.0 {
        let cost_of_debt = mean_financial_expense / total_debt;
        let wacc = market_cap / enterprise_value * cost_of_equity
            + total_debt / enterprise_value * cost_of_debt * (1.0 - tax_rate);
        (wacc, cost_of_debt)
    } else {
        (cost_of_equity, 0.0)
    }
}

fn ratio_pct(numerator: f64, denominator: f64) -> Option<f64> {
    stats::safe_ratio(numerator, denominator).map(|r| r * 100.0)
}

fn finite_series(points: impl Iterator<Item = (i32, f64)>) -> AccountSeries {
    points.filter(|(_, v)| v.is_finite()).collect()
}

pub struct FundamentalAnalysisEngine {
    params: ValuationParams,
}

impl FundamentalAnalysisEngine {
    pub fn new(params: ValuationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ValuationParams {
        &self.params
    }

    /// Full EVA/EFV valuation of one company.
    ///
    /// Fails without a partial result when market data is incomplete, the
    /// statements do not overlap on any year, or the WACC does not exceed the
    /// perpetuity growth rate.
    pub fn value_company(
        &self,
        financials: &CompanyFinancials,
        quote: &MarketQuote,
        market: &MarketSnapshot,
    ) -> AnalysisResult<ValuationResult> {
        quote.validate()?;
        let tax_rate = effective_tax_rate(financials)?;

        let rows = joined_years(financials, tax_rate);
        let Some(latest) = rows.last().copied() else {
            return Err(AnalysisError::InsufficientData(format!(
                "no fiscal year of {} reports every valuation account",
                quote.ticker
            )));
        };

        let raw_beta = market_beta(
            &quote.prices,
            &market.benchmark,
            self.params.beta_lookback_years,
        );
        let beta = hamada_beta(raw_beta, tax_rate, latest.total_debt, quote.market_cap);
        let cost_of_equity = market.risk_free_rate + beta.relevered * market.market_risk_premium;

        let expenses: Vec<f64> = rows.iter().map(|r| r.financial_expense).collect();
        let mean_expense = stats::mean(&expenses).unwrap_or(0.0);
        let (wacc, cost_of_debt) = weighted_cost_of_capital(
            cost_of_equity,
            quote.market_cap,
            latest.total_debt,
            mean_expense,
            tax_rate,
        );

        let growth = self.params.perpetuity_growth;
        if !wacc.is_finite() || wacc <= growth {
            return Err(AnalysisError::InvalidWacc { wacc, growth });
        }

        let roic_of = |r: &YearFigures| {
            if r.capital_employed == 0.0 {
                f64::NAN
            } else {
                r.nopat / r.capital_employed
            }
        };
        let eva_of = |r: &YearFigures| (roic_of(r) - wacc) * r.capital_employed;

        let roic = roic_of(&latest);
        let eva = eva_of(&latest);
        let current_wealth = eva / wacc;
        let future_wealth = quote.market_cap + latest.total_debt - latest.capital_employed;
        let efv = future_wealth - current_wealth;

        let fair_price = if quote.shares_outstanding > 0.0 {
            let equity_value = future_wealth + latest.capital_employed - latest.total_debt;
            Some(equity_value / quote.shares_outstanding)
        } else {
            None
        };
        let margin_of_safety_pct = fair_price.map(|p| (p / quote.share_price - 1.0) * 100.0);

        let nopat_values: Vec<f64> = rows.iter().map(|r| r.nopat).collect();
        let revenue: AccountSeries = rows.iter().map(|r| (r.year, r.net_revenue)).collect();

        let future_wealth_pct = finite_series(
            rows.iter()
                .map(|r| (r.year, (future_wealth / r.capital_employed - 1.0) * 100.0)),
        );
        let current_wealth_pct = finite_series(
            rows.iter()
                .map(|r| (r.year, eva_of(r) / wacc / r.capital_employed * 100.0)),
        );
        let efv_pct = future_wealth_pct
            .iter()
            .filter_map(|(year, fw)| current_wealth_pct.get(year).map(|cw| (year, fw - cw)))
            .collect();
        let eva_pct = finite_series(
            rows.iter()
                .map(|r| (r.year, eva_of(r) / r.capital_employed * 100.0)),
        );

        let history = ValuationHistory {
            nopat: rows.iter().map(|r| (r.year, r.nopat)).collect(),
            operating_cash_flow: rows.iter().map(|r| (r.year, r.operating_cash_flow)).collect(),
            roic: rows.iter().map(|r| (r.year, roic_of(r))).collect(),
            wacc: rows.iter().map(|r| (r.year, wacc)).collect(),
            future_wealth_pct,
            current_wealth_pct,
            efv_pct,
            eva_pct,
        };

        let payment_base = latest.ebit + latest.depreciation - latest.net_income;
        let result = ValuationResult {
            name: quote.name.clone(),
            ticker: quote.ticker.clone(),
            fiscal_year: latest.year,
            current_price: quote.share_price,
            fair_price,
            margin_of_safety_pct,
            market_cap: quote.market_cap,
            capital_employed: latest.capital_employed,
            total_debt: latest.total_debt,
            average_nopat: stats::trailing_mean(&nopat_values, self.params.averaging_window_years),
            tax_rate,
            roic,
            beta,
            cost_of_equity,
            cost_of_debt,
            wacc,
            spread: roic - wacc,
            eva,
            current_wealth,
            future_wealth,
            efv,
            sales_growth_pct: revenue.last_pct_change().map(|g| g * 100.0),
            net_margin_pct: ratio_pct(latest.net_income, latest.net_revenue),
            debt_to_equity: if latest.equity > 0.0 {
                Some(latest.total_debt / latest.equity)
            } else {
                None
            },
            collection_days: stats::safe_ratio(latest.receivables, latest.net_revenue)
                .map(|r| r * 365.0),
            payment_days: stats::safe_ratio(latest.payables, payment_base).map(|r| r * 365.0),
            inventory_turnover: stats::safe_ratio(latest.net_revenue, latest.inventory),
            history,
        };

        tracing::debug!(
            "Valued {} ({}): WACC {:.4}, ROIC {:.4}, EVA {:.2}, margin {:?}",
            result.ticker,
            result.fiscal_year,
            result.wacc,
            result.roic,
            result.eva,
            result.margin_of_safety_pct
        );

        Ok(result)
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new(ValuationParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> AccountSeries {
        values.iter().enumerate().map(|(i, v)| (2021 + i as i32, *v)).collect()
    }

    fn sample_financials() -> CompanyFinancials {
        CompanyFinancials {
            ebit: series(&[100.0, 120.0, 150.0]),
            income_taxes: series(&[-30.0, -36.0, -45.0]),
            pre_tax_income: series(&[100.0, 120.0, 150.0]),
            net_revenue: series(&[1_000.0, 1_100.0, 1_210.0]),
            net_income: series(&[60.0, 70.0, 90.0]),
            receivables: series(&[50.0, 50.0, 60.0]),
            inventory: series(&[30.0, 30.0, 40.0]),
            payables: series(&[20.0, 20.0, 30.0]),
            fixed_assets: series(&[200.0, 200.0, 210.0]),
            intangible_assets: series(&[40.0, 40.0, 50.0]),
            short_term_debt: series(&[20.0, 20.0, 20.0]),
            long_term_debt: series(&[80.0, 80.0, 80.0]),
            financial_expense: series(&[10.0, 10.0, 10.0]),
            equity: series(&[250.0, 250.0, 250.0]),
            depreciation: series(&[10.0, 10.0, 10.0]),
        }
    }

    fn sample_quote() -> MarketQuote {
        MarketQuote {
            name: "Empresa Exemplo S.A.".to_string(),
            ticker: "EXMP3".to_string(),
            market_cap: 900.0,
            share_price: 9.0,
            shares_outstanding: 100.0,
            prices: vec![],
        }
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot::new(0.10, 0.15, vec![])
    }

    #[test]
    fn test_nopat_from_effective_tax_rate() {
        let fin = sample_financials();
        let tax = effective_tax_rate(&fin).unwrap();
        assert_relative_eq!(tax, 0.30, epsilon = 1e-12);

        let rows = joined_years(&fin, tax);
        let nopat: Vec<f64> = rows.iter().map(|r| r.nopat).collect();
        assert_relative_eq!(nopat[0], 70.0, epsilon = 1e-9);
        assert_relative_eq!(nopat[1], 84.0, epsilon = 1e-9);
        assert_relative_eq!(nopat[2], 105.0, epsilon = 1e-9);
        assert_relative_eq!(rows[2].operating_cash_flow, 115.0, epsilon = 1e-9);
        assert_relative_eq!(rows[2].capital_employed, 330.0, epsilon = 1e-9);
    }

    #[test]
    fn test_full_valuation() {
        let engine = FundamentalAnalysisEngine::default();
        let result = engine
            .value_company(&sample_financials(), &sample_quote(), &snapshot())
            .unwrap();

        assert_eq!(result.fiscal_year, 2023);
        assert_relative_eq!(result.beta.relevered, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.cost_of_equity, 0.15, epsilon = 1e-12);
        assert_relative_eq!(result.cost_of_debt, 0.10, epsilon = 1e-12);
        assert_relative_eq!(result.wacc, 0.142, epsilon = 1e-12);
        assert_relative_eq!(result.roic, 105.0 / 330.0, epsilon = 1e-12);

        let eva = (105.0 / 330.0 - 0.142) * 330.0;
        assert_relative_eq!(result.eva, eva, epsilon = 1e-9);
        assert_relative_eq!(result.future_wealth, 670.0, epsilon = 1e-9);
        assert_relative_eq!(result.efv, 670.0 - eva / 0.142, epsilon = 1e-9);

        assert_relative_eq!(result.fair_price.unwrap(), 9.0, epsilon = 1e-9);
        assert_relative_eq!(result.margin_of_safety_pct.unwrap(), 0.0, epsilon = 1e-9);
        let mean_nopat = (70.0 + 84.0 + 105.0) / 3.0;
        assert_relative_eq!(result.average_nopat.unwrap(), mean_nopat, epsilon = 1e-9);
        assert_relative_eq!(result.sales_growth_pct.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.debt_to_equity.unwrap(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(result.payment_days.unwrap(), 30.0 / 70.0 * 365.0, epsilon = 1e-9);
        assert_relative_eq!(result.inventory_turnover.unwrap(), 1_210.0 / 40.0, epsilon = 1e-9);

        assert_eq!(result.history.wacc.len(), 3);
        let eva_pct = result.history.eva_pct.get(2023).unwrap();
        assert_relative_eq!(eva_pct, eva / 330.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wacc_below_growth_is_rejected() {
        let engine = FundamentalAnalysisEngine::default();
        let mut fin = sample_financials();
        fin.short_term_debt = series(&[0.0, 0.0, 0.0]);
        fin.long_term_debt = series(&[0.0, 0.0, 0.0]);
        let market = MarketSnapshot::new(0.02, 0.03, vec![]);

        let err = engine.value_company(&fin, &sample_quote(), &market).unwrap_err();
        match err {
            AnalysisError::InvalidWacc { wacc, growth } => {
                assert_relative_eq!(wacc, 0.03, epsilon = 1e-12);
                assert_relative_eq!(growth, 0.04);
            }
            other => panic!("expected InvalidWacc, got {other:?}"),
        }
    }

    #[test]
    fn test_growth_above_wacc_is_rejected() {
        let engine = FundamentalAnalysisEngine::new(ValuationParams {
            perpetuity_growth: 0.5,
            ..ValuationParams::default()
        });
        let err = engine
            .value_company(&sample_financials(), &sample_quote(), &snapshot())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidWacc { .. }));
    }

    #[test]
    fn test_zero_shares_leaves_margin_undefined() {
        let engine = FundamentalAnalysisEngine::default();
        let mut quote = sample_quote();
        quote.shares_outstanding = 0.0;
        let result = engine.value_company(&sample_financials(), &quote, &snapshot()).unwrap();
        assert!(result.fair_price.is_none());
        assert!(result.margin_of_safety_pct.is_none());
    }

    #[test]
    fn test_missing_depreciation_keeps_the_year() {
        let mut fin = sample_financials();
        fin.depreciation = series(&[10.0, 10.0]);
        let rows = joined_years(&fin, 0.3);
        assert_eq!(rows.len(), 3);
        assert_relative_eq!(rows[2].operating_cash_flow, 105.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gap_in_required_account_drops_the_year() {
        let mut fin = sample_financials();
        fin.equity = [(2021, 250.0), (2023, 250.0)].into_iter().collect();
        let years: Vec<i32> = joined_years(&fin, 0.3).iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2021, 2023]);
    }

    #[test]
    fn test_no_overlapping_year_is_insufficient() {
        let engine = FundamentalAnalysisEngine::default();
        let mut fin = sample_financials();
        fin.equity = [(2015, 250.0)].into_iter().collect();
        let err = engine.value_company(&fin, &sample_quote(), &snapshot()).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData(_)));
    }

    #[test]
    fn test_zero_pre_tax_income_is_insufficient() {
        let mut fin = sample_financials();
        fin.pre_tax_income = series(&[50.0, -50.0]);
        assert!(matches!(effective_tax_rate(&fin), Err(AnalysisError::InsufficientData(_))));

        fin.pre_tax_income = series(&[100.0]);
        fin.ebit = AccountSeries::new();
        assert!(effective_tax_rate(&fin).is_err());
    }

    #[test]
    fn test_incomplete_market_data() {
        let engine = FundamentalAnalysisEngine::default();
        let mut quote = sample_quote();
        quote.market_cap = 0.0;
        let err = engine.value_company(&sample_financials(), &quote, &snapshot()).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable(_)));
    }

    #[test]
    fn test_fundamental_bias() {
        assert_eq!(fundamental_bias(Some(20.0), 15.0), TrendBias::Up);
        assert_eq!(fundamental_bias(Some(-15.5), 15.0), TrendBias::Down);
        assert_eq!(fundamental_bias(Some(15.0), 15.0), TrendBias::Neutral);
        assert_eq!(fundamental_bias(None, 15.0), TrendBias::Neutral);
    }
}
