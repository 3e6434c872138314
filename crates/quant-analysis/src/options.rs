use std::f64::consts::{PI, SQRT_2};
use std::str::FromStr;

use analysis_core::AnalysisError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
}

impl FromStr for OptionType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            other => Err(AnalysisError::InvalidData(format!("unknown option type '{other}'"))),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Call => f.write_str("CALL"),
            OptionType::Put => f.write_str("PUT"),
        }
    }
}

/// One row of an options chain as delivered by the options-chain collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub underlying: String,
    /// Exchange ticker of the option series itself.
    pub symbol: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub market_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    pub spot: f64,
    pub strike: f64,
    /// Years until expiry.
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    /// Annualized volatility as a fraction (0.20 = 20%).
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Price change per one volatility point.
    pub vega: f64,
    /// Price change per calendar day.
    pub theta: f64,
    /// Price change per one rate point.
    pub rho: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub theoretical_price: f64,
    pub greeks: Greeks,
    /// `(market - theoretical) / theoretical * 100`; `None` when the
    /// theoretical price is zero.
    pub mispricing_pct: Option<f64>,
    /// True when expiry or volatility was non-positive and everything was
    /// reported as zero instead of extrapolated.
    pub degenerate: bool,
}

fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

struct D1D2 {
    d1: f64,
    d2: f64,
    sqrt_t: f64,
    discount: f64,
}

fn d1_d2(inputs: &PricingInputs) -> Result<D1D2, AnalysisError> {
    let PricingInputs {
        spot,
        strike,
        time_to_expiry: t,
        risk_free_rate: r,
        volatility: sigma,
    } = *inputs;

    if t <= 0.0 || sigma <= 0.0 {
        return Err(AnalysisError::ComputationDegenerate(format!(
            "time to expiry {t} and volatility {sigma} must both be positive"
        )));
    }
    if spot <= 0.0 || strike <= 0.0 {
        return Err(AnalysisError::ComputationDegenerate(format!(
            "spot {spot} and strike {strike} must both be positive"
        )));
    }

    let sqrt_t = t.sqrt();
    let d1 = ((spot / strike).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    Ok(D1D2 {
        d1,
        d2: d1 - sigma * sqrt_t,
        sqrt_t,
        discount: (-r * t).exp(),
    })
}

/// Black-Scholes price of a European option.
///
/// Degenerate inputs (non-positive expiry or volatility) price at zero; this
/// is not intrinsic value.
pub fn black_scholes_price(inputs: &PricingInputs, option_type: OptionType) -> f64 {
    let Ok(D1D2 { d1, d2, discount, .. }) = d1_d2(inputs) else {
        return 0.0;
    };
    let s = inputs.spot;
    let k = inputs.strike;
    match option_type {
        OptionType::Call => s * norm_cdf(d1) - k * discount * norm_cdf(d2),
        OptionType::Put => k * discount * norm_cdf(-d2) - s * norm_cdf(-d1),
    }
}

/// Sensitivities of the Black-Scholes price; all zero for degenerate inputs.
pub fn greeks(inputs: &PricingInputs, option_type: OptionType) -> Greeks {
    let Ok(D1D2 { d1, d2, sqrt_t, discount }) = d1_d2(inputs) else {
        return Greeks::default();
    };
    let PricingInputs {
        spot: s,
        strike: k,
        time_to_expiry: t,
        risk_free_rate: r,
        volatility: sigma,
    } = *inputs;

    let pdf_d1 = norm_pdf(d1);
    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;
    let time_decay = -s * pdf_d1 * sigma / (2.0 * sqrt_t);

    match option_type {
        OptionType::Call => Greeks {
            delta: norm_cdf(d1),
            gamma,
            vega,
            theta: (time_decay - r * k * discount * norm_cdf(d2)) / 365.0,
            rho: k * t * discount * norm_cdf(d2) / 100.0,
        },
        OptionType::Put => Greeks {
            delta: norm_cdf(d1) - 1.0,
            gamma,
            vega,
            theta: (time_decay + r * k * discount * norm_cdf(-d2)) / 365.0,
            rho: -k * t * discount * norm_cdf(-d2) / 100.0,
        },
    }
}

pub fn mispricing_pct(market_price: f64, theoretical_price: f64) -> Option<f64> {
    if theoretical_price == 0.0 {
        None
    } else {
        Some((market_price - theoretical_price) / theoretical_price * 100.0)
    }
}

/// Calendar days to expiry expressed in years (days / 365).
pub fn time_to_expiry_years(today: NaiveDate, expiry: NaiveDate) -> f64 {
    (expiry - today).num_days() as f64 / 365.0
}

/// Price, sensitivities and mispricing for one observed option.
pub fn price_option(
    inputs: &PricingInputs,
    option_type: OptionType,
    market_price: f64,
) -> PricingResult {
    let degenerate = match d1_d2(inputs) {
        Ok(_) => false,
        Err(e) => {
            tracing::debug!("Pricing degenerate, reporting zero: {}", e);
            true
        }
    };
    let theoretical_price = black_scholes_price(inputs, option_type);
    PricingResult {
        theoretical_price,
        greeks: greeks(inputs, option_type),
        mispricing_pct: mispricing_pct(market_price, theoretical_price),
        degenerate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    fn atm() -> PricingInputs {
        PricingInputs {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.20,
        }
    }

    #[test]
    fn test_reference_prices() {
        let call = black_scholes_price(&atm(), OptionType::Call);
        let put = black_scholes_price(&atm(), OptionType::Put);
        assert_abs_diff_eq!(call, 10.4506, epsilon = 1e-3);
        assert_abs_diff_eq!(put, 5.5735, epsilon = 1e-3);
    }

    #[test]
    fn test_reference_greeks() {
        let call = greeks(&atm(), OptionType::Call);
        let put = greeks(&atm(), OptionType::Put);
        assert_abs_diff_eq!(call.delta, 0.6368, epsilon = 1e-3);
        assert_abs_diff_eq!(put.delta, -0.3632, epsilon = 1e-3);
        assert_abs_diff_eq!(call.gamma, 0.01876, epsilon = 1e-4);
        assert_relative_eq!(call.gamma, put.gamma);
        assert_abs_diff_eq!(call.vega, 0.3752, epsilon = 1e-3);
        assert_abs_diff_eq!(call.theta, -6.414 / 365.0, epsilon = 1e-4);
        assert_abs_diff_eq!(call.rho, 0.5323, epsilon = 1e-3);
        assert_abs_diff_eq!(put.rho, -0.4189, epsilon = 1e-3);
    }

    #[test]
    fn test_degenerate_expiry_prices_zero() {
        let mut inputs = atm();
        inputs.time_to_expiry = 0.0;
        let result = price_option(&inputs, OptionType::Call, 3.0);
        assert!(result.degenerate);
        assert_eq!(result.theoretical_price, 0.0);
        assert_eq!(result.greeks, Greeks::default());
        assert!(result.mispricing_pct.is_none());
    }

    #[test]
    fn test_deep_itm_expired_is_not_intrinsic() {
        let inputs = PricingInputs {
            spot: 150.0,
            strike: 100.0,
            time_to_expiry: -0.01,
            risk_free_rate: 0.1,
            volatility: 0.3,
        };
        assert_eq!(black_scholes_price(&inputs, OptionType::Call), 0.0);
    }

    #[test]
    fn test_mispricing() {
        assert_relative_eq!(mispricing_pct(8.0, 10.0).unwrap(), -20.0);
        assert_relative_eq!(mispricing_pct(12.5, 10.0).unwrap(), 25.0);
        assert!(mispricing_pct(1.0, 0.0).is_none());
    }

    #[test]
    fn test_time_to_expiry() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_relative_eq!(time_to_expiry_years(today, expiry), 30.0 / 365.0);
        assert!(time_to_expiry_years(expiry, today) < 0.0);
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!("CALL".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!(" put ".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }

    proptest! {
        #[test]
        fn prop_put_call_parity(
            s in 1.0f64..500.0,
            k in 1.0f64..500.0,
            t in 0.01f64..5.0,
            r in 0.0f64..0.25,
            sigma in 0.05f64..1.5,
        ) {
            let inputs = PricingInputs {
                spot: s,
                strike: k,
                time_to_expiry: t,
                risk_free_rate: r,
                volatility: sigma,
            };
            let call = black_scholes_price(&inputs, OptionType::Call);
            let put = black_scholes_price(&inputs, OptionType::Put);
            let parity = s - k * (-r * t).exp();
            prop_assert!((call - put - parity).abs() < 1e-8 * (s + k));
        }

        #[test]
        fn prop_degenerate_inputs_zero_everything(
            s in 1.0f64..500.0,
            k in 1.0f64..500.0,
            r in -0.05f64..0.25,
            zero_t in proptest::bool::ANY,
        ) {
            let (t, sigma) = if zero_t { (0.0, 0.3) } else { (1.0, 0.0) };
            let inputs = PricingInputs {
                spot: s,
                strike: k,
                time_to_expiry: t,
                risk_free_rate: r,
                volatility: sigma,
            };
            for kind in [OptionType::Call, OptionType::Put] {
                prop_assert_eq!(black_scholes_price(&inputs, kind), 0.0);
                prop_assert_eq!(greeks(&inputs, kind), Greeks::default());
            }
        }
    }
}
