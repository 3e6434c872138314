//! Market-risk and derivatives pricing for the analytics engine.
//!
//! Everything here is a pure function of its inputs: the market snapshot,
//! return-based estimators (beta, historical volatility) and the
//! Black-Scholes pricer with its sensitivities.

pub mod beta;
pub mod market;
pub mod options;
pub mod volatility;

pub use beta::*;
pub use market::*;
pub use options::*;
pub use volatility::*;

/// Trading sessions per year used to annualize daily figures.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
