use thiserror::Error;

/// Failure kinds shared by every engine component.
///
/// The `Display` text doubles as the human-readable reason handed to the
/// presentation layer when a result is reported as absent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Invalid WACC: {wacc:.4} must be finite and above the growth rate {growth:.4}")]
    InvalidWacc { wacc: f64, growth: f64 },

    #[error("Degenerate computation: {0}")]
    ComputationDegenerate(String),

    #[error("Indicator {indicator} unavailable: {reason}")]
    IndicatorUnavailable {
        indicator: &'static str,
        reason: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl AnalysisError {
    pub fn indicator(indicator: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::IndicatorUnavailable {
            indicator,
            reason: reason.into(),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
