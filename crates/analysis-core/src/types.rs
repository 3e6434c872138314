use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn to_price_point(&self) -> PricePoint {
        PricePoint {
            date: self.date(),
            close: self.close,
        }
    }
}

/// Daily closing price, used for benchmark and return-based estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Directional bias shared by the fundamental view and the weekly trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendBias {
    #[serde(rename = "Alta")]
    Up,
    #[serde(rename = "Baixa")]
    Down,
    #[serde(rename = "Neutro")]
    Neutral,
}

impl TrendBias {
    /// Numeric form used when the bias feeds a weighted score.
    pub fn as_signal(&self) -> f64 {
        match self {
            TrendBias::Up => 1.0,
            TrendBias::Down => -1.0,
            TrendBias::Neutral => 0.0,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            TrendBias::Up => "Alta",
            TrendBias::Down => "Baixa",
            TrendBias::Neutral => "Neutro",
        }
    }
}

impl std::fmt::Display for TrendBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_label())
    }
}
