use analysis_core::{closes, AnalysisError, Bar, TrendBias};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const EMA_FAST: usize = 9;
pub const EMA_SLOW: usize = 21;
pub const ADX_PERIOD: usize = 14;
pub const ADX_TREND_THRESHOLD: f64 = 25.0;
pub const STOCH_K: usize = 14;
pub const STOCH_SMOOTH_K: usize = 3;
pub const STOCH_D: usize = 3;
pub const SAR_STEP: f64 = 0.02;
pub const SAR_MAX_STEP: f64 = 0.2;

/// Weight of each indicator vote in the daily score.
///
/// The indicator weights sum to 0.95 and are not renormalized; thresholds are
/// calibrated against that scale.
pub mod weights {
    pub const RSI: f64 = 0.20;
    pub const MACD: f64 = 0.20;
    pub const BOLLINGER: f64 = 0.15;
    pub const EMA: f64 = 0.15;
    pub const ADX: f64 = 0.10;
    pub const STOCHASTIC: f64 = 0.08;
    pub const SAR: f64 = 0.07;
    pub const WEEKLY_BIAS: f64 = 0.15;
}

/// Discrete vote of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Bullish,
    Neutral,
    Bearish,
}

impl Vote {
    pub fn value(&self) -> f64 {
        match self {
            Vote::Bullish => 1.0,
            Vote::Neutral => 0.0,
            Vote::Bearish => -1.0,
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(self, Vote::Bullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Vote::Bearish)
    }
}

/// Latest reading of one indicator, or a typed record of why it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorReading {
    Available { value: f64, vote: Vote },
    Unavailable { reason: String },
}

impl IndicatorReading {
    /// Unavailable indicators vote neutral.
    pub fn vote(&self) -> Vote {
        match self {
            IndicatorReading::Available { vote, .. } => *vote,
            IndicatorReading::Unavailable { .. } => Vote::Neutral,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            IndicatorReading::Available { value, .. } => Some(*value),
            IndicatorReading::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, IndicatorReading::Available { .. })
    }

    fn from_result(result: Result<(f64, Vote), AnalysisError>) -> Self {
        match result {
            Ok((value, vote)) => IndicatorReading::Available { value, vote },
            Err(e) => {
                tracing::debug!("{}", e);
                IndicatorReading::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Fixed indicator set evaluated on the daily timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// RSI(14) level.
    pub rsi: IndicatorReading,
    /// MACD(12,26,9) line.
    pub macd: IndicatorReading,
    /// Bollinger(20,2) %B.
    pub bollinger: IndicatorReading,
    /// EMA(9) minus EMA(21).
    pub ema_cross: IndicatorReading,
    /// ADX(14) level; direction from +DI/-DI.
    pub adx: IndicatorReading,
    /// Slow %K of Stochastic(14,3,3).
    pub stochastic: IndicatorReading,
    /// Parabolic SAR level.
    pub parabolic_sar: IndicatorReading,
}

impl IndicatorSet {
    pub fn votes(&self) -> IndicatorVotes {
        IndicatorVotes {
            rsi: self.rsi.vote(),
            macd: self.macd.vote(),
            bollinger: self.bollinger.vote(),
            ema_cross: self.ema_cross.vote(),
            adx: self.adx.vote(),
            stochastic: self.stochastic.vote(),
            parabolic_sar: self.parabolic_sar.vote(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorVotes {
    pub rsi: Vote,
    pub macd: Vote,
    pub bollinger: Vote,
    pub ema_cross: Vote,
    pub adx: Vote,
    pub stochastic: Vote,
    pub parabolic_sar: Vote,
}

impl IndicatorVotes {
    pub fn weighted_score(&self) -> f64 {
        weights::RSI * self.rsi.value()
            + weights::MACD * self.macd.value()
            + weights::BOLLINGER * self.bollinger.value()
            + weights::EMA * self.ema_cross.value()
            + weights::ADX * self.adx.value()
            + weights::STOCHASTIC * self.stochastic.value()
            + weights::SAR * self.parabolic_sar.value()
    }
}

/// Score cut-offs for the final label, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub strong: f64,
    pub normal: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            strong: 0.65,
            normal: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechnicalLabel {
    #[serde(rename = "COMPRA FORTE")]
    StrongBuy,
    #[serde(rename = "COMPRA")]
    Buy,
    #[serde(rename = "NEUTRO")]
    Neutral,
    #[serde(rename = "VENDA")]
    Sell,
    #[serde(rename = "VENDA FORTE")]
    StrongSell,
}

impl TechnicalLabel {
    pub fn to_label(&self) -> &'static str {
        match self {
            TechnicalLabel::StrongBuy => "COMPRA FORTE",
            TechnicalLabel::Buy => "COMPRA",
            TechnicalLabel::Neutral => "NEUTRO",
            TechnicalLabel::Sell => "VENDA",
            TechnicalLabel::StrongSell => "VENDA FORTE",
        }
    }

    /// Either buy label, strong or plain.
    pub fn is_buy(&self) -> bool {
        matches!(self, TechnicalLabel::StrongBuy | TechnicalLabel::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, TechnicalLabel::StrongSell | TechnicalLabel::Sell)
    }
}

impl std::fmt::Display for TechnicalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_label())
    }
}

/// Daily-timeframe outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub indicators: IndicatorSet,
    /// Σ weight·vote before the weekly adjustment.
    pub score: f64,
    pub weekly_bias: TrendBias,
    pub adjusted_score: f64,
    pub label: TechnicalLabel,
}

/// Weekly-timeframe outcome: a coarse bias from EMA and MACD agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub macd: IndicatorReading,
    pub ema_cross: IndicatorReading,
    pub bias: TrendBias,
}

/// Final label from the adjusted score and the confirmation combos.
///
/// A strong label additionally needs a trend vote (MACD or EMA) and a
/// momentum vote (RSI or Stochastic) pointing the same way.
pub fn classify(
    adjusted_score: f64,
    votes: &IndicatorVotes,
    thresholds: &SignalThresholds,
) -> TechnicalLabel {
    let trend_up = votes.macd.is_bullish() || votes.ema_cross.is_bullish();
    let momentum_up = votes.rsi.is_bullish() || votes.stochastic.is_bullish();
    let trend_down = votes.macd.is_bearish() || votes.ema_cross.is_bearish();
    let momentum_down = votes.rsi.is_bearish() || votes.stochastic.is_bearish();

    if adjusted_score > thresholds.strong && trend_up && momentum_up {
        TechnicalLabel::StrongBuy
    } else if adjusted_score > thresholds.normal {
        TechnicalLabel::Buy
    } else if adjusted_score < -thresholds.strong && trend_down && momentum_down {
        TechnicalLabel::StrongSell
    } else if adjusted_score < -thresholds.normal {
        TechnicalLabel::Sell
    } else {
        TechnicalLabel::Neutral
    }
}

/// (raw score, adjusted score, label) for a set of votes.
pub fn score_votes(
    votes: &IndicatorVotes,
    weekly_bias: TrendBias,
    thresholds: &SignalThresholds,
) -> (f64, f64, TechnicalLabel) {
    let score = votes.weighted_score();
    let adjusted = score + weights::WEEKLY_BIAS * weekly_bias.as_signal();
    (score, adjusted, classify(adjusted, votes, thresholds))
}

fn need(indicator: &'static str, bars: usize, required: usize) -> Result<(), AnalysisError> {
    if bars < required {
        Err(AnalysisError::indicator(
            indicator,
            format!("need {required} bars, got {bars}"),
        ))
    } else {
        Ok(())
    }
}

fn finite(indicator: &'static str, value: Option<f64>) -> Result<f64, AnalysisError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(AnalysisError::indicator(indicator, "non-finite value")),
        None => Err(AnalysisError::indicator(indicator, "no value produced")),
    }
}

fn read_rsi(closes: &[f64]) -> Result<(f64, Vote), AnalysisError> {
    need("RSI", closes.len(), RSI_PERIOD + 1)?;
    let value = finite("RSI", rsi(closes, RSI_PERIOD).last().copied())?;
    let vote = if value < 30.0 {
        Vote::Bullish
    } else if value > 70.0 {
        Vote::Bearish
    } else {
        Vote::Neutral
    };
    Ok((value, vote))
}

fn read_macd(closes: &[f64]) -> Result<(f64, Vote), AnalysisError> {
    need("MACD", closes.len(), MACD_SLOW + MACD_SIGNAL - 1)?;
    let result = macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let line = finite("MACD", result.macd_line.last().copied())?;
    let signal = finite("MACD", result.signal_line.last().copied())?;
    let vote = if line > signal { Vote::Bullish } else { Vote::Bearish };
    Ok((line, vote))
}

fn read_bollinger(closes: &[f64]) -> Result<(f64, Vote), AnalysisError> {
    need("Bollinger", closes.len(), BOLLINGER_PERIOD)?;
    let bands = bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);
    let price = finite("Bollinger", closes.last().copied())?;
    let upper = finite("Bollinger", bands.upper.last().copied())?;
    let lower = finite("Bollinger", bands.lower.last().copied())?;
    let percent_b = bands
        .percent_b(price)
        .ok_or_else(|| AnalysisError::indicator("Bollinger", "bands have zero width"))?;
    let vote = if price < lower {
        Vote::Bullish
    } else if price > upper {
        Vote::Bearish
    } else {
        Vote::Neutral
    };
    Ok((percent_b, vote))
}

fn read_ema_cross(closes: &[f64]) -> Result<(f64, Vote), AnalysisError> {
    need("EMA", closes.len(), EMA_SLOW)?;
    let fast = finite("EMA", ema(closes, EMA_FAST).last().copied())?;
    let slow = finite("EMA", ema(closes, EMA_SLOW).last().copied())?;
    let vote = if fast > slow { Vote::Bullish } else { Vote::Bearish };
    Ok((fast - slow, vote))
}

fn read_adx(bars: &[Bar]) -> Result<(f64, Vote), AnalysisError> {
    need("ADX", bars.len(), ADX_PERIOD * 2 + 1)?;
    let result = adx(bars, ADX_PERIOD);
    let value = finite("ADX", result.adx.last().copied())?;
    let plus_di = finite("ADX", result.plus_di.last().copied())?;
    let minus_di = finite("ADX", result.minus_di.last().copied())?;
    let vote = if value > ADX_TREND_THRESHOLD && plus_di > minus_di {
        Vote::Bullish
    } else if value > ADX_TREND_THRESHOLD && minus_di > plus_di {
        Vote::Bearish
    } else {
        Vote::Neutral
    };
    Ok((value, vote))
}

fn read_stochastic(bars: &[Bar]) -> Result<(f64, Vote), AnalysisError> {
    need("Stochastic", bars.len(), STOCH_K + STOCH_SMOOTH_K - 1)?;
    let result = stochastic(bars, STOCH_K, STOCH_SMOOTH_K, STOCH_D);
    let value = finite("Stochastic", result.k.last().copied())?;
    let vote = if value < 20.0 {
        Vote::Bullish
    } else if value > 80.0 {
        Vote::Bearish
    } else {
        Vote::Neutral
    };
    Ok((value, vote))
}

fn read_sar(bars: &[Bar]) -> Result<(f64, Vote), AnalysisError> {
    need("Parabolic SAR", bars.len(), 2)?;
    let point = parabolic_sar(bars, SAR_STEP, SAR_MAX_STEP)
        .last()
        .copied()
        .ok_or_else(|| AnalysisError::indicator("Parabolic SAR", "no value produced"))?;
    let value = finite("Parabolic SAR", Some(point.value))?;
    let price = finite("Parabolic SAR", bars.last().map(|b| b.close))?;
    let vote = if value < price {
        Vote::Bullish
    } else if value > price {
        Vote::Bearish
    } else {
        Vote::Neutral
    };
    Ok((value, vote))
}

pub struct TechnicalAnalysisEngine {
    thresholds: SignalThresholds,
}

impl TechnicalAnalysisEngine {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    /// Evaluate the full indicator set on the latest bar.
    pub fn indicators(&self, bars: &[Bar]) -> IndicatorSet {
        let closes = closes(bars);
        IndicatorSet {
            rsi: IndicatorReading::from_result(read_rsi(&closes)),
            macd: IndicatorReading::from_result(read_macd(&closes)),
            bollinger: IndicatorReading::from_result(read_bollinger(&closes)),
            ema_cross: IndicatorReading::from_result(read_ema_cross(&closes)),
            adx: IndicatorReading::from_result(read_adx(bars)),
            stochastic: IndicatorReading::from_result(read_stochastic(bars)),
            parabolic_sar: IndicatorReading::from_result(read_sar(bars)),
        }
    }

    /// Coarse weekly bias: Alta when EMA and MACD both vote up, Baixa when
    /// both vote down, Neutro otherwise. No score is computed.
    pub fn weekly_trend(&self, weekly_bars: &[Bar]) -> WeeklyTrend {
        let closes = closes(weekly_bars);
        let macd = IndicatorReading::from_result(read_macd(&closes));
        let ema_cross = IndicatorReading::from_result(read_ema_cross(&closes));

        let bias = match (macd.vote(), ema_cross.vote()) {
            (Vote::Bullish, Vote::Bullish) => TrendBias::Up,
            (Vote::Bearish, Vote::Bearish) => TrendBias::Down,
            _ => TrendBias::Neutral,
        };

        WeeklyTrend {
            macd,
            ema_cross,
            bias,
        }
    }

    /// Weighted daily score adjusted by the weekly bias, and its label.
    pub fn daily_signal(&self, daily_bars: &[Bar], weekly_bias: TrendBias) -> TechnicalSignal {
        let indicators = self.indicators(daily_bars);
        let votes = indicators.votes();
        let (score, adjusted_score, label) = score_votes(&votes, weekly_bias, &self.thresholds);

        tracing::debug!(
            "Daily technical score {:.3} (adjusted {:.3}, weekly {}): {}",
            score,
            adjusted_score,
            weekly_bias,
            label
        );

        TechnicalSignal {
            indicators,
            score,
            weekly_bias,
            adjusted_score,
            label,
        }
    }
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new(SignalThresholds::default())
    }
}
