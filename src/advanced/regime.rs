//! Market regime detection
//!
//! Classifies recent bars into a trend/volatility regime and maps it to a
//! position-size multiplier. RSI and realized volatility are computed in
//! f64 and converted back at the boundary.

use crate::config::RegimeDetectionConfig;
use crate::market::Bar;
use rust_decimal::Decimal;
use std::fmt;

const RSI_PERIOD: usize = 14;
const MIN_BARS: usize = 15;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Discrete trend/volatility classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    StrongBull,
    MildBull,
    Sideways,
    MildBear,
    StrongBear,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Regime::StrongBull => "strong_bull",
            Regime::MildBull => "mild_bull",
            Regime::Sideways => "sideways",
            Regime::MildBear => "mild_bear",
            Regime::StrongBear => "strong_bear",
        };
        write!(f, "{name}")
    }
}

/// Detection outcome with its inputs
#[derive(Debug, Clone)]
pub struct RegimeResult {
    pub regime: Regime,
    pub multiplier: Decimal,
    pub rsi: Decimal,
    pub trend_return: Decimal,
    pub volatility: Decimal,
    pub confidence: Decimal,
    pub reason: String,
}

pub struct RegimeDetector {
    config: RegimeDetectionConfig,
}

impl RegimeDetector {
    pub fn new(config: RegimeDetectionConfig) -> Self {
        Self { config }
    }

    fn required_bars(&self) -> usize {
        // A lookback of N returns needs N + 1 closes
        (self.config.trend_lookback + 1)
            .max(self.config.vol_lookback + 1)
            .max(MIN_BARS)
    }

    fn multiplier_for(&self, regime: Regime) -> Decimal {
        match regime {
            Regime::StrongBull => self.config.strong_bull_multiplier,
            Regime::MildBull => self.config.mild_bull_multiplier,
            Regime::Sideways => self.config.sideways_multiplier,
            Regime::MildBear => self.config.mild_bear_multiplier,
            Regime::StrongBear => self.config.strong_bear_multiplier,
        }
    }

    /// Classify the most recent bars, oldest first.
    ///
    /// Too few bars degrades to sideways with zero confidence.
    pub fn detect(&self, bars: &[Bar]) -> RegimeResult {
        if bars.len() < self.required_bars() {
            return RegimeResult {
                regime: Regime::Sideways,
                multiplier: self.config.sideways_multiplier,
                rsi: Decimal::ZERO,
                trend_return: Decimal::ZERO,
                volatility: Decimal::ZERO,
                confidence: Decimal::ZERO,
                reason: format!(
                    "{} of {} bars required, defaulting to sideways",
                    bars.len(),
                    self.required_bars()
                ),
            };
        }

        let closes: Vec<f64> = bars
            .iter()
            .map(|bar| bar.close.try_into().unwrap_or(0.0))
            .collect();

        let rsi = rsi(&closes);
        let trend = trend_return(&closes, self.config.trend_lookback);
        let volatility = realized_volatility(&closes, self.config.vol_lookback);

        let overbought: f64 = self.config.rsi_overbought.try_into().unwrap_or(70.0);
        let oversold: f64 = self.config.rsi_oversold.try_into().unwrap_or(30.0);
        let strong_trend: f64 = self.config.strong_trend_return.try_into().unwrap_or(0.05);
        let low_vol: f64 = self.config.low_vol_threshold.try_into().unwrap_or(0.15);
        let high_vol: f64 = self.config.high_vol_threshold.try_into().unwrap_or(0.25);

        let regime = if rsi > overbought && trend > 0.0 {
            // Strong extremes additionally need the volatility gate
            if trend >= strong_trend && volatility <= low_vol {
                Regime::StrongBull
            } else {
                Regime::MildBull
            }
        } else if rsi < oversold && trend < 0.0 {
            if trend <= -strong_trend && volatility >= high_vol {
                Regime::StrongBear
            } else {
                Regime::MildBear
            }
        } else if trend >= strong_trend {
            Regime::MildBull
        } else if trend <= -strong_trend {
            Regime::MildBear
        } else {
            Regime::Sideways
        };

        let confidence = ((rsi - 50.0).abs() / 50.0).clamp(0.0, 1.0);

        RegimeResult {
            regime,
            multiplier: self.multiplier_for(regime),
            rsi: to_decimal(rsi),
            trend_return: to_decimal(trend),
            volatility: to_decimal(volatility),
            confidence: to_decimal(confidence),
            reason: format!(
                "rsi {rsi:.1}, trend {:.1}%, vol {:.1}% -> {regime}",
                trend * 100.0,
                volatility * 100.0
            ),
        }
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// 14-period RSI over the most recent closes
fn rsi(closes: &[f64]) -> f64 {
    let window = &closes[closes.len() - (RSI_PERIOD + 1)..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    if losses == 0.0 {
        return 100.0;
    }
    let rs = (gains / RSI_PERIOD as f64) / (losses / RSI_PERIOD as f64);
    100.0 - 100.0 / (1.0 + rs)
}

fn trend_return(closes: &[f64], lookback: usize) -> f64 {
    let start = closes[closes.len() - 1 - lookback];
    let end = closes[closes.len() - 1];
    if start <= 0.0 {
        return 0.0;
    }
    (end - start) / start
}

/// Annualized standard deviation of simple returns over the window
fn realized_volatility(closes: &[f64], lookback: usize) -> f64 {
    let window = &closes[closes.len() - (lookback + 1)..];
    let mut returns = Vec::with_capacity(lookback);
    for pair in window.windows(2) {
        if pair[0] > 0.0 {
            returns.push((pair[1] - pair[0]) / pair[0]);
        }
    }
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}
