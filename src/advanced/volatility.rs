//! Volatility-based position scaling
//!
//! Scales size down in stressed markets and up in calm ones. Prefers a
//! volatility-index reading; falls back to annualized realized volatility
//! from bar closes; otherwise stays neutral.

use crate::config::VolatilityScalingConfig;
use crate::market::{Bar, PriceMap};
use rust_decimal::Decimal;
use std::fmt;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Which input produced the scale factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolSource {
    /// Volatility-index reading (explicit or from the price map)
    Index,
    /// Annualized realized volatility from closes
    Realized,
    /// No usable input
    Neutral,
}

impl fmt::Display for VolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VolSource::Index => "index",
            VolSource::Realized => "realized",
            VolSource::Neutral => "neutral",
        };
        write!(f, "{name}")
    }
}

/// Scaling outcome with its input
#[derive(Debug, Clone)]
pub struct VolatilityScaleResult {
    pub factor: Decimal,
    pub source: VolSource,
    /// The index level or realized volatility used
    pub level: Option<Decimal>,
    pub reason: String,
}

pub struct VolatilityScaler {
    config: VolatilityScalingConfig,
}

impl VolatilityScaler {
    pub fn new(config: VolatilityScalingConfig) -> Self {
        Self { config }
    }

    /// Compute the scale factor.
    ///
    /// An explicit level takes precedence over the price-map reading of the
    /// configured index symbol.
    pub fn scale(
        &self,
        bars: &[Bar],
        current_prices: &PriceMap,
        explicit_level: Option<Decimal>,
    ) -> VolatilityScaleResult {
        let index_level = explicit_level
            .or_else(|| current_prices.get(&self.config.vol_index_symbol).copied());

        if let Some(level) = index_level {
            let factor = self.interpolate(level);
            return VolatilityScaleResult {
                factor,
                source: VolSource::Index,
                level: Some(level),
                reason: format!(
                    "{} at {level}, scaling by {factor}",
                    self.config.vol_index_symbol
                ),
            };
        }

        if self.config.realized_fallback_enabled {
            if let Some(realized) = self.realized_volatility(bars) {
                let target: f64 = self.config.target_volatility.try_into().unwrap_or(0.15);
                let raw = Decimal::try_from(target / realized).unwrap_or(Decimal::ONE);
                let factor = raw.clamp(self.config.max_scale_down, self.config.max_scale_up);
                let level = Decimal::try_from(realized).unwrap_or(Decimal::ZERO);
                return VolatilityScaleResult {
                    factor,
                    source: VolSource::Realized,
                    level: Some(level),
                    reason: format!("realized vol {level}, scaling by {factor}"),
                };
            }
        }

        VolatilityScaleResult {
            factor: Decimal::ONE,
            source: VolSource::Neutral,
            level: None,
            reason: "no volatility reading, staying neutral".to_string(),
        }
    }

    /// Linear interpolation between the scale bounds across the index
    /// threshold band
    fn interpolate(&self, level: Decimal) -> Decimal {
        let cfg = &self.config;
        if level <= cfg.low_threshold {
            return cfg.max_scale_up;
        }
        if level >= cfg.high_threshold {
            return cfg.max_scale_down;
        }
        let span = cfg.high_threshold - cfg.low_threshold;
        let position = (level - cfg.low_threshold) / span;
        cfg.max_scale_up - position * (cfg.max_scale_up - cfg.max_scale_down)
    }

    fn realized_volatility(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.config.realized_lookback + 1 {
            return None;
        }
        let window = &bars[bars.len() - (self.config.realized_lookback + 1)..];
        let mut returns = Vec::with_capacity(self.config.realized_lookback);
        for pair in window.windows(2) {
            let prev: f64 = pair[0].close.try_into().unwrap_or(0.0);
            let curr: f64 = pair[1].close.try_into().unwrap_or(0.0);
            if prev > 0.0 {
                returns.push((curr - prev) / prev);
            }
        }
        if returns.len() < 2 {
            return None;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let annualized = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        (annualized > 0.0).then_some(annualized)
    }
}
