//! Kelly criterion position sizing
//!
//! Estimates the capital fraction per trade from aggregate per-symbol
//! performance. Win/loss magnitudes are approximated from cumulative P&L
//! under a configured payoff ratio rather than true per-trade statistics,
//! so the output is a Kelly-style heuristic, not exact Kelly.

use crate::config::KellyCriterionConfig;
use rust_decimal::Decimal;

/// Aggregate per-symbol trade performance
#[derive(Debug, Clone, Default)]
pub struct SymbolPerformance {
    pub trade_count: u32,
    pub win_count: u32,
    pub cumulative_pnl: Decimal,
}

/// Supplies per-symbol performance to the sizer
pub trait PerformanceProvider: Send + Sync {
    fn performance(&self, symbol: &str) -> SymbolPerformance;
}

/// Sizing decision with its inputs
#[derive(Debug, Clone)]
pub struct KellyResult {
    pub win_rate: Decimal,
    /// Raw Kelly fraction before the fractional multiplier and clamp
    pub kelly_fraction: Decimal,
    /// Fraction actually applied
    pub applied_fraction: Decimal,
    pub is_fallback: bool,
    pub reason: String,
}

pub struct KellyCriterionSizer {
    config: KellyCriterionConfig,
}

impl KellyCriterionSizer {
    pub fn new(config: KellyCriterionConfig) -> Self {
        Self { config }
    }

    pub fn fallback_fraction(&self) -> Decimal {
        self.config.fallback_fraction
    }

    /// Size a trade from aggregate performance.
    ///
    /// Below the trade-count threshold the configured fallback fraction is
    /// returned regardless of win/loss values.
    pub fn calculate(&self, symbol: &str, performance: &SymbolPerformance) -> KellyResult {
        let cfg = &self.config;

        if performance.trade_count < cfg.min_trades_required {
            let win_rate = if performance.trade_count > 0 {
                Decimal::from(performance.win_count) / Decimal::from(performance.trade_count)
            } else {
                Decimal::ZERO
            };
            return KellyResult {
                win_rate,
                kelly_fraction: Decimal::ZERO,
                applied_fraction: cfg.fallback_fraction,
                is_fallback: true,
                reason: format!(
                    "{symbol}: {} of {} trades required, using fallback fraction {}",
                    performance.trade_count, cfg.min_trades_required, cfg.fallback_fraction
                ),
            };
        }

        let win_rate =
            Decimal::from(performance.win_count) / Decimal::from(performance.trade_count);

        if performance.win_count == 0 {
            return KellyResult {
                win_rate,
                kelly_fraction: Decimal::ZERO,
                applied_fraction: cfg.min_fraction,
                is_fallback: false,
                reason: format!("{symbol}: no winning trades, sizing at minimum"),
            };
        }
        if performance.win_count == performance.trade_count {
            return KellyResult {
                win_rate,
                kelly_fraction: Decimal::ONE,
                applied_fraction: cfg.max_fraction,
                is_fallback: false,
                reason: format!("{symbol}: no losing trades, sizing at maximum"),
            };
        }

        // Payoff ratio assumed from the sign of cumulative P&L: profitable
        // history keeps the configured ratio, losing history inverts it
        let payoff_ratio = if performance.cumulative_pnl >= Decimal::ZERO {
            cfg.assumed_payoff_ratio
        } else {
            Decimal::ONE / cfg.assumed_payoff_ratio
        };

        // K = W - (1 - W) / R
        let kelly_fraction = win_rate - (Decimal::ONE - win_rate) / payoff_ratio;
        let applied_fraction = (kelly_fraction * cfg.kelly_multiplier)
            .clamp(cfg.min_fraction, cfg.max_fraction);

        KellyResult {
            win_rate,
            kelly_fraction,
            applied_fraction,
            is_fallback: false,
            reason: format!(
                "{symbol}: win rate {win_rate}, payoff ratio {payoff_ratio}, applying {applied_fraction}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sizer() -> KellyCriterionSizer {
        KellyCriterionSizer::new(KellyCriterionConfig::default())
    }

    #[test]
    fn test_below_threshold_always_fallback() {
        let s = sizer();
        // Even a perfect record falls back below the threshold
        let perf = SymbolPerformance {
            trade_count: 19,
            win_count: 19,
            cumulative_pnl: dec!(5000),
        };
        let result = s.calculate("AAPL", &perf);
        assert!(result.is_fallback);
        assert_eq!(result.applied_fraction, dec!(0.02));
    }

    #[test]
    fn test_positive_edge() {
        let s = sizer();
        // 60% win rate, profitable: K = 0.6 - 0.4/2 = 0.4, half-Kelly 0.2
        let perf = SymbolPerformance {
            trade_count: 100,
            win_count: 60,
            cumulative_pnl: dec!(1000),
        };
        let result = s.calculate("AAPL", &perf);
        assert!(!result.is_fallback);
        assert_eq!(result.kelly_fraction, dec!(0.4));
        assert_eq!(result.applied_fraction, dec!(0.2));
    }

    #[test]
    fn test_negative_edge_clamped_to_min() {
        let s = sizer();
        // 30% win rate, losing: R = 0.5, K = 0.3 - 0.7/0.5 = -1.1
        let perf = SymbolPerformance {
            trade_count: 50,
            win_count: 15,
            cumulative_pnl: dec!(-2000),
        };
        let result = s.calculate("AAPL", &perf);
        assert!(result.kelly_fraction < Decimal::ZERO);
        assert_eq!(result.applied_fraction, dec!(0.01));
    }

    #[test]
    fn test_zero_wins_sizes_at_min() {
        let s = sizer();
        let perf = SymbolPerformance {
            trade_count: 30,
            win_count: 0,
            cumulative_pnl: dec!(-3000),
        };
        let result = s.calculate("AAPL", &perf);
        assert_eq!(result.applied_fraction, dec!(0.01));
    }

    #[test]
    fn test_zero_losses_sizes_at_max() {
        let s = sizer();
        let perf = SymbolPerformance {
            trade_count: 30,
            win_count: 30,
            cumulative_pnl: dec!(3000),
        };
        let result = s.calculate("AAPL", &perf);
        assert_eq!(result.applied_fraction, dec!(0.25));
    }
}
