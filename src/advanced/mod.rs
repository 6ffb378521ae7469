//! Composite advanced risk evaluation
//!
//! Composes Kelly sizing, correlation blocking, regime detection, and
//! volatility scaling into a single allow/block decision and one position
//! size multiplier, applied on top of (not instead of) the hard limits in
//! the risk engine.

pub mod correlation;
pub mod kelly;
pub mod regime;
pub mod volatility;

pub use correlation::{
    CorrelationBreach, CorrelationCheckResult, CorrelationMatrix, CorrelationMonitor,
    PriceHistory,
};
pub use kelly::{KellyCriterionSizer, KellyResult, PerformanceProvider, SymbolPerformance};
pub use regime::{Regime, RegimeDetector, RegimeResult};
pub use volatility::{VolSource, VolatilityScaleResult, VolatilityScaler};

use crate::config::{
    ConfigError, CorrelationLimitsConfig, KellyCriterionConfig, RegimeDetectionConfig,
    VolatilityScalingConfig,
};
use crate::market::{Bar, PriceMap};
use crate::portfolio::Position;
use crate::telemetry::{set_gauge, GaugeMetric};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Bounds on the combined multiplier, regardless of how the individual
/// factors compound
const MIN_MULTIPLIER: Decimal = dec!(0.01);
const MAX_MULTIPLIER: Decimal = dec!(3.0);

/// Combined evaluation outcome
#[derive(Debug, Clone)]
pub struct AdvancedRiskResult {
    pub allowed: bool,
    /// Final multiplier on the intended order size, within [0.01, 3.0]
    pub position_size_multiplier: Decimal,
    pub kelly: Option<KellyResult>,
    pub correlation: Option<CorrelationCheckResult>,
    pub regime: Option<RegimeResult>,
    pub volatility: Option<VolatilityScaleResult>,
    pub reason: String,
}

/// Composite of the four evaluators; each individually enable-able
pub struct AdvancedRiskManager {
    kelly: Option<KellyCriterionSizer>,
    correlation: Option<CorrelationMonitor>,
    regime: Option<RegimeDetector>,
    volatility: Option<VolatilityScaler>,
}

impl AdvancedRiskManager {
    pub fn new(
        kelly: KellyCriterionConfig,
        correlation: CorrelationLimitsConfig,
        regime: RegimeDetectionConfig,
        volatility: VolatilityScalingConfig,
    ) -> Result<Self, ConfigError> {
        kelly.validate()?;
        correlation.validate()?;
        regime.validate()?;
        volatility.validate()?;
        Ok(Self {
            kelly: kelly.enabled.then(|| KellyCriterionSizer::new(kelly)),
            correlation: correlation
                .enabled
                .then(|| CorrelationMonitor::new(correlation)),
            regime: regime.enabled.then(|| RegimeDetector::new(regime)),
            volatility: volatility
                .enabled
                .then(|| VolatilityScaler::new(volatility)),
        })
    }

    /// Evaluate a candidate symbol against all enabled evaluators.
    ///
    /// Kelly contributes the ratio of its applied fraction to the fallback
    /// fraction so it composes multiplicatively with the other factors.
    /// Correlation is the only hard veto.
    pub fn evaluate(
        &self,
        symbol: &str,
        bars: &[Bar],
        last_prices: &PriceMap,
        positions: &HashMap<String, Position>,
        price_history: &PriceHistory,
        performance: &dyn PerformanceProvider,
    ) -> AdvancedRiskResult {
        let mut allowed = true;
        let mut multiplier = Decimal::ONE;
        let mut reasons = Vec::new();

        let kelly = self.kelly.as_ref().map(|sizer| {
            let result = sizer.calculate(symbol, &performance.performance(symbol));
            multiplier *= result.applied_fraction / sizer.fallback_fraction();
            reasons.push(result.reason.clone());
            result
        });

        let correlation = self.correlation.as_ref().map(|monitor| {
            let result = monitor.check(symbol, positions, price_history);
            if !result.allowed {
                allowed = false;
            }
            reasons.push(result.reason.clone());
            result
        });

        let regime = self.regime.as_ref().map(|detector| {
            let result = detector.detect(bars);
            multiplier *= result.multiplier;
            reasons.push(result.reason.clone());
            result
        });

        let volatility = self.volatility.as_ref().map(|scaler| {
            let result = scaler.scale(bars, last_prices, None);
            multiplier *= result.factor;
            reasons.push(result.reason.clone());
            result
        });

        let position_size_multiplier = multiplier.clamp(MIN_MULTIPLIER, MAX_MULTIPLIER);
        let multiplier_f64: f64 = position_size_multiplier.try_into().unwrap_or(1.0);
        set_gauge(GaugeMetric::SizeMultiplier, multiplier_f64);
        tracing::debug!(
            symbol,
            allowed,
            multiplier = %position_size_multiplier,
            "advanced risk evaluated"
        );

        AdvancedRiskResult {
            allowed,
            position_size_multiplier,
            kelly,
            correlation,
            regime,
            volatility,
            reason: reasons.join("; "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    struct FixedPerformance(SymbolPerformance);

    impl PerformanceProvider for FixedPerformance {
        fn performance(&self, _symbol: &str) -> SymbolPerformance {
            self.0.clone()
        }
    }

    fn manager() -> AdvancedRiskManager {
        AdvancedRiskManager::new(
            KellyCriterionConfig::default(),
            CorrelationLimitsConfig::default(),
            RegimeDetectionConfig::default(),
            VolatilityScalingConfig::default(),
        )
        .unwrap()
    }

    fn no_history() -> FixedPerformance {
        FixedPerformance(SymbolPerformance::default())
    }

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        let base = Utc::now();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let close = Decimal::try_from(*close).unwrap();
                Bar::new(
                    "SPY",
                    base + Duration::days(i as i64),
                    close,
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    dec!(1000),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_neutral_inputs_neutral_multiplier() {
        let m = manager();
        let result = m.evaluate(
            "SPY",
            &[],
            &PriceMap::new(),
            &HashMap::new(),
            &PriceHistory::new(),
            &no_history(),
        );
        // Kelly fallback ratio 1, no regime data, neutral vol
        assert!(result.allowed);
        assert_eq!(result.position_size_multiplier, Decimal::ONE);
    }

    #[test]
    fn test_multiplier_clamped_at_upper_bound() {
        let regime_config = RegimeDetectionConfig {
            strong_bull_multiplier: dec!(5.0),
            ..RegimeDetectionConfig::default()
        };
        let vol_config = VolatilityScalingConfig {
            max_scale_up: dec!(3.0),
            ..VolatilityScalingConfig::default()
        };
        let m = AdvancedRiskManager::new(
            KellyCriterionConfig::default(),
            CorrelationLimitsConfig::default(),
            regime_config,
            vol_config,
        )
        .unwrap();

        // Strong climb plus a pinned-low vol index: 5.0 x 3.0 before clamp
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.3).collect();
        let prices = PriceMap::from([("VIX".to_string(), dec!(10))]);
        let result = m.evaluate(
            "SPY",
            &bars_from(&closes),
            &prices,
            &HashMap::new(),
            &PriceHistory::new(),
            &no_history(),
        );
        assert!(result.position_size_multiplier <= dec!(3.0));
        assert!(result.position_size_multiplier >= dec!(0.01));
    }

    #[test]
    fn test_correlation_vetoes() {
        let m = manager();
        let series: Vec<Decimal> = (0..20)
            .map(|i| Decimal::from(100 + i * 2))
            .collect();
        let scaled: Vec<Decimal> = series.iter().map(|p| *p * dec!(10)).collect();
        let mut history = PriceHistory::new();
        history.insert("SPY".to_string(), series);
        history.insert("ES".to_string(), scaled);
        let positions = HashMap::from([(
            "ES".to_string(),
            Position::open("ES", dec!(2), dec!(1000), dec!(1), Utc::now()),
        )]);

        let result = m.evaluate(
            "SPY",
            &[],
            &PriceMap::new(),
            &positions,
            &history,
            &no_history(),
        );
        assert!(!result.allowed);
        assert!(result.reason.contains("correlation"));
    }

    #[test]
    fn test_disabled_evaluators_skip() {
        let m = AdvancedRiskManager::new(
            KellyCriterionConfig {
                enabled: false,
                ..KellyCriterionConfig::default()
            },
            CorrelationLimitsConfig {
                enabled: false,
                ..CorrelationLimitsConfig::default()
            },
            RegimeDetectionConfig {
                enabled: false,
                ..RegimeDetectionConfig::default()
            },
            VolatilityScalingConfig {
                enabled: false,
                ..VolatilityScalingConfig::default()
            },
        )
        .unwrap();

        let result = m.evaluate(
            "SPY",
            &[],
            &PriceMap::new(),
            &HashMap::new(),
            &PriceHistory::new(),
            &no_history(),
        );
        assert!(result.allowed);
        assert_eq!(result.position_size_multiplier, Decimal::ONE);
        assert!(result.kelly.is_none());
        assert!(result.volatility.is_none());
    }

    #[test]
    fn test_reason_concatenates_evaluators() {
        let m = manager();
        let result = m.evaluate(
            "SPY",
            &[],
            &PriceMap::new(),
            &HashMap::new(),
            &PriceHistory::new(),
            &no_history(),
        );
        // One rationale per enabled evaluator
        assert_eq!(result.reason.matches(';').count(), 3);
    }
}
