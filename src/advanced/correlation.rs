//! Correlation concentration blocking
//!
//! Blocks a candidate trade when its return series correlates too tightly
//! with any symbol already held, so the book does not quietly become one
//! position expressed through several tickers.

use crate::config::CorrelationLimitsConfig;
use crate::portfolio::Position;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Recent close history per symbol, oldest first
pub type PriceHistory = HashMap<String, Vec<Decimal>>;

/// One offending held symbol
#[derive(Debug, Clone)]
pub struct CorrelationBreach {
    pub symbol: String,
    pub correlation: Decimal,
}

/// Outcome of a candidate check
#[derive(Debug, Clone)]
pub struct CorrelationCheckResult {
    pub allowed: bool,
    pub max_correlation: Decimal,
    pub breaches: Vec<CorrelationBreach>,
    pub reason: String,
}

/// Pairwise correlation matrix over all symbols with enough history
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<Decimal>>,
}

pub struct CorrelationMonitor {
    config: CorrelationLimitsConfig,
}

impl CorrelationMonitor {
    pub fn new(config: CorrelationLimitsConfig) -> Self {
        Self { config }
    }

    /// Check a candidate symbol against every held position.
    ///
    /// Symbols with fewer than `min_data_points` observations sit the check
    /// out; a candidate with too little history passes neutrally.
    pub fn check(
        &self,
        candidate: &str,
        positions: &HashMap<String, Position>,
        history: &PriceHistory,
    ) -> CorrelationCheckResult {
        let candidate_closes = match history.get(candidate) {
            Some(closes) if closes.len() >= self.config.min_data_points => closes,
            _ => {
                return CorrelationCheckResult {
                    allowed: true,
                    max_correlation: Decimal::ZERO,
                    breaches: Vec::new(),
                    reason: format!("{candidate}: insufficient history, check skipped"),
                }
            }
        };

        let mut max_correlation = Decimal::ZERO;
        let mut breaches = Vec::new();

        for (symbol, position) in positions {
            if symbol == candidate || position.quantity.is_zero() {
                continue;
            }
            let Some(closes) = history.get(symbol) else {
                continue;
            };
            if closes.len() < self.config.min_data_points {
                continue;
            }
            let Some(correlation) = self.pairwise(candidate_closes, closes) else {
                continue;
            };
            let correlation = correlation.abs();
            if correlation > max_correlation {
                max_correlation = correlation;
            }
            if correlation > self.config.max_correlation {
                breaches.push(CorrelationBreach {
                    symbol: symbol.clone(),
                    correlation,
                });
            }
        }

        let allowed = breaches.is_empty() || !self.config.block_on_breach;
        let reason = if breaches.is_empty() {
            format!("{candidate}: max correlation {max_correlation} within limit")
        } else {
            let pairs: Vec<String> = breaches
                .iter()
                .map(|b| format!("{} ({})", b.symbol, b.correlation))
                .collect();
            format!(
                "{candidate}: correlation above {} with {}",
                self.config.max_correlation,
                pairs.join(", ")
            )
        };

        CorrelationCheckResult {
            allowed,
            max_correlation,
            breaches,
            reason,
        }
    }

    /// Full symmetric matrix over symbols with enough history, diagonal 1
    pub fn matrix(&self, history: &PriceHistory) -> CorrelationMatrix {
        let mut symbols: Vec<String> = history
            .iter()
            .filter(|(_, closes)| closes.len() >= self.config.min_data_points)
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();

        let n = symbols.len();
        let mut values = vec![vec![Decimal::ZERO; n]; n];
        for i in 0..n {
            values[i][i] = Decimal::ONE;
            for j in (i + 1)..n {
                let correlation = self
                    .pairwise(&history[&symbols[i]], &history[&symbols[j]])
                    .unwrap_or(Decimal::ZERO);
                values[i][j] = correlation;
                values[j][i] = correlation;
            }
        }
        CorrelationMatrix { symbols, values }
    }

    /// Pearson correlation of simple returns over the shared most-recent
    /// lookback window
    fn pairwise(&self, a: &[Decimal], b: &[Decimal]) -> Option<Decimal> {
        let window = self.config.lookback + 1;
        let a_returns = returns(tail(a, window));
        let b_returns = returns(tail(b, window));
        let n = a_returns.len().min(b_returns.len());
        if n < 2 {
            return None;
        }
        let xs = &a_returns[a_returns.len() - n..];
        let ys = &b_returns[b_returns.len() - n..];
        pearson(xs, ys).and_then(|r| Decimal::try_from(r).ok())
    }
}

fn tail(closes: &[Decimal], window: usize) -> &[Decimal] {
    if closes.len() > window {
        &closes[closes.len() - window..]
    } else {
        closes
    }
}

fn returns(closes: &[Decimal]) -> Vec<f64> {
    let mut out = Vec::new();
    for i in 1..closes.len() {
        let prev: f64 = closes[i - 1].try_into().unwrap_or(0.0);
        let curr: f64 = closes[i].try_into().unwrap_or(0.0);
        if prev > 0.0 {
            out.push((curr - prev) / prev);
        }
    }
    out
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn held(symbol: &str, qty: Decimal) -> (String, Position) {
        (
            symbol.to_string(),
            Position::open(symbol, qty, dec!(100), dec!(1), Utc::now()),
        )
    }

    fn series(start: f64, step: f64, scale: f64, len: usize) -> Vec<Decimal> {
        // Prices whose simple returns are scalar multiples across series
        // with the same start/step shape
        (0..len)
            .map(|i| Decimal::try_from((start + step * i as f64) * scale).unwrap())
            .collect()
    }

    #[test]
    fn test_scalar_multiple_series_fully_correlated() {
        let monitor = CorrelationMonitor::new(CorrelationLimitsConfig::default());
        let mut history = PriceHistory::new();
        // Same underlying path, one at 10x the price: identical returns
        history.insert("SPY".to_string(), series(100.0, 1.5, 1.0, 20));
        history.insert("ES".to_string(), series(100.0, 1.5, 10.0, 20));
        let positions = HashMap::from([held("ES", dec!(2))]);

        let result = monitor.check("SPY", &positions, &history);
        assert!(result.max_correlation > dec!(0.99));
        assert!(!result.allowed);
        assert_eq!(result.breaches.len(), 1);
        assert_eq!(result.breaches[0].symbol, "ES");
    }

    #[test]
    fn test_report_only_mode_allows() {
        let config = CorrelationLimitsConfig {
            block_on_breach: false,
            ..CorrelationLimitsConfig::default()
        };
        let monitor = CorrelationMonitor::new(config);
        let mut history = PriceHistory::new();
        history.insert("SPY".to_string(), series(100.0, 1.5, 1.0, 20));
        history.insert("ES".to_string(), series(100.0, 1.5, 10.0, 20));
        let positions = HashMap::from([held("ES", dec!(2))]);

        let result = monitor.check("SPY", &positions, &history);
        assert!(result.allowed);
        assert_eq!(result.breaches.len(), 1);
    }

    #[test]
    fn test_insufficient_candidate_history_passes() {
        let monitor = CorrelationMonitor::new(CorrelationLimitsConfig::default());
        let mut history = PriceHistory::new();
        history.insert("SPY".to_string(), vec![dec!(100), dec!(101)]);
        history.insert("ES".to_string(), series(100.0, 1.5, 10.0, 20));
        let positions = HashMap::from([held("ES", dec!(2))]);

        let result = monitor.check("SPY", &positions, &history);
        assert!(result.allowed);
        assert!(result.breaches.is_empty());
    }

    #[test]
    fn test_flat_positions_ignored() {
        let monitor = CorrelationMonitor::new(CorrelationLimitsConfig::default());
        let mut history = PriceHistory::new();
        history.insert("SPY".to_string(), series(100.0, 1.5, 1.0, 20));
        history.insert("ES".to_string(), series(100.0, 1.5, 10.0, 20));
        let positions = HashMap::from([held("ES", dec!(0))]);

        let result = monitor.check("SPY", &positions, &history);
        assert!(result.allowed);
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let monitor = CorrelationMonitor::new(CorrelationLimitsConfig::default());
        let mut history = PriceHistory::new();
        history.insert("A".to_string(), series(100.0, 1.5, 1.0, 20));
        history.insert("B".to_string(), series(100.0, 1.5, 2.0, 20));
        history.insert("C".to_string(), series(50.0, -0.8, 1.0, 20));

        let matrix = monitor.matrix(&history);
        assert_eq!(matrix.symbols.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.values[i][i], Decimal::ONE);
            for j in 0..3 {
                assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            }
        }
    }
}
