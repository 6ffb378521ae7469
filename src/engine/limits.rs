//! Hard risk limits
//!
//! Immutable thresholds for the pre-trade gate. Created once, validated once,
//! never mutated.

use crate::config::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Hard limits enforced by the risk engine
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum daily loss as a fraction of daily-start equity
    pub max_daily_loss_pct: Decimal,
    /// Maximum drawdown from peak equity
    pub max_drawdown_pct: Decimal,
    /// Maximum single-position notional as a fraction of equity
    pub max_position_fraction: Decimal,
    /// Maximum gross exposure as a multiple of equity
    pub max_gross_exposure: Decimal,
    /// Maximum leverage (net exposure over equity)
    pub max_leverage: Decimal,
    /// Maximum per-trade notional as a fraction of equity
    pub max_risk_per_trade_pct: Decimal,
    /// Absolute per-symbol notional cap
    #[serde(default)]
    pub max_symbol_notional: Option<Decimal>,
    /// Maximum units held in any symbol
    #[serde(default)]
    pub max_units: Option<Decimal>,
    /// Minimum projected cash balance after a trade
    #[serde(default)]
    pub min_cash_balance: Decimal,
    /// Orders allowed in any sliding 60s window; None disables
    #[serde(default)]
    pub max_orders_per_minute: Option<u32>,
    /// Orders allowed per UTC day; None disables
    #[serde(default)]
    pub max_orders_per_day: Option<u32>,
    /// Kill switch: block all non-flattening trades
    #[serde(default)]
    pub kill_switch: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: dec!(0.05),
            max_drawdown_pct: dec!(0.10),
            max_position_fraction: dec!(0.25),
            max_gross_exposure: dec!(2.0),
            max_leverage: dec!(2.0),
            max_risk_per_trade_pct: dec!(0.10),
            max_symbol_notional: None,
            max_units: None,
            min_cash_balance: Decimal::ZERO,
            max_orders_per_minute: None,
            max_orders_per_day: None,
            kill_switch: false,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("risk.max_daily_loss_pct", self.max_daily_loss_pct),
            ("risk.max_drawdown_pct", self.max_drawdown_pct),
            ("risk.max_position_fraction", self.max_position_fraction),
            ("risk.max_risk_per_trade_pct", self.max_risk_per_trade_pct),
        ];
        for (field, value) in fractions {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                    expected: "a fraction in (0, 1]",
                });
            }
        }
        if self.max_gross_exposure <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "risk.max_gross_exposure",
                value: self.max_gross_exposure.to_string(),
                expected: "a positive multiple of equity",
            });
        }
        if self.max_leverage <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "risk.max_leverage",
                value: self.max_leverage.to_string(),
                expected: "a positive multiple of equity",
            });
        }
        if self.min_cash_balance < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "risk.min_cash_balance",
                value: self.min_cash_balance.to_string(),
                expected: "a non-negative amount",
            });
        }
        if let Some(cap) = self.max_symbol_notional {
            if cap <= Decimal::ZERO {
                return Err(ConfigError::OutOfRange {
                    field: "risk.max_symbol_notional",
                    value: cap.to_string(),
                    expected: "a positive notional cap",
                });
            }
        }
        if let Some(cap) = self.max_units {
            if cap <= Decimal::ZERO {
                return Err(ConfigError::OutOfRange {
                    field: "risk.max_units",
                    value: cap.to_string(),
                    expected: "a positive unit cap",
                });
            }
        }
        if self.max_orders_per_minute == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "risk.max_orders_per_minute",
                value: "0".to_string(),
                expected: "a positive order count",
            });
        }
        if self.max_orders_per_day == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "risk.max_orders_per_day",
                value: "0".to_string(),
                expected: "a positive order count",
            });
        }
        Ok(())
    }
}
