//! Pre-trade violations
//!
//! Expected, frequent outcomes of the gate: each carries the computed value
//! and the limit it exceeded. Violations that halt the session are tagged as
//! such so callers can see the committed transition in the error itself.

use super::state::HaltReason;
use rust_decimal::Decimal;
use thiserror::Error;

/// A blocked trade, with the value computed and the limit exceeded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskViolation {
    /// Kill switch engaged in limits
    #[error("kill switch engaged: only flattening orders allowed")]
    KillSwitch,

    /// Session halted; only flattening trades pass
    #[error("trading halted ({reason}): only flattening orders allowed")]
    Halted { reason: HaltReason },

    /// Instrument class not enabled for this account
    #[error("{instrument} trading not enabled for {symbol}")]
    InstrumentNotEnabled {
        symbol: String,
        instrument: &'static str,
    },

    /// Equity below the minimum required for this instrument class
    #[error("{instrument} require equity {required}, have {available}")]
    InsufficientAccountBalance {
        instrument: &'static str,
        required: Decimal,
        available: Decimal,
    },

    /// Cash account lacks settled funds for the purchase
    #[error("purchase needs {required} settled cash, have {available}")]
    InsufficientSettledCash {
        required: Decimal,
        available: Decimal,
    },

    /// Projected cash would fall below the configured floor
    #[error("projected cash {projected} below minimum balance {floor}")]
    MinBalance { projected: Decimal, floor: Decimal },

    /// Per-trade notional above the per-trade risk cap
    #[error("trade notional {notional} exceeds per-trade cap {limit}")]
    PerTradeNotional { notional: Decimal, limit: Decimal },

    /// Too many orders in the sliding 60s window
    #[error("{count} orders in the last 60s, limit {limit}")]
    RateLimitPerMinute { count: u32, limit: u32 },

    /// Too many orders today
    #[error("{count} orders today, limit {limit}")]
    RateLimitDaily { count: u32, limit: u32 },

    /// Daily loss limit breached; session halted
    #[error("daily loss {loss_pct} breached limit {limit}; trading halted")]
    DailyLossHalt { loss_pct: Decimal, limit: Decimal },

    /// Drawdown limit breached; session halted
    #[error("drawdown {drawdown_pct} breached limit {limit}; trading halted")]
    DrawdownHalt {
        drawdown_pct: Decimal,
        limit: Decimal,
    },

    /// Post-trade position notional above the equity-fraction cap
    #[error("position notional {notional} exceeds {pct} of equity ({limit})")]
    PositionFraction {
        notional: Decimal,
        limit: Decimal,
        pct: Decimal,
    },

    /// Projected gross exposure above the cap
    #[error("gross exposure {exposure} exceeds limit {limit}")]
    GrossExposure { exposure: Decimal, limit: Decimal },

    /// Projected leverage above the cap
    #[error("net exposure {exposure} exceeds leverage limit {limit}")]
    Leverage { exposure: Decimal, limit: Decimal },

    /// Per-symbol notional cap exceeded
    #[error("symbol notional {notional} exceeds cap {limit}")]
    SymbolNotional { notional: Decimal, limit: Decimal },

    /// Per-symbol unit cap exceeded
    #[error("{units} units exceeds cap {limit}")]
    MaxUnits { units: Decimal, limit: Decimal },
}

impl RiskViolation {
    /// Short label for logs and metrics
    pub fn check_name(&self) -> &'static str {
        match self {
            RiskViolation::KillSwitch => "kill_switch",
            RiskViolation::Halted { .. } => "halted",
            RiskViolation::InstrumentNotEnabled { .. } => "instrument_enabled",
            RiskViolation::InsufficientAccountBalance { .. } => "account_balance",
            RiskViolation::InsufficientSettledCash { .. } => "settled_cash",
            RiskViolation::MinBalance { .. } => "min_balance",
            RiskViolation::PerTradeNotional { .. } => "per_trade_notional",
            RiskViolation::RateLimitPerMinute { .. } => "rate_limit_minute",
            RiskViolation::RateLimitDaily { .. } => "rate_limit_daily",
            RiskViolation::DailyLossHalt { .. } => "daily_loss",
            RiskViolation::DrawdownHalt { .. } => "drawdown",
            RiskViolation::PositionFraction { .. } => "position_fraction",
            RiskViolation::GrossExposure { .. } => "gross_exposure",
            RiskViolation::Leverage { .. } => "leverage",
            RiskViolation::SymbolNotional { .. } => "symbol_notional",
            RiskViolation::MaxUnits { .. } => "max_units",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_message_names_limit_and_value() {
        let v = RiskViolation::DailyLossHalt {
            loss_pct: dec!(0.06),
            limit: dec!(0.05),
        };
        let msg = v.to_string();
        assert!(msg.contains("0.06"));
        assert!(msg.contains("0.05"));
    }

    #[test]
    fn test_halted_message_mentions_reason() {
        let v = RiskViolation::Halted {
            reason: HaltReason::Drawdown {
                drawdown_pct: dec!(0.11),
            },
        };
        assert!(v.to_string().contains("drawdown"));
    }
}
