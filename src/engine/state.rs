//! Mutable engine state and halt bookkeeping
//!
//! RiskState is the persisted portion of the engine: a restored state must
//! reproduce identical subsequent pre-trade decisions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Why trading was halted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltReason {
    /// Daily loss limit breached
    DailyLoss { loss_pct: Decimal },
    /// Drawdown from peak equity breached
    Drawdown { drawdown_pct: Decimal },
    /// Operator kill switch
    Manual { reason: String },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::DailyLoss { loss_pct } => write!(f, "daily loss {loss_pct}"),
            HaltReason::Drawdown { drawdown_pct } => write!(f, "drawdown {drawdown_pct}"),
            HaltReason::Manual { reason } => write!(f, "manual halt: {reason}"),
        }
    }
}

/// State mutation committed during a pre-trade check.
///
/// These transitions are facts about the world: they stay committed even when
/// the check subsequently fails.
#[derive(Debug, Clone, PartialEq)]
pub enum StateTransition {
    /// First check of a new UTC day: counters rebased, halt cleared
    DailyReset { date: NaiveDate },
    /// Equity set a new high-water mark
    NewPeakEquity { previous: Decimal, current: Decimal },
}

/// Persisted risk engine state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    /// Equity at the start of the current UTC day
    pub daily_start_equity: Decimal,
    /// High-water mark
    pub peak_equity: Decimal,
    /// Halt flag and reason
    pub halted: Option<HaltReason>,
    /// Last daily reset date (UTC)
    pub last_reset_date: NaiveDate,
    /// Realized P&L accumulated today
    pub daily_pnl: Decimal,
    /// Orders submitted today
    pub daily_order_count: u32,
    /// Submission timestamps inside the sliding rate window
    pub recent_orders: VecDeque<DateTime<Utc>>,
}

impl RiskState {
    /// Fresh state at session start
    pub fn new(initial_equity: Decimal, date: NaiveDate) -> Self {
        Self {
            daily_start_equity: initial_equity,
            peak_equity: initial_equity,
            halted: None,
            last_reset_date: date,
            daily_pnl: Decimal::ZERO,
            daily_order_count: 0,
            recent_orders: VecDeque::new(),
        }
    }

    /// Fractional decline of equity from the high-water mark
    pub fn drawdown(&self, equity: Decimal) -> Decimal {
        if self.peak_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.peak_equity - equity) / self.peak_equity
    }

    /// Fractional loss of equity against daily-start equity
    pub fn daily_loss_pct(&self, equity: Decimal) -> Decimal {
        if self.daily_start_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.daily_start_equity - equity) / self.daily_start_equity
    }
}
