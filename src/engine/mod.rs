//! Pre-trade risk engine
//!
//! The single gate every candidate trade passes through: ordered hard-limit
//! checks, the halt/resume state machine, order-rate limiting, and daily
//! bookkeeping. One engine and one portfolio are shared per trading session;
//! the internal lock linearizes all checks and registrations.

mod account;
mod limits;
mod state;
mod violation;

pub use account::{AccountCapabilities, AccountType, ContractSpec, SecurityType};
pub use limits::RiskLimits;
pub use state::{HaltReason, RiskState, StateTransition};
pub use violation::RiskViolation;

use crate::config::ConfigError;
use crate::market::PriceMap;
use crate::portfolio::Portfolio;
use crate::telemetry::{record_decision, set_gauge, DecisionMetric, GaugeMetric};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Sliding rate-limit window
const RATE_WINDOW_SECS: i64 = 60;

/// A passed pre-trade check, carrying the state transitions it committed.
///
/// Transitions also commit on the failing path; halt-carrying violations are
/// the tag for those.
#[derive(Debug, Clone, PartialEq)]
pub struct PreTradePass {
    pub transitions: Vec<StateTransition>,
}

/// The pre-trade gate
pub struct RiskEngine {
    limits: RiskLimits,
    capabilities: AccountCapabilities,
    contracts: HashMap<String, ContractSpec>,
    default_contract: ContractSpec,
    portfolio: Arc<Portfolio>,
    state: Mutex<RiskState>,
}

impl RiskEngine {
    /// Create an engine with fresh state; validates all configuration
    pub fn new(
        limits: RiskLimits,
        capabilities: AccountCapabilities,
        contracts: Vec<ContractSpec>,
        portfolio: Arc<Portfolio>,
        initial_equity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let state = RiskState::new(initial_equity, now.date_naive());
        Self::restore(limits, capabilities, contracts, portfolio, state)
    }

    /// Rebuild an engine around checkpointed state.
    ///
    /// A restored engine reproduces identical subsequent decisions, as if the
    /// process had never restarted.
    pub fn restore(
        limits: RiskLimits,
        capabilities: AccountCapabilities,
        contracts: Vec<ContractSpec>,
        portfolio: Arc<Portfolio>,
        state: RiskState,
    ) -> Result<Self, ConfigError> {
        limits.validate()?;
        capabilities.validate()?;
        let mut by_symbol = HashMap::new();
        for spec in contracts {
            spec.validate()?;
            by_symbol.insert(spec.symbol.clone(), spec);
        }
        Ok(Self {
            limits,
            capabilities,
            contracts: by_symbol,
            default_contract: ContractSpec::equity_default(""),
            portfolio,
            state: Mutex::new(state),
        })
    }

    fn locked(&self) -> MutexGuard<'_, RiskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn contract(&self, symbol: &str) -> &ContractSpec {
        self.contracts.get(symbol).unwrap_or(&self.default_contract)
    }

    /// Run the full pre-trade check ladder for a candidate quantity change.
    ///
    /// Checks short-circuit in a fixed order; state transitions committed
    /// before a failing check (daily reset, new peak equity, halt) stay
    /// committed.
    #[allow(clippy::too_many_arguments)]
    pub fn check_pre_trade(
        &self,
        symbol: &str,
        quantity_delta: Decimal,
        price: Decimal,
        equity: Decimal,
        last_prices: &PriceMap,
        timestamp: DateTime<Utc>,
    ) -> Result<PreTradePass, RiskViolation> {
        let mut state = self.locked();
        let result = self.run_checks(
            &mut state,
            symbol,
            quantity_delta,
            price,
            equity,
            last_prices,
            timestamp,
        );
        drop(state);

        match &result {
            Ok(pass) => {
                record_decision(DecisionMetric::PreTradeApproved);
                tracing::debug!(
                    symbol,
                    %quantity_delta,
                    %price,
                    transitions = pass.transitions.len(),
                    "pre-trade approved"
                );
            }
            Err(violation) => {
                record_decision(DecisionMetric::PreTradeBlocked);
                tracing::warn!(
                    symbol,
                    %quantity_delta,
                    check = violation.check_name(),
                    reason = %violation,
                    "pre-trade blocked"
                );
            }
        }
        set_gauge(GaugeMetric::Equity, to_f64(equity));
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_checks(
        &self,
        state: &mut RiskState,
        symbol: &str,
        quantity_delta: Decimal,
        price: Decimal,
        equity: Decimal,
        last_prices: &PriceMap,
        timestamp: DateTime<Utc>,
    ) -> Result<PreTradePass, RiskViolation> {
        let mut transitions = Vec::new();

        // 1. first check of a new UTC day rolls the session over
        if let Some(t) = Self::maybe_reset_daily(state, equity, timestamp) {
            transitions.push(t);
        }

        let contract = self.contract(symbol);
        let multiplier = contract.multiplier;
        let current_qty = self.portfolio.position_quantity(symbol);
        let new_qty = current_qty + quantity_delta;
        let reducing = new_qty.abs() < current_qty.abs();
        let flattening =
            reducing && (new_qty.is_zero() || new_qty.signum() == current_qty.signum());

        // 2. halt gate: only flattening trades pass while halted
        if self.limits.kill_switch && !flattening {
            return Err(RiskViolation::KillSwitch);
        }
        if let Some(reason) = &state.halted {
            if !flattening {
                return Err(RiskViolation::Halted {
                    reason: reason.clone(),
                });
            }
        }

        // 3. account capabilities
        match contract.security_type {
            SecurityType::Future => {
                if !self.capabilities.futures_enabled {
                    return Err(RiskViolation::InstrumentNotEnabled {
                        symbol: symbol.to_string(),
                        instrument: contract.security_type.name(),
                    });
                }
                if equity < self.capabilities.futures_min_balance {
                    return Err(RiskViolation::InsufficientAccountBalance {
                        instrument: contract.security_type.name(),
                        required: self.capabilities.futures_min_balance,
                        available: equity,
                    });
                }
            }
            SecurityType::Option => {
                if !self.capabilities.options_enabled {
                    return Err(RiskViolation::InstrumentNotEnabled {
                        symbol: symbol.to_string(),
                        instrument: contract.security_type.name(),
                    });
                }
                if equity < self.capabilities.options_min_balance {
                    return Err(RiskViolation::InsufficientAccountBalance {
                        instrument: contract.security_type.name(),
                        required: self.capabilities.options_min_balance,
                        available: equity,
                    });
                }
            }
            SecurityType::Equity => {}
        }
        let cash_needed = quantity_delta * price * multiplier;
        if self.capabilities.account_type == AccountType::Cash && cash_needed > Decimal::ZERO {
            let available = self.portfolio.available_cash(&self.capabilities, timestamp);
            if cash_needed > available {
                return Err(RiskViolation::InsufficientSettledCash {
                    required: cash_needed,
                    available,
                });
            }
        }

        // 4. minimum balance floor on projected cash
        let projected_cash = self.portfolio.cash() - cash_needed;
        if projected_cash < self.limits.min_cash_balance {
            return Err(RiskViolation::MinBalance {
                projected: projected_cash,
                floor: self.limits.min_cash_balance,
            });
        }

        // 5. per-trade notional cap, skipped when reducing exposure
        let trade_notional = quantity_delta.abs() * price * multiplier;
        if !reducing {
            let cap = self.limits.max_risk_per_trade_pct * equity;
            if trade_notional > cap {
                return Err(RiskViolation::PerTradeNotional {
                    notional: trade_notional,
                    limit: cap,
                });
            }
        }

        // 6. order-rate limiting
        if let Some(limit) = self.limits.max_orders_per_minute {
            let cutoff = timestamp - Duration::seconds(RATE_WINDOW_SECS);
            while let Some(ts) = state.recent_orders.front() {
                if *ts < cutoff {
                    state.recent_orders.pop_front();
                } else {
                    break;
                }
            }
            let count = state.recent_orders.len() as u32;
            if count >= limit {
                return Err(RiskViolation::RateLimitPerMinute { count, limit });
            }
        }
        if let Some(limit) = self.limits.max_orders_per_day {
            if state.daily_order_count >= limit {
                return Err(RiskViolation::RateLimitDaily {
                    count: state.daily_order_count,
                    limit,
                });
            }
        }

        // 7. daily loss limit; halt fires once at the transition
        let loss_pct = state.daily_loss_pct(equity);
        if state.halted.is_none() && loss_pct >= self.limits.max_daily_loss_pct {
            state.halted = Some(HaltReason::DailyLoss { loss_pct });
            record_decision(DecisionMetric::HaltTriggered);
            tracing::warn!(%loss_pct, "daily loss limit breached; halting");
            return Err(RiskViolation::DailyLossHalt {
                loss_pct,
                limit: self.limits.max_daily_loss_pct,
            });
        }

        // 8. drawdown from the high-water mark; the peak update commits
        // whether or not the check passes
        if equity > state.peak_equity {
            transitions.push(StateTransition::NewPeakEquity {
                previous: state.peak_equity,
                current: equity,
            });
            state.peak_equity = equity;
        }
        let drawdown = state.drawdown(equity);
        if state.halted.is_none() && drawdown >= self.limits.max_drawdown_pct {
            state.halted = Some(HaltReason::Drawdown {
                drawdown_pct: drawdown,
            });
            record_decision(DecisionMetric::HaltTriggered);
            tracing::warn!(%drawdown, "drawdown limit breached; halting");
            return Err(RiskViolation::DrawdownHalt {
                drawdown_pct: drawdown,
                limit: self.limits.max_drawdown_pct,
            });
        }

        // 9. post-trade position fraction; exactly at the limit passes.
        // Reductions skip this: a position already over the cap after a
        // price move must stay reducible.
        let post_notional = new_qty.abs() * price * multiplier;
        let fraction_cap = self.limits.max_position_fraction * equity;
        if !reducing && post_notional > fraction_cap {
            return Err(RiskViolation::PositionFraction {
                notional: post_notional,
                limit: fraction_cap,
                pct: self.limits.max_position_fraction,
            });
        }

        // 10. gross exposure, with this symbol re-marked at the trade price
        let current_marked = last_prices
            .get(symbol)
            .map(|p| current_qty.abs() * *p * multiplier)
            .unwrap_or(Decimal::ZERO);
        let projected_gross =
            self.portfolio.gross_exposure(last_prices) - current_marked + post_notional;
        let gross_cap = self.limits.max_gross_exposure * equity;
        if projected_gross > gross_cap {
            return Err(RiskViolation::GrossExposure {
                exposure: projected_gross,
                limit: gross_cap,
            });
        }

        // 11. leverage on projected net exposure
        let current_net_marked = last_prices
            .get(symbol)
            .map(|p| current_qty * *p * multiplier)
            .unwrap_or(Decimal::ZERO);
        let projected_net = self.portfolio.net_exposure(last_prices) - current_net_marked
            + new_qty * price * multiplier;
        let leverage_cap = self.limits.max_leverage * equity;
        if projected_net.abs() > leverage_cap {
            return Err(RiskViolation::Leverage {
                exposure: projected_net.abs(),
                limit: leverage_cap,
            });
        }

        // 12. per-symbol notional and unit caps
        if let Some(cap) = self.limits.max_symbol_notional {
            if post_notional > cap {
                return Err(RiskViolation::SymbolNotional {
                    notional: post_notional,
                    limit: cap,
                });
            }
        }
        if let Some(cap) = self.limits.max_units {
            if new_qty.abs() > cap {
                return Err(RiskViolation::MaxUnits {
                    units: new_qty.abs(),
                    limit: cap,
                });
            }
        }

        Ok(PreTradePass { transitions })
    }

    fn maybe_reset_daily(
        state: &mut RiskState,
        equity: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Option<StateTransition> {
        let today = timestamp.date_naive();
        if today <= state.last_reset_date {
            return None;
        }
        if let Some(reason) = state.halted.take() {
            tracing::info!(%reason, "daily reset: halt cleared");
        }
        state.last_reset_date = today;
        state.daily_start_equity = equity;
        state.daily_pnl = Decimal::ZERO;
        state.daily_order_count = 0;
        state.recent_orders.clear();
        Some(StateTransition::DailyReset { date: today })
    }

    /// Record one successfully-routed order.
    ///
    /// Decoupled from the check so retries of a blocked order never
    /// double-count against the rate window.
    pub fn record_order_submission(&self, timestamp: DateTime<Utc>) {
        let mut state = self.locked();
        state.recent_orders.push_back(timestamp);
        state.daily_order_count += 1;
        record_decision(DecisionMetric::OrderSubmitted);
    }

    /// Register a completed fill's P&L.
    ///
    /// Accumulates daily realized P&L and independently halts on a
    /// realized-loss breach, which catches slippage and fee effects the
    /// pre-trade estimate missed.
    pub fn register_trade(
        &self,
        realized_pnl: Decimal,
        unrealized_pnl: Decimal,
        timestamp: DateTime<Utc>,
        equity: Decimal,
        last_prices: &PriceMap,
    ) -> Result<(), RiskViolation> {
        let mut state = self.locked();
        Self::maybe_reset_daily(&mut state, equity, timestamp);
        state.daily_pnl += realized_pnl;
        if equity > state.peak_equity {
            state.peak_equity = equity;
        }

        set_gauge(GaugeMetric::Equity, to_f64(equity));
        set_gauge(GaugeMetric::PeakEquity, to_f64(state.peak_equity));
        set_gauge(GaugeMetric::DrawdownPct, to_f64(state.drawdown(equity)));
        set_gauge(GaugeMetric::DailyPnl, to_f64(state.daily_pnl));
        set_gauge(
            GaugeMetric::GrossExposure,
            to_f64(self.portfolio.gross_exposure(last_prices)),
        );
        tracing::debug!(%realized_pnl, %unrealized_pnl, %equity, "trade registered");

        if state.halted.is_none()
            && state.daily_start_equity > Decimal::ZERO
            && state.daily_pnl < Decimal::ZERO
        {
            let loss_pct = -state.daily_pnl / state.daily_start_equity;
            if loss_pct >= self.limits.max_daily_loss_pct {
                state.halted = Some(HaltReason::DailyLoss { loss_pct });
                record_decision(DecisionMetric::HaltTriggered);
                tracing::warn!(%loss_pct, "realized daily loss breached; halting");
                return Err(RiskViolation::DailyLossHalt {
                    loss_pct,
                    limit: self.limits.max_daily_loss_pct,
                });
            }
        }
        Ok(())
    }

    /// Rebase baselines after a planned withdrawal so it never reads as a
    /// loss or drawdown.
    pub fn adjust_for_withdrawal(&self, amount: Decimal) {
        let mut state = self.locked();
        state.daily_start_equity -= amount;
        state.peak_equity -= amount;
        tracing::info!(
            %amount,
            daily_start = %state.daily_start_equity,
            peak = %state.peak_equity,
            "baselines rebased for withdrawal"
        );
    }

    /// Operator kill switch
    pub fn halt(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.locked();
        tracing::warn!(%reason, "manual halt");
        state.halted = Some(HaltReason::Manual { reason });
        record_decision(DecisionMetric::HaltTriggered);
    }

    pub fn is_halted(&self) -> bool {
        self.locked().halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.locked().halted.clone()
    }

    /// Checkpoint snapshot for the persistence collaborator
    pub fn snapshot_state(&self) -> RiskState {
        self.locked().clone()
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.try_into().unwrap_or(0.0)
}
