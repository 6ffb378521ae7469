//! Portfolio ledger
//!
//! Authoritative record of cash and positions, and the source of truth for
//! equity and exposure. All state lives behind an internal lock; methods take
//! `&self` and never leak the lock or raw mutable fields.

mod position;

pub use position::Position;

use crate::engine::{AccountCapabilities, AccountType};
use crate::market::PriceMap;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Calendar days until sale proceeds settle in a cash account
const SETTLEMENT_DAYS: i64 = 2;

/// Portfolio ledger errors
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Fill price must be positive
    #[error("fill price {price} must be positive")]
    NonPositivePrice { price: Decimal },
    /// Fill quantity must be nonzero
    #[error("fill quantity must be nonzero")]
    ZeroQuantity,
    /// Cash movement amount must be positive
    #[error("amount {amount} must be positive")]
    NonPositiveAmount { amount: Decimal },
    /// Withdrawal exceeds cash on hand
    #[error("withdrawal {requested} exceeds cash {available}")]
    InsufficientCash {
        requested: Decimal,
        available: Decimal,
    },
}

/// Tagged ledger event kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEventKind {
    /// A trade fill
    Fill {
        quantity: Decimal,
        price: Decimal,
        commission: Decimal,
        realized_pnl: Decimal,
    },
    /// Cash withdrawn from the account
    Withdrawal,
    /// Cash deposited into the account
    Deposit,
}

/// Append-only ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: Option<String>,
    pub cash_delta: Decimal,
    pub kind: LedgerEventKind,
}

/// Serializable portfolio state for the persistence collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub positions: HashMap<String, Position>,
    pub realized_pnl: Decimal,
    pub commissions_paid: Decimal,
    pub events: Vec<LedgerEvent>,
}

/// The portfolio ledger
pub struct Portfolio {
    state: Mutex<PortfolioSnapshot>,
}

impl Portfolio {
    /// Create a portfolio with an initial cash balance
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            state: Mutex::new(PortfolioSnapshot {
                cash: initial_cash,
                positions: HashMap::new(),
                realized_pnl: Decimal::ZERO,
                commissions_paid: Decimal::ZERO,
                events: Vec::new(),
            }),
        }
    }

    /// Restore a portfolio from a checkpoint snapshot
    pub fn restore(snapshot: PortfolioSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    fn locked(&self) -> MutexGuard<'_, PortfolioSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a fill, returning the realized P&L of the fill.
    ///
    /// Cash changes by -(signed_qty x price x multiplier) - commission.
    pub fn apply_fill(
        &self,
        symbol: &str,
        quantity_delta: Decimal,
        price: Decimal,
        commission: Decimal,
        timestamp: DateTime<Utc>,
        multiplier: Decimal,
    ) -> Result<Decimal, PortfolioError> {
        if price <= Decimal::ZERO {
            return Err(PortfolioError::NonPositivePrice { price });
        }
        if quantity_delta.is_zero() {
            return Err(PortfolioError::ZeroQuantity);
        }

        let mut state = self.locked();
        let realized = match state.positions.get_mut(symbol) {
            Some(position) => {
                let realized = position.apply(quantity_delta, price, timestamp);
                if position.quantity.is_zero() {
                    state.positions.remove(symbol);
                }
                realized
            }
            None => {
                state.positions.insert(
                    symbol.to_string(),
                    Position::open(symbol, quantity_delta, price, multiplier, timestamp),
                );
                Decimal::ZERO
            }
        };

        let cash_delta = -(quantity_delta * price * multiplier) - commission;
        state.cash += cash_delta;
        state.realized_pnl += realized;
        state.commissions_paid += commission;
        state.events.push(LedgerEvent {
            id: Uuid::new_v4(),
            timestamp,
            symbol: Some(symbol.to_string()),
            cash_delta,
            kind: LedgerEventKind::Fill {
                quantity: quantity_delta,
                price,
                commission,
                realized_pnl: realized,
            },
        });

        tracing::debug!(
            symbol,
            %quantity_delta,
            %price,
            %realized,
            cash = %state.cash,
            "fill applied"
        );
        Ok(realized)
    }

    /// Equity: cash plus position notional at last prices.
    ///
    /// Missing prices contribute zero, never an error.
    pub fn equity(&self, last_prices: &PriceMap) -> Decimal {
        let state = self.locked();
        let positions: Decimal = state
            .positions
            .values()
            .filter_map(|p| last_prices.get(&p.symbol).map(|price| p.notional(*price)))
            .sum();
        state.cash + positions
    }

    /// Sum of absolute position notional at last prices
    pub fn gross_exposure(&self, last_prices: &PriceMap) -> Decimal {
        let state = self.locked();
        state
            .positions
            .values()
            .filter_map(|p| {
                last_prices
                    .get(&p.symbol)
                    .map(|price| p.notional(*price).abs())
            })
            .sum()
    }

    /// Signed sum of position notional at last prices
    pub fn net_exposure(&self, last_prices: &PriceMap) -> Decimal {
        let state = self.locked();
        state
            .positions
            .values()
            .filter_map(|p| last_prices.get(&p.symbol).map(|price| p.notional(*price)))
            .sum()
    }

    /// Cash available for new purchases.
    ///
    /// Cash accounts with settlement enforcement exclude sale proceeds still
    /// inside the T+2 window; all other accounts see the full balance.
    pub fn available_cash(
        &self,
        capabilities: &AccountCapabilities,
        as_of: DateTime<Utc>,
    ) -> Decimal {
        let state = self.locked();
        if capabilities.account_type != AccountType::Cash || !capabilities.enforce_settlement {
            return state.cash;
        }
        let pending: Decimal = state
            .events
            .iter()
            .filter(|ev| matches!(ev.kind, LedgerEventKind::Fill { .. }))
            .filter(|ev| ev.cash_delta > Decimal::ZERO)
            .filter(|ev| ev.timestamp + Duration::days(SETTLEMENT_DAYS) > as_of)
            .map(|ev| ev.cash_delta)
            .sum();
        state.cash - pending
    }

    /// Withdraw cash; fails on non-positive amounts or insufficient cash
    pub fn withdraw_cash(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        if amount <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveAmount { amount });
        }
        let mut state = self.locked();
        if amount > state.cash {
            return Err(PortfolioError::InsufficientCash {
                requested: amount,
                available: state.cash,
            });
        }
        state.cash -= amount;
        state.events.push(LedgerEvent {
            id: Uuid::new_v4(),
            timestamp,
            symbol: None,
            cash_delta: -amount,
            kind: LedgerEventKind::Withdrawal,
        });
        tracing::info!(%amount, cash = %state.cash, "cash withdrawn");
        Ok(())
    }

    /// Deposit cash; fails on non-positive amounts
    pub fn deposit_cash(
        &self,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        if amount <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveAmount { amount });
        }
        let mut state = self.locked();
        state.cash += amount;
        state.events.push(LedgerEvent {
            id: Uuid::new_v4(),
            timestamp,
            symbol: None,
            cash_delta: amount,
            kind: LedgerEventKind::Deposit,
        });
        tracing::info!(%amount, cash = %state.cash, "cash deposited");
        Ok(())
    }

    /// Current cash balance
    pub fn cash(&self) -> Decimal {
        self.locked().cash
    }

    /// Cumulative realized P&L
    pub fn realized_pnl(&self) -> Decimal {
        self.locked().realized_pnl
    }

    /// Cumulative commissions paid
    pub fn commissions_paid(&self) -> Decimal {
        self.locked().commissions_paid
    }

    /// Signed quantity currently held in a symbol (zero if flat)
    pub fn position_quantity(&self, symbol: &str) -> Decimal {
        self.locked()
            .positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Copy of a single position, if held
    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.locked().positions.get(symbol).cloned()
    }

    /// Defensive copy of all open positions
    pub fn snapshot_positions(&self) -> HashMap<String, Position> {
        self.locked().positions.clone()
    }

    /// Defensive copy of the ledger event log
    pub fn trade_log(&self) -> Vec<LedgerEvent> {
        self.locked().events.clone()
    }

    /// Full checkpoint snapshot for the persistence collaborator
    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.locked().clone()
    }
}
