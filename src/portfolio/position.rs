//! Position accounting
//!
//! Weighted-average basis while extending, realized P&L on reductions, and a
//! fresh basis when a fill reverses the position through zero.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position in a single instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol
    pub symbol: String,
    /// Signed quantity (positive long, negative short)
    pub quantity: Decimal,
    /// Average cost basis per unit
    pub avg_price: Decimal,
    /// Contract multiplier (1 for equities, e.g. 50 for an E-mini future)
    pub multiplier: Decimal,
    /// First fill timestamp
    pub opened_at: DateTime<Utc>,
    /// Most recent fill timestamp
    pub updated_at: DateTime<Utc>,
    /// Cumulative absolute quantity traded through this position
    pub traded_volume: Decimal,
}

impl Position {
    /// Open a new position from its first fill
    pub fn open(
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        multiplier: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_price: price,
            multiplier,
            opened_at: timestamp,
            updated_at: timestamp,
            traded_volume: quantity.abs(),
        }
    }

    /// Notional value at the given price
    pub fn notional(&self, price: Decimal) -> Decimal {
        self.quantity * price * self.multiplier
    }

    /// Unrealized P&L at the given mark price
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.avg_price) * self.quantity * self.multiplier
    }

    /// Apply a fill to this position, returning realized P&L.
    ///
    /// Extending in the held direction updates the weighted-average basis.
    /// Reducing realizes (exit - entry) x closed quantity x multiplier; a
    /// reversal additionally opens a fresh basis at the fill price for the
    /// excess. The caller removes the position when quantity reaches zero.
    pub fn apply(
        &mut self,
        quantity_delta: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Decimal {
        let old_qty = self.quantity;
        let new_qty = old_qty + quantity_delta;
        self.traded_volume += quantity_delta.abs();
        self.updated_at = timestamp;

        if old_qty.is_zero() || old_qty.signum() == quantity_delta.signum() {
            // Extending in the held direction: weighted-average basis
            let blended = old_qty.abs() * self.avg_price + quantity_delta.abs() * price;
            self.avg_price = blended / new_qty.abs();
            self.quantity = new_qty;
            return Decimal::ZERO;
        }

        let closed_qty = quantity_delta.abs().min(old_qty.abs());
        let realized = (price - self.avg_price) * closed_qty * self.multiplier * old_qty.signum();

        if quantity_delta.abs() > old_qty.abs() {
            // Reversal: the excess opens a new basis at the fill price
            self.avg_price = price;
        }
        self.quantity = new_qty;
        realized
    }
}
