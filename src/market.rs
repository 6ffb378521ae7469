//! Market data input types
//!
//! Read-only inputs to the risk evaluators. Bars are validated once at
//! construction; evaluators never re-check them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Last-price lookup keyed by symbol
pub type PriceMap = HashMap<String, Decimal>;

/// Market data validation errors
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Bar high below bar low
    #[error("invalid bar for {symbol}: high {high} below low {low}")]
    HighBelowLow {
        symbol: String,
        high: Decimal,
        low: Decimal,
    },
    /// Bar contains a non-positive price
    #[error("invalid bar for {symbol}: non-positive price")]
    NonPositivePrice { symbol: String },
}

/// A single OHLC bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Instrument symbol
    pub symbol: String,
    /// Bar timestamp (UTC)
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Traded volume
    pub volume: Decimal,
}

impl Bar {
    /// Create a validated bar; enforces `high >= low` and positive prices
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, MarketDataError> {
        let symbol = symbol.into();
        if high < low {
            return Err(MarketDataError::HighBelowLow { symbol, high, low });
        }
        if open <= Decimal::ZERO || low <= Decimal::ZERO {
            return Err(MarketDataError::NonPositivePrice { symbol });
        }
        Ok(Self {
            symbol,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}
