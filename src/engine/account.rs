//! Account and instrument metadata
//!
//! Immutable capability/contract configuration, validated once at engine
//! construction.

use crate::config::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brokerage account type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Cash,
    Margin,
}

/// Instrument security type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    Equity,
    Future,
    Option,
}

impl SecurityType {
    pub fn name(&self) -> &'static str {
        match self {
            SecurityType::Equity => "equity",
            SecurityType::Future => "futures",
            SecurityType::Option => "options",
        }
    }
}

/// What the account is permitted to trade
#[derive(Debug, Clone, Deserialize)]
pub struct AccountCapabilities {
    /// Cash or margin account
    pub account_type: AccountType,
    /// Futures trading enabled
    #[serde(default)]
    pub futures_enabled: bool,
    /// Options trading enabled
    #[serde(default)]
    pub options_enabled: bool,
    /// Enforce T+2 settlement on cash accounts
    #[serde(default)]
    pub enforce_settlement: bool,
    /// Minimum equity required to trade futures
    #[serde(default)]
    pub futures_min_balance: Decimal,
    /// Minimum equity required to trade options
    #[serde(default)]
    pub options_min_balance: Decimal,
}

impl Default for AccountCapabilities {
    fn default() -> Self {
        Self {
            account_type: AccountType::Margin,
            futures_enabled: false,
            options_enabled: false,
            enforce_settlement: false,
            futures_min_balance: Decimal::ZERO,
            options_min_balance: Decimal::ZERO,
        }
    }
}

impl AccountCapabilities {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.futures_min_balance < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "account.futures_min_balance",
                value: self.futures_min_balance.to_string(),
                expected: "a non-negative amount",
            });
        }
        if self.options_min_balance < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "account.options_min_balance",
                value: self.options_min_balance.to_string(),
                expected: "a non-negative amount",
            });
        }
        Ok(())
    }
}

/// Per-instrument contract metadata
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSpec {
    /// Instrument symbol
    pub symbol: String,
    /// Security type
    pub security_type: SecurityType,
    /// Listing exchange
    #[serde(default)]
    pub exchange: String,
    /// Contract multiplier
    pub multiplier: Decimal,
}

impl ContractSpec {
    /// Default spec for symbols without explicit contract metadata
    pub fn equity_default(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            security_type: SecurityType::Equity,
            exchange: String::new(),
            multiplier: Decimal::ONE,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.multiplier <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "contracts.multiplier",
                value: self.multiplier.to_string(),
                expected: "a positive multiplier",
            });
        }
        Ok(())
    }
}
