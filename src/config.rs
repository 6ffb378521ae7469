//! Configuration types for trade-gate
//!
//! All policy knobs live here, deserialized from TOML. Every section is
//! validated once at load time; evaluators and the engine are constructed
//! from already-validated config and never re-check ranges per call.

use crate::engine::{AccountCapabilities, ContractSpec, RiskLimits};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// A rejected configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value}: expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{field}: minimum {min} is not below maximum {max}")]
    InvertedRange {
        field: &'static str,
        min: String,
        max: String,
    },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub account: AccountCapabilities,
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    #[serde(default)]
    pub capital: CapitalConfig,
    #[serde(default)]
    pub kelly: KellyCriterionConfig,
    #[serde(default)]
    pub correlation: CorrelationLimitsConfig,
    #[serde(default)]
    pub regime: RegimeDetectionConfig,
    #[serde(default)]
    pub volatility: VolatilityScalingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate every section
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        self.account.validate()?;
        for contract in &self.contracts {
            contract.validate()?;
        }
        self.capital.validate()?;
        self.kelly.validate()?;
        self.correlation.validate()?;
        self.regime.validate()?;
        self.volatility.validate()?;
        Ok(())
    }
}

/// Capital management policy selection
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapitalMode {
    /// Sweep profits above target into withdrawals
    ProfitWithdrawal,
    /// Leave all profits in the account
    #[default]
    Compounding,
}

/// How often the withdrawal sweep may fire
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalFrequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

/// Capital management configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CapitalConfig {
    #[serde(default)]
    pub mode: CapitalMode,

    /// Equity level to maintain in the account
    #[serde(default = "default_target_equity")]
    pub target_equity: Decimal,

    /// Profit buffer above target before a sweep fires
    #[serde(default = "default_profit_threshold")]
    pub profit_threshold: Decimal,

    #[serde(default)]
    pub frequency: WithdrawalFrequency,
}

fn default_target_equity() -> Decimal {
    Decimal::new(100_000, 0)
}
fn default_profit_threshold() -> Decimal {
    Decimal::new(10_000, 0)
}

impl Default for CapitalConfig {
    fn default() -> Self {
        Self {
            mode: CapitalMode::Compounding,
            target_equity: default_target_equity(),
            profit_threshold: default_profit_threshold(),
            frequency: WithdrawalFrequency::Monthly,
        }
    }
}

impl CapitalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == CapitalMode::ProfitWithdrawal && self.target_equity <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "capital.target_equity",
                value: self.target_equity.to_string(),
                expected: "a positive equity target",
            });
        }
        if self.profit_threshold < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "capital.profit_threshold",
                value: self.profit_threshold.to_string(),
                expected: "a non-negative buffer",
            });
        }
        Ok(())
    }
}

/// Kelly criterion sizing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KellyCriterionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Trades needed before the Kelly estimate is trusted
    #[serde(default = "default_min_trades")]
    pub min_trades_required: u32,

    /// Fractional-Kelly multiplier applied to the raw fraction
    #[serde(default = "default_kelly_multiplier")]
    pub kelly_multiplier: Decimal,

    /// Lower clamp on the applied fraction
    #[serde(default = "default_min_fraction")]
    pub min_fraction: Decimal,

    /// Upper clamp on the applied fraction
    #[serde(default = "default_max_fraction")]
    pub max_fraction: Decimal,

    /// Fraction used below the trade-count threshold
    #[serde(default = "default_fallback_fraction")]
    pub fallback_fraction: Decimal,

    /// Assumed win/loss magnitude ratio when estimating from aggregate P&L
    #[serde(default = "default_payoff_ratio")]
    pub assumed_payoff_ratio: Decimal,
}

fn default_true() -> bool {
    true
}
fn default_min_trades() -> u32 {
    20
}
fn default_kelly_multiplier() -> Decimal {
    Decimal::new(5, 1) // 0.5 = half-Kelly
}
fn default_min_fraction() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_max_fraction() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_fallback_fraction() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_payoff_ratio() -> Decimal {
    Decimal::new(2, 0)
}

impl Default for KellyCriterionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_trades_required: default_min_trades(),
            kelly_multiplier: default_kelly_multiplier(),
            min_fraction: default_min_fraction(),
            max_fraction: default_max_fraction(),
            fallback_fraction: default_fallback_fraction(),
            assumed_payoff_ratio: default_payoff_ratio(),
        }
    }
}

impl KellyCriterionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("kelly.kelly_multiplier", self.kelly_multiplier),
            ("kelly.min_fraction", self.min_fraction),
            ("kelly.max_fraction", self.max_fraction),
            ("kelly.fallback_fraction", self.fallback_fraction),
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
        if self.min_fraction >= self.max_fraction {
            return Err(ConfigError::InvertedRange {
                field: "kelly.min_fraction/max_fraction",
                min: self.min_fraction.to_string(),
                max: self.max_fraction.to_string(),
            });
        }
        if self.assumed_payoff_ratio <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "kelly.assumed_payoff_ratio",
                value: self.assumed_payoff_ratio.to_string(),
                expected: "a positive ratio",
            });
        }
        if self.min_trades_required == 0 {
            return Err(ConfigError::OutOfRange {
                field: "kelly.min_trades_required",
                value: "0".to_string(),
                expected: "at least one trade",
            });
        }
        Ok(())
    }
}

/// Correlation blocking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationLimitsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Absolute Pearson correlation above which a pair breaches
    #[serde(default = "default_max_correlation")]
    pub max_correlation: Decimal,

    /// Return observations per pairwise window
    #[serde(default = "default_corr_lookback")]
    pub lookback: usize,

    /// Minimum observations before a symbol participates
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,

    /// Block the trade on breach, or just report
    #[serde(default = "default_true")]
    pub block_on_breach: bool,
}

fn default_max_correlation() -> Decimal {
    Decimal::new(80, 2) // 0.80
}
fn default_corr_lookback() -> usize {
    30
}
fn default_min_data_points() -> usize {
    10
}

impl Default for CorrelationLimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_correlation: default_max_correlation(),
            lookback: default_corr_lookback(),
            min_data_points: default_min_data_points(),
            block_on_breach: true,
        }
    }
}

impl CorrelationLimitsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_correlation <= Decimal::ZERO || self.max_correlation > Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "correlation.max_correlation",
                value: self.max_correlation.to_string(),
                expected: "a fraction in (0, 1]",
            });
        }
        if self.min_data_points < 3 {
            return Err(ConfigError::OutOfRange {
                field: "correlation.min_data_points",
                value: self.min_data_points.to_string(),
                expected: "at least 3 observations",
            });
        }
        if self.lookback < self.min_data_points {
            return Err(ConfigError::InvertedRange {
                field: "correlation.min_data_points/lookback",
                min: self.min_data_points.to_string(),
                max: self.lookback.to_string(),
            });
        }
        Ok(())
    }
}

/// Regime detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeDetectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bars for the trend-return window
    #[serde(default = "default_trend_lookback")]
    pub trend_lookback: usize,

    /// Bars for the realized-volatility window
    #[serde(default = "default_vol_lookback")]
    pub vol_lookback: usize,

    /// RSI above this reads as overbought
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: Decimal,

    /// RSI below this reads as oversold
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: Decimal,

    /// Trend-return magnitude needed for a strong classification
    #[serde(default = "default_strong_trend_return")]
    pub strong_trend_return: Decimal,

    /// Annualized vol at or below which vol reads as low
    #[serde(default = "default_low_vol")]
    pub low_vol_threshold: Decimal,

    /// Annualized vol at or above which vol reads as elevated
    #[serde(default = "default_high_vol")]
    pub high_vol_threshold: Decimal,

    #[serde(default = "default_strong_bull_multiplier")]
    pub strong_bull_multiplier: Decimal,
    #[serde(default = "default_mild_bull_multiplier")]
    pub mild_bull_multiplier: Decimal,
    #[serde(default = "default_sideways_multiplier")]
    pub sideways_multiplier: Decimal,
    #[serde(default = "default_mild_bear_multiplier")]
    pub mild_bear_multiplier: Decimal,
    #[serde(default = "default_strong_bear_multiplier")]
    pub strong_bear_multiplier: Decimal,
}

fn default_trend_lookback() -> usize {
    20
}
fn default_vol_lookback() -> usize {
    20
}
fn default_rsi_overbought() -> Decimal {
    Decimal::new(70, 0)
}
fn default_rsi_oversold() -> Decimal {
    Decimal::new(30, 0)
}
fn default_strong_trend_return() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_low_vol() -> Decimal {
    Decimal::new(15, 2) // 0.15
}
fn default_high_vol() -> Decimal {
    Decimal::new(25, 2) // 0.25
}
fn default_strong_bull_multiplier() -> Decimal {
    Decimal::new(15, 1) // 1.5
}
fn default_mild_bull_multiplier() -> Decimal {
    Decimal::new(12, 1) // 1.2
}
fn default_sideways_multiplier() -> Decimal {
    Decimal::ONE
}
fn default_mild_bear_multiplier() -> Decimal {
    Decimal::new(7, 1) // 0.7
}
fn default_strong_bear_multiplier() -> Decimal {
    Decimal::new(4, 1) // 0.4
}

impl Default for RegimeDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trend_lookback: default_trend_lookback(),
            vol_lookback: default_vol_lookback(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            strong_trend_return: default_strong_trend_return(),
            low_vol_threshold: default_low_vol(),
            high_vol_threshold: default_high_vol(),
            strong_bull_multiplier: default_strong_bull_multiplier(),
            mild_bull_multiplier: default_mild_bull_multiplier(),
            sideways_multiplier: default_sideways_multiplier(),
            mild_bear_multiplier: default_mild_bear_multiplier(),
            strong_bear_multiplier: default_strong_bear_multiplier(),
        }
    }
}

impl RegimeDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(ConfigError::InvertedRange {
                field: "regime.rsi_oversold/rsi_overbought",
                min: self.rsi_oversold.to_string(),
                max: self.rsi_overbought.to_string(),
            });
        }
        if self.low_vol_threshold >= self.high_vol_threshold {
            return Err(ConfigError::InvertedRange {
                field: "regime.low_vol_threshold/high_vol_threshold",
                min: self.low_vol_threshold.to_string(),
                max: self.high_vol_threshold.to_string(),
            });
        }
        if self.trend_lookback < 2 || self.vol_lookback < 2 {
            return Err(ConfigError::OutOfRange {
                field: "regime.trend_lookback/vol_lookback",
                value: format!("{}/{}", self.trend_lookback, self.vol_lookback),
                expected: "at least 2 bars",
            });
        }
        let multipliers = [
            ("regime.strong_bull_multiplier", self.strong_bull_multiplier),
            ("regime.mild_bull_multiplier", self.mild_bull_multiplier),
            ("regime.sideways_multiplier", self.sideways_multiplier),
            ("regime.mild_bear_multiplier", self.mild_bear_multiplier),
            ("regime.strong_bear_multiplier", self.strong_bear_multiplier),
        ];
        for (field, value) in multipliers {
            if value <= Decimal::ZERO {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                    expected: "a positive multiplier",
                });
            }
        }
        Ok(())
    }
}

/// Volatility scaling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VolatilityScalingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Symbol of the volatility-index proxy in the price map
    #[serde(default = "default_vol_index_symbol")]
    pub vol_index_symbol: String,

    /// Index level at or below which sizing scales fully up
    #[serde(default = "default_vol_low_threshold")]
    pub low_threshold: Decimal,

    /// Index level at or above which sizing scales fully down
    #[serde(default = "default_vol_high_threshold")]
    pub high_threshold: Decimal,

    /// Scale factor at or below the low threshold
    #[serde(default = "default_max_scale_up")]
    pub max_scale_up: Decimal,

    /// Scale factor at or above the high threshold
    #[serde(default = "default_max_scale_down")]
    pub max_scale_down: Decimal,

    /// Fall back to realized volatility when no index reading exists
    #[serde(default = "default_true")]
    pub realized_fallback_enabled: bool,

    /// Target annualized volatility for the realized fallback
    #[serde(default = "default_target_volatility")]
    pub target_volatility: Decimal,

    /// Closes in the realized-volatility window
    #[serde(default = "default_realized_lookback")]
    pub realized_lookback: usize,
}

fn default_vol_index_symbol() -> String {
    "VIX".to_string()
}
fn default_vol_low_threshold() -> Decimal {
    Decimal::new(15, 0)
}
fn default_vol_high_threshold() -> Decimal {
    Decimal::new(30, 0)
}
fn default_max_scale_up() -> Decimal {
    Decimal::new(15, 1) // 1.5
}
fn default_max_scale_down() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_target_volatility() -> Decimal {
    Decimal::new(15, 2) // 0.15
}
fn default_realized_lookback() -> usize {
    20
}

impl Default for VolatilityScalingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vol_index_symbol: default_vol_index_symbol(),
            low_threshold: default_vol_low_threshold(),
            high_threshold: default_vol_high_threshold(),
            max_scale_up: default_max_scale_up(),
            max_scale_down: default_max_scale_down(),
            realized_fallback_enabled: true,
            target_volatility: default_target_volatility(),
            realized_lookback: default_realized_lookback(),
        }
    }
}

impl VolatilityScalingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_threshold >= self.high_threshold {
            return Err(ConfigError::InvertedRange {
                field: "volatility.low_threshold/high_threshold",
                min: self.low_threshold.to_string(),
                max: self.high_threshold.to_string(),
            });
        }
        if self.max_scale_down <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "volatility.max_scale_down",
                value: self.max_scale_down.to_string(),
                expected: "a positive scale factor",
            });
        }
        if self.max_scale_down >= self.max_scale_up {
            return Err(ConfigError::InvertedRange {
                field: "volatility.max_scale_down/max_scale_up",
                min: self.max_scale_down.to_string(),
                max: self.max_scale_up.to_string(),
            });
        }
        if self.target_volatility <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "volatility.target_volatility",
                value: self.target_volatility.to_string(),
                expected: "a positive annualized volatility",
            });
        }
        if self.realized_lookback < 2 {
            return Err(ConfigError::OutOfRange {
                field: "volatility.realized_lookback",
                value: self.realized_lookback.to_string(),
                expected: "at least 2 closes",
            });
        }
        Ok(())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}
