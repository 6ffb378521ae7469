//! trade-gate: pre-trade risk and admission control for automated trading
//!
//! This library provides the core components for:
//! - Portfolio ledger: authoritative cash/position accounting
//! - RiskEngine: ordered hard-limit checks, halt state machine, rate limits
//! - Capital management: profit withdrawal or compounding policies
//! - Advanced risk: Kelly sizing, correlation blocking, regime detection,
//!   volatility scaling, composed into one multiplier
//! - TOML configuration with fail-fast validation
//! - Structured logging and decision metrics

pub mod advanced;
pub mod capital;
pub mod config;
pub mod engine;
pub mod market;
pub mod portfolio;
pub mod telemetry;
