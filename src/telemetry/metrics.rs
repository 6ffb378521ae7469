//! Decision counters and account gauges
//!
//! Thin wrappers over the `metrics` facade; an exporter is wired up by the
//! host process, not here.

use metrics::{counter, gauge};

/// Countable gate decisions
#[derive(Debug, Clone, Copy)]
pub enum DecisionMetric {
    /// Pre-trade check passed
    PreTradeApproved,
    /// Pre-trade check blocked
    PreTradeBlocked,
    /// Session halt triggered
    HaltTriggered,
    /// Order recorded against the rate window
    OrderSubmitted,
    /// Capital sweep executed
    WithdrawalExecuted,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Current equity
    Equity,
    /// High-water mark
    PeakEquity,
    /// Current drawdown percentage
    DrawdownPct,
    /// Daily realized P&L
    DailyPnl,
    /// Gross exposure
    GrossExposure,
    /// Advanced-risk position size multiplier
    SizeMultiplier,
}

/// Increment a decision counter
pub fn record_decision(metric: DecisionMetric) {
    let metric_name = match metric {
        DecisionMetric::PreTradeApproved => "tradegate_pretrade_approved_total",
        DecisionMetric::PreTradeBlocked => "tradegate_pretrade_blocked_total",
        DecisionMetric::HaltTriggered => "tradegate_halts_total",
        DecisionMetric::OrderSubmitted => "tradegate_orders_submitted_total",
        DecisionMetric::WithdrawalExecuted => "tradegate_withdrawals_total",
    };
    counter!(metric_name).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Equity => "tradegate_equity_usd",
        GaugeMetric::PeakEquity => "tradegate_peak_equity_usd",
        GaugeMetric::DrawdownPct => "tradegate_drawdown_pct",
        GaugeMetric::DailyPnl => "tradegate_daily_pnl_usd",
        GaugeMetric::GrossExposure => "tradegate_gross_exposure_usd",
        GaugeMetric::SizeMultiplier => "tradegate_size_multiplier",
    };
    gauge!(metric_name).set(value);
}
