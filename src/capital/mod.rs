//! Capital management policy
//!
//! Periodically sweeps profits out of the portfolio, or deliberately does
//! nothing. Call sites are identical regardless of which policy is
//! configured.

use crate::config::{CapitalConfig, CapitalMode, WithdrawalFrequency};
use crate::engine::RiskEngine;
use crate::portfolio::{Portfolio, PortfolioError};
use crate::telemetry::{record_decision, DecisionMetric};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Closed set of capital policies
pub enum CapitalStrategy {
    /// Sweep equity above target + threshold into withdrawals
    ProfitWithdrawal(ProfitWithdrawal),
    /// Leave all profits in the account
    Compounding,
}

impl CapitalStrategy {
    pub fn from_config(config: &CapitalConfig) -> Self {
        match config.mode {
            CapitalMode::ProfitWithdrawal => {
                CapitalStrategy::ProfitWithdrawal(ProfitWithdrawal::new(
                    config.target_equity,
                    config.profit_threshold,
                    config.frequency,
                ))
            }
            CapitalMode::Compounding => CapitalStrategy::Compounding,
        }
    }

    /// Run the policy once; returns the amount withdrawn, if any.
    ///
    /// A withdrawal always pairs with an engine baseline adjustment of the
    /// same amount so it never reads as a loss or drawdown.
    pub fn check_and_withdraw(
        &self,
        portfolio: &Portfolio,
        engine: &RiskEngine,
        equity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Decimal>, PortfolioError> {
        match self {
            CapitalStrategy::ProfitWithdrawal(policy) => {
                policy.check_and_withdraw(portfolio, engine, equity, now)
            }
            CapitalStrategy::Compounding => Ok(None),
        }
    }
}

/// Profit sweep above a target equity level
pub struct ProfitWithdrawal {
    target_equity: Decimal,
    profit_threshold: Decimal,
    frequency: WithdrawalFrequency,
    last_withdrawal: Mutex<Option<DateTime<Utc>>>,
}

impl ProfitWithdrawal {
    pub fn new(
        target_equity: Decimal,
        profit_threshold: Decimal,
        frequency: WithdrawalFrequency,
    ) -> Self {
        Self {
            target_equity,
            profit_threshold,
            frequency,
            last_withdrawal: Mutex::new(None),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.last_withdrawal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn interval(&self) -> Duration {
        match self.frequency {
            WithdrawalFrequency::Daily => Duration::days(1),
            WithdrawalFrequency::Weekly => Duration::days(7),
            WithdrawalFrequency::Monthly => Duration::days(30),
        }
    }

    fn check_and_withdraw(
        &self,
        portfolio: &Portfolio,
        engine: &RiskEngine,
        equity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Decimal>, PortfolioError> {
        let mut last = self.locked();
        if let Some(prev) = *last {
            if now - prev < self.interval() {
                return Ok(None);
            }
        }

        let floor = self.target_equity + self.profit_threshold;
        if equity <= floor {
            return Ok(None);
        }

        // Cap at cash: open positions are not liquidated to fund a sweep
        let excess = equity - floor;
        let amount = excess.min(portfolio.cash());
        if amount <= Decimal::ZERO {
            return Ok(None);
        }

        portfolio.withdraw_cash(amount, now)?;
        engine.adjust_for_withdrawal(amount);
        *last = Some(now);

        record_decision(DecisionMetric::WithdrawalExecuted);
        tracing::info!(%amount, %equity, floor = %floor, "profit sweep executed");
        Ok(Some(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AccountCapabilities, RiskLimits};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn setup(cash: Decimal) -> (Arc<Portfolio>, RiskEngine) {
        let portfolio = Arc::new(Portfolio::new(cash));
        let engine = RiskEngine::new(
            RiskLimits::default(),
            AccountCapabilities::default(),
            vec![],
            Arc::clone(&portfolio),
            cash,
            Utc::now(),
        )
        .unwrap();
        (portfolio, engine)
    }

    #[test]
    fn test_compounding_is_noop() {
        let (portfolio, engine) = setup(dec!(200000));
        let strategy = CapitalStrategy::Compounding;
        let swept = strategy
            .check_and_withdraw(&portfolio, &engine, dec!(200000), Utc::now())
            .unwrap();
        assert_eq!(swept, None);
        assert_eq!(portfolio.cash(), dec!(200000));
    }

    #[test]
    fn test_sweep_above_floor() {
        let (portfolio, engine) = setup(dec!(130000));
        let strategy = CapitalStrategy::ProfitWithdrawal(ProfitWithdrawal::new(
            dec!(100000),
            dec!(10000),
            WithdrawalFrequency::Daily,
        ));

        let swept = strategy
            .check_and_withdraw(&portfolio, &engine, dec!(130000), Utc::now())
            .unwrap();
        assert_eq!(swept, Some(dec!(20000)));
        assert_eq!(portfolio.cash(), dec!(110000));
        // Baselines rebased by the same amount
        assert_eq!(engine.snapshot_state().peak_equity, dec!(110000));
    }

    #[test]
    fn test_no_sweep_below_floor() {
        let (portfolio, engine) = setup(dec!(105000));
        let strategy = CapitalStrategy::ProfitWithdrawal(ProfitWithdrawal::new(
            dec!(100000),
            dec!(10000),
            WithdrawalFrequency::Daily,
        ));
        let swept = strategy
            .check_and_withdraw(&portfolio, &engine, dec!(105000), Utc::now())
            .unwrap();
        assert_eq!(swept, None);
    }

    #[test]
    fn test_sweep_capped_at_cash() {
        let (portfolio, engine) = setup(dec!(130000));
        let now = Utc::now();
        // Most of the equity is in a position; only cash can be swept
        portfolio
            .apply_fill("AAPL", dec!(1250), dec!(100), dec!(0), now, dec!(1))
            .unwrap();
        assert_eq!(portfolio.cash(), dec!(5000));

        let strategy = CapitalStrategy::ProfitWithdrawal(ProfitWithdrawal::new(
            dec!(100000),
            dec!(10000),
            WithdrawalFrequency::Daily,
        ));
        let swept = strategy
            .check_and_withdraw(&portfolio, &engine, dec!(130000), now)
            .unwrap();
        assert_eq!(swept, Some(dec!(5000)));
        assert_eq!(portfolio.cash(), dec!(0));
    }

    #[test]
    fn test_frequency_gate() {
        let (portfolio, engine) = setup(dec!(200000));
        let strategy = CapitalStrategy::ProfitWithdrawal(ProfitWithdrawal::new(
            dec!(100000),
            dec!(10000),
            WithdrawalFrequency::Weekly,
        ));
        let now = Utc::now();

        let first = strategy
            .check_and_withdraw(&portfolio, &engine, dec!(200000), now)
            .unwrap();
        assert!(first.is_some());

        // Next day: still inside the weekly window
        let second = strategy
            .check_and_withdraw(
                &portfolio,
                &engine,
                dec!(200000),
                now + Duration::days(1),
            )
            .unwrap();
        assert_eq!(second, None);

        // A week later the gate reopens
        let third = strategy
            .check_and_withdraw(
                &portfolio,
                &engine,
                dec!(200000),
                now + Duration::days(7),
            )
            .unwrap();
        assert!(third.is_some());
    }
}
