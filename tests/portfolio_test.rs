//! Portfolio accounting and checkpoint tests

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use trade_gate::engine::{AccountCapabilities, RiskEngine, RiskLimits, RiskViolation};
use trade_gate::market::PriceMap;
use trade_gate::portfolio::Portfolio;

/// Equity must always equal initial cash + deposits - withdrawals
/// + realized P&L - commissions + unrealized P&L at the given prices.
fn assert_equity_identity(
    portfolio: &Portfolio,
    initial_cash: Decimal,
    net_deposits: Decimal,
    prices: &PriceMap,
) {
    let unrealized: Decimal = portfolio
        .snapshot_positions()
        .values()
        .filter_map(|p| prices.get(&p.symbol).map(|price| p.unrealized_pnl(*price)))
        .sum();
    let expected = initial_cash + net_deposits + portfolio.realized_pnl()
        - portfolio.commissions_paid()
        + unrealized;
    assert_eq!(portfolio.equity(prices), expected);
}

#[test]
fn test_equity_identity_through_fill_sequence() {
    let portfolio = Portfolio::new(dec!(100000));
    let now = Utc::now();

    // Build, extend, reduce, reverse, and close across two symbols
    portfolio
        .apply_fill("AAPL", dec!(100), dec!(100), dec!(1), now, dec!(1))
        .unwrap();
    portfolio
        .apply_fill("AAPL", dec!(100), dec!(110), dec!(1), now, dec!(1))
        .unwrap();
    // Blended basis 105; closing 200 realizes zero, the excess 50 reverses
    // into a short based at 105
    portfolio
        .apply_fill("AAPL", dec!(-250), dec!(105), dec!(1), now, dec!(1))
        .unwrap();
    portfolio
        .apply_fill("ES", dec!(2), dec!(5000), dec!(4), now, dec!(50))
        .unwrap();
    portfolio
        .apply_fill("ES", dec!(-2), dec!(5100), dec!(4), now, dec!(50))
        .unwrap();

    for marks in [
        PriceMap::from([("AAPL".to_string(), dec!(104))]),
        PriceMap::from([("AAPL".to_string(), dec!(95))]),
        PriceMap::new(),
    ] {
        // Missing prices drop the unrealized term on both sides
        let unrealized_known: Decimal = portfolio
            .snapshot_positions()
            .values()
            .filter_map(|p| marks.get(&p.symbol).map(|price| p.unrealized_pnl(*price)))
            .sum();
        let cash_only: Decimal = portfolio
            .snapshot_positions()
            .values()
            .filter(|p| !marks.contains_key(&p.symbol))
            .map(|p| -p.quantity * p.avg_price * p.multiplier)
            .sum();
        let expected = dec!(100000) + portfolio.realized_pnl() - portfolio.commissions_paid()
            + unrealized_known
            + cash_only;
        assert_eq!(portfolio.equity(&marks), expected);
    }
}

#[test]
fn test_equity_identity_with_cash_movements() {
    let portfolio = Portfolio::new(dec!(50000));
    let now = Utc::now();
    portfolio
        .apply_fill("MSFT", dec!(100), dec!(300), dec!(2), now, dec!(1))
        .unwrap();
    portfolio.deposit_cash(dec!(10000), now).unwrap();
    portfolio.withdraw_cash(dec!(4000), now).unwrap();

    let prices = PriceMap::from([("MSFT".to_string(), dec!(310))]);
    assert_equity_identity(&portfolio, dec!(50000), dec!(6000), &prices);
}

#[test]
fn test_withdraw_deposit_round_trip_is_noop() {
    let portfolio = Portfolio::new(dec!(20000));
    let now = Utc::now();
    portfolio
        .apply_fill("AAPL", dec!(50), dec!(100), dec!(0), now, dec!(1))
        .unwrap();

    let cash_before = portfolio.cash();
    let positions_before = portfolio.snapshot_positions();

    portfolio.withdraw_cash(dec!(3000), now).unwrap();
    portfolio.deposit_cash(dec!(3000), now).unwrap();

    assert_eq!(portfolio.cash(), cash_before);
    assert_eq!(portfolio.snapshot_positions(), positions_before);
}

#[test]
fn test_reversal_realizes_and_rebases() {
    let portfolio = Portfolio::new(dec!(100000));
    let now = Utc::now();
    portfolio
        .apply_fill("AAPL", dec!(100), dec!(100), dec!(0), now, dec!(1))
        .unwrap();
    // Sell 150 at 110: closes 100 for +1000, opens short 50 at 110
    let realized = portfolio
        .apply_fill("AAPL", dec!(-150), dec!(110), dec!(0), now, dec!(1))
        .unwrap();
    assert_eq!(realized, dec!(1000));

    let position = portfolio.position("AAPL").unwrap();
    assert_eq!(position.quantity, dec!(-50));
    assert_eq!(position.avg_price, dec!(110));
}

#[test]
fn test_checkpoint_restore_reproduces_decisions() {
    let portfolio = Arc::new(Portfolio::new(dec!(100000)));
    let now = Utc::now();
    let limits = RiskLimits {
        max_drawdown_pct: dec!(0.08),
        max_daily_loss_pct: dec!(0.5),
        ..RiskLimits::default()
    };
    let engine = RiskEngine::new(
        limits.clone(),
        AccountCapabilities::default(),
        vec![],
        Arc::clone(&portfolio),
        dec!(100000),
        now,
    )
    .unwrap();

    portfolio
        .apply_fill("AAPL", dec!(500), dec!(100), dec!(0), now, dec!(1))
        .unwrap();
    let prices = PriceMap::from([("AAPL".to_string(), dec!(80))]);
    let equity = portfolio.equity(&prices);
    let live = engine.check_pre_trade("SPY", dec!(1), dec!(80), equity, &prices, now);
    assert!(matches!(live, Err(RiskViolation::DrawdownHalt { .. })));

    // Round-trip both sides through JSON
    let portfolio_json = serde_json::to_string(&portfolio.snapshot()).unwrap();
    let state_json = serde_json::to_string(&engine.snapshot_state()).unwrap();

    let restored_portfolio =
        Arc::new(Portfolio::restore(serde_json::from_str(&portfolio_json).unwrap()));
    let restored = RiskEngine::restore(
        limits,
        AccountCapabilities::default(),
        vec![],
        Arc::clone(&restored_portfolio),
        serde_json::from_str(&state_json).unwrap(),
    )
    .unwrap();

    assert!(restored.is_halted());
    // Entries stay blocked, flattening stays allowed, as before the restart
    let entry = restored.check_pre_trade("SPY", dec!(1), dec!(80), equity, &prices, now);
    assert!(matches!(entry, Err(RiskViolation::Halted { .. })));
    let flatten = restored.check_pre_trade("AAPL", dec!(-100), dec!(80), equity, &prices, now);
    assert!(flatten.is_ok());
}
