//! CreditLine (flash-loan style) scanner
//!
//! Borrows the base asset, round trips it through the quote asset over a
//! curated list of fee pairs, and repays the loan plus a fee proportional to
//! the borrowed amount. Profitability is judged on what remains.

use alloy::primitives::U256;
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{describe_route, RouteCandidate, ScanContext, ScanOutput, Scanner};
use crate::arbitrage::candidates::curated_round_trips;
use crate::arbitrage::profit::Valuation;
use crate::config::Asset;
use crate::types::Hop;
use crate::types::StrategyKind;

pub struct CreditLineScanner;

/// Borrowing fee, rounded up
pub fn borrow_fee(amount: U256, fee_bps: u32) -> U256 {
    let numerator = amount * U256::from(fee_bps);
    let denominator = U256::from(10_000u64);
    (numerator + denominator - U256::from(1u64)) / denominator
}

/// "flash(10 USDC) USDC -0.01%-> USDT -0.05%-> USDC (fee 0.05%)"
pub fn describe_flash_route(borrowed: U256, asset: &Asset, fee_bps: u32, hops: &[Hop]) -> String {
    let whole = Valuation::stable(asset.decimals).whole_units(borrowed).normalize();
    let fee_pct = Decimal::new(i64::from(fee_bps), 2).normalize();
    format!(
        "flash({} {}) {} (fee {}%)",
        whole,
        asset.symbol,
        describe_route(hops, false),
        fee_pct
    )
}

#[async_trait]
impl Scanner for CreditLineScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CreditLine
    }

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput {
        let mut out = ScanOutput::new(self.kind());
        let market = ctx.market;
        let Some(cfg) = market.credit_line.as_ref() else {
            return out;
        };
        let venue = market.primary_venue();
        let base = market.base();
        let quote = market.quote();

        for trip in curated_round_trips(&cfg.amounts, &cfg.fee_pairs) {
            let Some(outward) = ctx.hop(venue, base, quote, trip.amount, trip.fee_out).await else {
                continue;
            };
            let Some(back) = ctx.hop(venue, quote, base, outward.amount_out, trip.fee_back).await else {
                continue;
            };

            let fee = borrow_fee(trip.amount, cfg.fee_bps);
            let hops = vec![outward, back];
            let route = describe_flash_route(trip.amount, base, cfg.fee_bps, &hops);
            let candidate = RouteCandidate {
                profit_asset: base.symbol.clone(),
                amount_in: trip.amount,
                amount_out: hops[1].amount_out.saturating_sub(fee),
                hops,
                route,
            };
            ctx.assess(self.kind(), candidate, &mut out);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::arbitrage::quoter::tests::{MockQuoteSource, Scripted};

    #[test]
    fn test_borrow_fee_rounds_up() {
        assert_eq!(borrow_fee(U256::from(10_000_000u64), 5), U256::from(5_000u64));
        assert_eq!(borrow_fee(U256::from(1_001u64), 5), U256::from(1u64));
        assert_eq!(borrow_fee(U256::from(1_000u64), 0), U256::ZERO);
    }

    #[test]
    fn test_flash_route_uses_whole_units() {
        let market = stable_market();
        let hop = Hop {
            venue: "uni".to_string(),
            asset_in: "USDC".to_string(),
            asset_out: "DAI".to_string(),
            fee_tier: 100,
            amount_in: U256::from(2_500_000u64),
            amount_out: U256::from(2_500_100u64),
        };
        let route = describe_flash_route(U256::from(2_500_000u64), market.base(), 9, &[hop]);
        assert_eq!(route, "flash(2.5 USDC) USDC -0.01%-> DAI (fee 0.09%)");
    }

    #[tokio::test]
    async fn test_fee_is_deducted_before_evaluation() {
        let market = stable_market();
        let mock = MockQuoteSource::new();
        // gross round trip +6000, minus 5000 borrowing fee
        mock.script("uni", "USDC", "USDT", 100, 10_000_000, Scripted::Amount(U256::from(10_010_000u64)));
        mock.script("uni", "USDT", "USDC", 500, 10_010_000, Scripted::Amount(U256::from(10_006_000u64)));
        let quoter = quoter(mock);
        let costs = scenario_costs();
        let ctx = context(&market, &quoter, &costs);

        let out = CreditLineScanner.scan(&ctx).await;

        assert_eq!(out.opportunities.len(), 1);
        let opp = &out.opportunities[0];
        assert_eq!(opp.gross_profit_raw, 1000);
        assert_eq!(opp.net_profit_raw, 900);
        assert_eq!(opp.amount_out, U256::from(10_001_000u64));
        assert_eq!(opp.route, "flash(10 USDC) USDC -0.01%-> USDT -0.05%-> USDC (fee 0.05%)");
    }

    #[tokio::test]
    async fn test_fee_can_erase_the_spread() {
        let market = stable_market();
        let mock = MockQuoteSource::new();
        mock.script("uni", "USDC", "USDT", 100, 10_000_000, Scripted::Amount(U256::from(10_010_000u64)));
        mock.script("uni", "USDT", "USDC", 500, 10_010_000, Scripted::Amount(U256::from(10_004_000u64)));
        let quoter = quoter(mock);
        let costs = scenario_costs();
        let ctx = context(&market, &quoter, &costs);

        let out = CreditLineScanner.scan(&ctx).await;

        assert!(out.opportunities.is_empty());
        assert_eq!(out.negative_spreads, 1);
    }
}
