//! IntraVenue scanner
//!
//! Round trip base -> quote -> base on the primary venue, leaving through one
//! fee tier and returning through a different one. Every clearing
//! (tier_out, tier_back) pair is emitted; ranking happens later.

use async_trait::async_trait;

use super::{RouteCandidate, ScanContext, ScanOutput, Scanner};
use crate::arbitrage::candidates::round_trips;
use crate::types::StrategyKind;

pub struct IntraVenueScanner;

#[async_trait]
impl Scanner for IntraVenueScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IntraVenue
    }

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput {
        let mut out = ScanOutput::new(self.kind());
        let market = ctx.market;
        let venue = market.primary_venue();
        let base = market.base();
        let quote = market.quote();

        for trip in round_trips(&market.amounts, &market.fee_tiers, true) {
            let Some(outward) = ctx.hop(venue, base, quote, trip.amount, trip.fee_out).await else {
                continue;
            };
            let Some(back) = ctx.hop(venue, quote, base, outward.amount_out, trip.fee_back).await else {
                continue;
            };
            if let Some(candidate) = RouteCandidate::from_hops(vec![outward, back], false) {
                ctx.assess(self.kind(), candidate, &mut out);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::arbitrage::quoter::tests::{MockQuoteSource, Scripted};
    use alloy::primitives::U256;

    fn scripted_market(return_leg: u64) -> MockQuoteSource {
        let mock = MockQuoteSource::new();
        mock.script("uni", "USDC", "USDT", 100, 1_000_000, Scripted::Amount(U256::from(1_002_000u64)));
        mock.script("uni", "USDT", "USDC", 500, 1_002_000, Scripted::Amount(U256::from(return_leg)));
        mock
    }

    #[tokio::test]
    async fn test_profitable_round_trip_is_emitted() {
        let market = stable_market();
        let quoter = quoter(scripted_market(1_001_500));
        let costs = scenario_costs();
        let ctx = context(&market, &quoter, &costs);

        let out = IntraVenueScanner.scan(&ctx).await;

        assert_eq!(out.opportunities.len(), 1);
        let opp = &out.opportunities[0];
        assert_eq!(opp.strategy, StrategyKind::IntraVenue);
        assert_eq!(opp.gross_profit_raw, 1500);
        assert_eq!(opp.estimated_cost_raw, 100);
        assert_eq!(opp.net_profit_raw, 1400);
        assert!(opp.is_profitable);
        assert_eq!(opp.route, "USDC -0.01%-> USDT -0.05%-> USDC");
        assert_eq!(opp.hops.len(), 2);
        // the (500, 100) direction has no liquidity and is skipped
        assert_eq!(out.evaluated, 1);
    }

    #[tokio::test]
    async fn test_losing_return_leg_emits_nothing() {
        let market = stable_market();
        let quoter = quoter(scripted_market(999_000));
        let costs = scenario_costs();
        let ctx = context(&market, &quoter, &costs);

        let out = IntraVenueScanner.scan(&ctx).await;

        assert!(out.opportunities.is_empty());
        assert_eq!(out.evaluated, 1);
        assert_eq!(out.negative_spreads, 1);
    }

    #[tokio::test]
    async fn test_zero_spread_market_emits_nothing() {
        let market = stable_market();
        let quoter = quoter(MockQuoteSource::with_fallback_bps(10_000));
        let costs = scenario_costs();
        let ctx = context(&market, &quoter, &costs);

        let out = IntraVenueScanner.scan(&ctx).await;

        assert!(out.opportunities.is_empty());
        // two distinct tier pairs, both fully quoted
        assert_eq!(out.evaluated, 2);
        assert_eq!(out.positive_spreads, 0);
    }
}
