//! StableToStable scanner
//!
//! Round trips over the market's configured auxiliary pairs, restricted to
//! pairs where both legs are stable-value assets. All fee tier combinations
//! are tried for the outward and return legs, same tier included.

use async_trait::async_trait;
use tracing::debug;

use super::{RouteCandidate, ScanContext, ScanOutput, Scanner};
use crate::arbitrage::candidates::round_trips;
use crate::types::StrategyKind;

pub struct StableToStableScanner;

#[async_trait]
impl Scanner for StableToStableScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StableToStable
    }

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput {
        let mut out = ScanOutput::new(self.kind());
        let market = ctx.market;
        let Some(cfg) = market.stable_to_stable.as_ref() else {
            return out;
        };
        let venue = market.primary_venue();

        for pair in &cfg.pairs {
            let (Some(first), Some(second)) = (market.asset(&pair.first), market.asset(&pair.second)) else {
                continue;
            };
            if !(first.stable && second.stable) {
                debug!("{}: {}/{} is not a stable pair, skipping", market.id, pair.first, pair.second);
                continue;
            }

            for trip in round_trips(&pair.amounts, &market.fee_tiers, false) {
                let Some(outward) = ctx.hop(venue, first, second, trip.amount, trip.fee_out).await else {
                    continue;
                };
                let Some(back) = ctx.hop(venue, second, first, outward.amount_out, trip.fee_back).await else {
                    continue;
                };
                if let Some(candidate) = RouteCandidate::from_hops(vec![outward, back], false) {
                    ctx.assess(self.kind(), candidate, &mut out);
                }
            }
        }

        out
    }
}
