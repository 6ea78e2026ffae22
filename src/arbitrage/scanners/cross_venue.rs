//! CrossVenue scanner
//!
//! For every alternate venue, amount and fee tier: quote the forward leg on
//! both the primary and the alternate venue, take the better one, and
//! return on the other venue. Runs in both asset directions: base first
//! (using `amounts`) and quote first (using `quote_amounts`).

use alloy::primitives::U256;
use async_trait::async_trait;

use super::{RouteCandidate, ScanContext, ScanOutput, Scanner};
use crate::arbitrage::candidates::amount_tiers;
use crate::config::{Asset, Venue};
use crate::types::StrategyKind;

pub struct CrossVenueScanner;

impl CrossVenueScanner {
    async fn try_pair(
        &self,
        ctx: &ScanContext<'_>,
        venues: (&Venue, &Venue),
        assets: (&Asset, &Asset),
        amount: U256,
        fee: u32,
        out: &mut ScanOutput,
    ) {
        let (primary, alternate) = venues;
        let (from, to) = assets;

        let (on_primary, on_alternate) = tokio::join!(
            ctx.hop(primary, from, to, amount, fee),
            ctx.hop(alternate, from, to, amount, fee),
        );

        // Higher output means the cheaper forward leg
        let (forward, return_venue) = match (on_primary, on_alternate) {
            (Some(p), Some(a)) if a.amount_out > p.amount_out => (a, primary),
            (Some(p), _) => (p, alternate),
            (None, Some(a)) => (a, primary),
            (None, None) => return,
        };

        let Some(back) = ctx.hop(return_venue, to, from, forward.amount_out, fee).await else {
            return;
        };

        if let Some(candidate) = RouteCandidate::from_hops(vec![forward, back], true) {
            ctx.assess(self.kind(), candidate, out);
        }
    }
}

#[async_trait]
impl Scanner for CrossVenueScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CrossVenue
    }

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput {
        let mut out = ScanOutput::new(self.kind());
        let market = ctx.market;
        let Some(cfg) = market.cross_venue.as_ref() else {
            return out;
        };
        if market.alternate_venues().is_empty() {
            return out;
        }

        let primary = market.primary_venue();
        let base = market.base();
        let quote = market.quote();

        for alternate in market.alternate_venues() {
            for (amount, fee) in amount_tiers(&cfg.amounts, &market.fee_tiers) {
                self.try_pair(ctx, (primary, alternate), (base, quote), amount, fee, &mut out)
                    .await;
            }
            for (amount, fee) in amount_tiers(&cfg.quote_amounts, &market.fee_tiers) {
                self.try_pair(ctx, (primary, alternate), (quote, base), amount, fee, &mut out)
                    .await;
            }
        }

        out
    }
}
