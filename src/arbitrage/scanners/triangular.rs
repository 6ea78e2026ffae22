//! Triangular scanner
//!
//! Three-hop loops base -> B -> C -> base on the primary venue. The loop
//! catalogue only contains intermediates the market defines, and the fee
//! tier cross product is capped per loop and amount.

use async_trait::async_trait;

use super::{RouteCandidate, ScanContext, ScanOutput, Scanner};
use crate::arbitrage::candidates::{fee_triplets, triangle_loops};
use crate::types::StrategyKind;

pub struct TriangularScanner;

#[async_trait]
impl Scanner for TriangularScanner {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Triangular
    }

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput {
        let mut out = ScanOutput::new(self.kind());
        let market = ctx.market;
        let Some(cfg) = market.triangular.as_ref() else {
            return out;
        };
        let venue = market.primary_venue();

        for tri in triangle_loops(market) {
            let (Some(a), Some(b), Some(c)) = (
                market.asset(&tri.start),
                market.asset(&tri.second),
                market.asset(&tri.third),
            ) else {
                continue;
            };

            for &amount in &cfg.amounts {
                for [f1, f2, f3] in fee_triplets(&cfg.fee_tiers, cfg.max_fee_combos) {
                    let Some(h1) = ctx.hop(venue, a, b, amount, f1).await else {
                        continue;
                    };
                    let Some(h2) = ctx.hop(venue, b, c, h1.amount_out, f2).await else {
                        continue;
                    };
                    let Some(h3) = ctx.hop(venue, c, a, h2.amount_out, f3).await else {
                        continue;
                    };
                    if let Some(candidate) = RouteCandidate::from_hops(vec![h1, h2, h3], false) {
                        ctx.assess(self.kind(), candidate, &mut out);
                    }
                }
            }
        }

        out
    }
}
