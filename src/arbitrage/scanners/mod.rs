//! Strategy Scanners
//!
//! Every scanner walks its candidate space for one market, quotes each hop
//! through the deadline-bounded quoter and hands complete quote chains to
//! `ScanContext::assess`, which applies the profit model and keeps only
//! opportunities that clear the minimum-profit test. A missing quote skips
//! that one combination and nothing else.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

pub mod credit_line;
pub mod cross_venue;
pub mod intra_venue;
pub mod stable_to_stable;
pub mod triangular;

use alloy::primitives::U256;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::arbitrage::costs::CostModel;
use crate::arbitrage::profit::{self, Valuation};
use crate::arbitrage::quoter::{DeadlineQuoter, QuoteRequest};
use crate::config::{Asset, MarketConfig, Venue};
use crate::types::{Hop, Opportunity, StrategyKind};

pub use credit_line::CreditLineScanner;
pub use cross_venue::CrossVenueScanner;
pub use intra_venue::IntraVenueScanner;
pub use stable_to_stable::StableToStableScanner;
pub use triangular::TriangularScanner;

/// One strategy's search over a market
#[async_trait]
pub trait Scanner: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn scan(&self, ctx: &ScanContext<'_>) -> ScanOutput;
}

/// All five scanners, in `StrategyKind::ALL` order
pub fn all_scanners() -> Vec<Arc<dyn Scanner>> {
    vec![
        Arc::new(IntraVenueScanner),
        Arc::new(CrossVenueScanner),
        Arc::new(TriangularScanner),
        Arc::new(StableToStableScanner),
        Arc::new(CreditLineScanner),
    ]
}

/// What a scanner produced for one market
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub strategy: StrategyKind,
    pub opportunities: Vec<Opportunity>,
    /// Complete quote chains evaluated
    pub evaluated: usize,
    pub positive_spreads: usize,
    pub negative_spreads: usize,
    pub best_spread_bps: Option<f64>,
    pub worst_spread_bps: Option<f64>,
}

impl ScanOutput {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            opportunities: Vec::new(),
            evaluated: 0,
            positive_spreads: 0,
            negative_spreads: 0,
            best_spread_bps: None,
            worst_spread_bps: None,
        }
    }

    fn tally(&mut self, gross_profit: i128, spread_bps: f64) {
        self.evaluated += 1;
        if gross_profit > 0 {
            self.positive_spreads += 1;
        } else if gross_profit < 0 {
            self.negative_spreads += 1;
        }
        self.best_spread_bps = Some(self.best_spread_bps.map_or(spread_bps, |b| b.max(spread_bps)));
        self.worst_spread_bps = Some(self.worst_spread_bps.map_or(spread_bps, |w| w.min(spread_bps)));
    }
}

/// Read-only inputs shared by every scanner during one cycle
pub struct ScanContext<'a> {
    pub market: &'a MarketConfig,
    pub quoter: &'a DeadlineQuoter,
    pub costs: &'a dyn CostModel,
    /// USD price of the market's base asset for this cycle
    pub native_usd: Decimal,
    pub min_profit_usd: Decimal,
}

impl<'a> ScanContext<'a> {
    /// USD valuation of an asset: base asset at the cycle's native price,
    /// stables at their configured price or 1, others only if priced.
    pub fn valuation(&self, symbol: &str) -> Option<Valuation> {
        let asset = self.market.asset(symbol)?;
        let price = if symbol == self.market.base_asset {
            self.native_usd
        } else if let Some(price) = asset.usd_price {
            price
        } else if asset.stable {
            Decimal::ONE
        } else {
            return None;
        };
        Some(Valuation::new(asset.decimals, price))
    }

    /// Quote one hop. `None` when the quote is unavailable for any reason.
    pub async fn hop(
        &self,
        venue: &Venue,
        asset_in: &Asset,
        asset_out: &Asset,
        amount_in: U256,
        fee_tier: u32,
    ) -> Option<Hop> {
        let request = QuoteRequest {
            market: &self.market.id,
            venue: &venue.name,
            asset_in,
            asset_out,
            amount_in,
            fee_tier,
        };
        let amount_out = self.quoter.quote(request).await.ok()?;
        Some(Hop {
            venue: venue.name.clone(),
            asset_in: asset_in.symbol.clone(),
            asset_out: asset_out.symbol.clone(),
            fee_tier,
            amount_in,
            amount_out,
        })
    }

    /// Run a complete quote chain through the profit model. The route is
    /// recorded in `out` when it clears the minimum-profit test.
    pub fn assess(&self, strategy: StrategyKind, candidate: RouteCandidate, out: &mut ScanOutput) {
        let Some(valuation) = self.valuation(&candidate.profit_asset) else {
            debug!(
                "{} {}: no USD valuation for {}, skipping",
                self.market.id, strategy, candidate.profit_asset
            );
            return;
        };

        let cost_usd = self.costs.estimate_usd(strategy, candidate.hops.len(), self.native_usd);
        let cost_raw = valuation.from_usd_ceil(cost_usd);
        let threshold_raw = valuation.from_usd_ceil(self.min_profit_usd);

        let verdict = profit::evaluate(candidate.amount_in, candidate.amount_out, cost_raw, threshold_raw);
        let spread_bps = profit::spread_bps(verdict.gross_profit, candidate.amount_in);
        out.tally(verdict.gross_profit, spread_bps);

        if !verdict.is_profitable {
            return;
        }

        let gross_profit_usd = valuation.to_usd(verdict.gross_profit);
        let estimated_cost_usd = valuation.to_usd(cost_raw);
        let net_profit_usd = gross_profit_usd - estimated_cost_usd;

        info!(
            "🎯 {} OPPORTUNITY [{}]: {} | net ${:.4} (gross ${:.4}, cost ${:.4}, {:.2} bps)",
            strategy.as_str().to_uppercase(),
            self.market.id,
            candidate.route,
            net_profit_usd,
            gross_profit_usd,
            estimated_cost_usd,
            spread_bps
        );

        out.opportunities.push(Opportunity {
            market: self.market.id.clone(),
            strategy,
            route: candidate.route,
            profit_asset: candidate.profit_asset,
            amount_in: candidate.amount_in,
            amount_out: candidate.amount_out,
            hops: candidate.hops,
            gross_profit_raw: verdict.gross_profit,
            estimated_cost_raw: cost_raw,
            net_profit_raw: verdict.net_profit,
            gross_profit_usd,
            estimated_cost_usd,
            net_profit_usd,
            spread_bps,
            is_profitable: verdict.is_profitable,
            found_at: Utc::now(),
        });
    }
}

/// A fully quoted route awaiting evaluation
#[derive(Debug, Clone)]
pub struct RouteCandidate {
    pub profit_asset: String,
    pub amount_in: U256,
    /// Amount returned to the profit asset, after any borrowing fee
    pub amount_out: U256,
    pub hops: Vec<Hop>,
    pub route: String,
}

impl RouteCandidate {
    /// Round trip whose output is the last hop's output
    pub fn from_hops(hops: Vec<Hop>, with_venues: bool) -> Option<Self> {
        let first = hops.first()?;
        let last = hops.last()?;
        Some(Self {
            profit_asset: first.asset_in.clone(),
            amount_in: first.amount_in,
            amount_out: last.amount_out,
            route: describe_route(&hops, with_venues),
            hops,
        })
    }
}

/// "WETH -0.05%-> USDC -0.3%-> WETH", optionally naming venues per hop
pub fn describe_route(hops: &[Hop], with_venues: bool) -> String {
    let Some(first) = hops.first() else {
        return String::new();
    };
    let mut route = first.asset_in.clone();
    for hop in hops {
        let fee = Hop::fee_label(hop.fee_tier);
        if with_venues {
            route.push_str(&format!(" -{} {}-> {}", hop.venue, fee, hop.asset_out));
        } else {
            route.push_str(&format!(" -{}-> {}", fee, hop.asset_out));
        }
    }
    route
}
