//! Scan Orchestrator
//!
//! One pass over every reachable market: connectivity check, native price
//! discovery, then every enabled scanner for every market concurrently.
//! Results are concatenated, ranked by net USD profit and truncated to the
//! top-N window; the full counts still go to the stats aggregator.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::costs::CostModel;
use super::profit::Valuation;
use super::quoter::{DeadlineQuoter, QuoteRequest};
use super::scanners::{ScanContext, ScanOutput, Scanner};
use crate::config::MarketConfig;
use crate::stats::{CycleSummary, StatsEvent, StatsHandle, StrategyTally};
use crate::types::{Opportunity, StrategyKind};

/// Where a market's native price came from this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Quoted,
    Fallback,
}

/// Connectivity flag and pricing state of one market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketHealth {
    pub reachable: bool,
    pub last_checked: DateTime<Utc>,
    pub last_error: Option<String>,
    pub native_usd: Decimal,
    pub price_source: PriceSource,
}

/// Ranked output of one orchestration pass
#[derive(Debug, Clone, Serialize)]
pub struct ScanCycleResult {
    pub cycle: u64,
    /// Top-N window, descending by net profit
    pub opportunities: Vec<Opportunity>,
    /// Opportunities found before truncation
    pub total_found: usize,
    pub per_strategy: BTreeMap<StrategyKind, StrategyTally>,
    pub markets_scanned: usize,
    pub markets_unreachable: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScanCycleResult {
    pub fn best(&self) -> Option<&Opportunity> {
        self.opportunities.first()
    }
}

/// Sort descending by net USD profit and keep at most `top_n`.
pub fn rank(mut opportunities: Vec<Opportunity>, top_n: usize) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| b.net_profit_usd.cmp(&a.net_profit_usd));
    opportunities.truncate(top_n);
    opportunities
}

pub struct ScanOrchestrator {
    markets: Vec<Arc<MarketConfig>>,
    scanners: Vec<Arc<dyn Scanner>>,
    quoter: DeadlineQuoter,
    costs: Arc<dyn CostModel>,
    min_profit_usd: Decimal,
    top_n: usize,
    health: DashMap<String, MarketHealth>,
    stats: StatsHandle,
    cycles: AtomicU64,
}

impl ScanOrchestrator {
    pub fn new(
        markets: Vec<MarketConfig>,
        scanners: Vec<Arc<dyn Scanner>>,
        quoter: DeadlineQuoter,
        costs: Arc<dyn CostModel>,
        min_profit_usd: Decimal,
        top_n: usize,
        stats: StatsHandle,
    ) -> Self {
        Self {
            markets: markets.into_iter().map(Arc::new).collect(),
            scanners,
            quoter,
            costs,
            min_profit_usd,
            top_n,
            health: DashMap::new(),
            stats,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn markets(&self) -> &[Arc<MarketConfig>] {
        &self.markets
    }

    /// Connectivity flags, keyed by market id
    pub fn market_health(&self) -> BTreeMap<String, MarketHealth> {
        self.health
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Run every enabled scanner over every reachable market once.
    pub async fn run_cycle(&self, enabled: &[StrategyKind]) -> ScanCycleResult {
        let started = Instant::now();
        let started_at = Utc::now();
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        // Connectivity and pricing per market, concurrently
        let checks = join_all(self.markets.iter().map(|m| self.prepare_market(m))).await;

        let mut contexts = Vec::new();
        let mut unreachable = Vec::new();
        for (market, native_usd) in self.markets.iter().zip(checks) {
            match native_usd {
                Some(native_usd) => contexts.push(ScanContext {
                    market: market.as_ref(),
                    quoter: &self.quoter,
                    costs: self.costs.as_ref(),
                    native_usd,
                    min_profit_usd: self.min_profit_usd,
                }),
                None => unreachable.push(market.id.clone()),
            }
        }

        // Every (market, enabled scanner) pair runs concurrently
        let scans = contexts.iter().flat_map(|ctx| {
            self.scanners
                .iter()
                .filter(move |s| enabled.contains(&s.kind()) && ctx.market.supports(s.kind()))
                .map(move |s| s.scan(ctx))
        });
        let outputs: Vec<ScanOutput> = join_all(scans).await;

        let mut per_strategy: BTreeMap<StrategyKind, StrategyTally> = BTreeMap::new();
        let mut found = Vec::new();
        for output in outputs {
            let tally = per_strategy.entry(output.strategy).or_default();
            tally.merge(&StrategyTally {
                scans: 1,
                evaluated: output.evaluated as u64,
                positive_spreads: output.positive_spreads as u64,
                negative_spreads: output.negative_spreads as u64,
                opportunities: output.opportunities.len() as u64,
                best_spread_bps: output.best_spread_bps,
                worst_spread_bps: output.worst_spread_bps,
            });
            found.extend(output.opportunities);
        }

        let total_found = found.len();
        let opportunities = rank(found, self.top_n);
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(best) = opportunities.first() {
            info!(
                "Cycle #{}: {} opportunities in {}ms, best {} {} net ${:.4}",
                cycle, total_found, duration_ms, best.strategy, best.route, best.net_profit_usd
            );
        } else {
            debug!("Cycle #{}: no opportunities ({}ms)", cycle, duration_ms);
        }

        self.stats.record(StatsEvent::CycleCompleted(CycleSummary {
            finished_at: Utc::now(),
            per_strategy: per_strategy.clone(),
            top: opportunities.clone(),
        }));

        ScanCycleResult {
            cycle,
            opportunities,
            total_found,
            per_strategy,
            markets_scanned: contexts.len(),
            markets_unreachable: unreachable,
            started_at,
            duration_ms,
        }
    }

    /// Connectivity check plus native price. `None` when unreachable.
    async fn prepare_market(&self, market: &MarketConfig) -> Option<Decimal> {
        let previous = self.health.get(&market.id).map(|h| h.reachable);

        if let Err(e) = self.quoter.check_connectivity(&market.id).await {
            if previous != Some(false) {
                warn!("⚠️  {}", e);
                self.stats.activity(format!("market {} disconnected: {}", market.id, e));
            }
            self.health.insert(
                market.id.clone(),
                MarketHealth {
                    reachable: false,
                    last_checked: Utc::now(),
                    last_error: Some(e.to_string()),
                    native_usd: market.native_usd_fallback,
                    price_source: PriceSource::Fallback,
                },
            );
            return None;
        }

        if previous == Some(false) {
            info!("Market {} reconnected", market.id);
            self.stats.activity(format!("market {} reconnected", market.id));
        }

        let (native_usd, price_source) = match self.discover_native_price(market).await {
            Some(price) => (price, PriceSource::Quoted),
            None => (market.native_usd_fallback, PriceSource::Fallback),
        };

        self.health.insert(
            market.id.clone(),
            MarketHealth {
                reachable: true,
                last_checked: Utc::now(),
                last_error: None,
                native_usd,
                price_source,
            },
        );
        Some(native_usd)
    }

    /// Quote one whole base token into the quote asset and value the result.
    async fn discover_native_price(&self, market: &MarketConfig) -> Option<Decimal> {
        let base = market.base();
        let quote = market.quote();
        let quote_usd = match (quote.usd_price, quote.stable) {
            (Some(price), _) => price,
            (None, true) => Decimal::ONE,
            (None, false) => return None,
        };

        let one_unit = U256::from(10u64).pow(U256::from(base.decimals));
        let request = QuoteRequest {
            market: &market.id,
            venue: &market.primary_venue().name,
            asset_in: base,
            asset_out: quote,
            amount_in: one_unit,
            fee_tier: market.price_fee_tier,
        };
        let amount_out = self.quoter.quote(request).await.ok()?;
        let price = Valuation::new(quote.decimals, quote_usd)
            .whole_units(amount_out)
            .checked_mul(quote_usd)?;
        debug!("{} native price: ${:.2}", market.id, price);
        (!price.is_zero()).then_some(price)
    }
}
