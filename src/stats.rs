//! Stats / Telemetry Aggregator
//!
//! A single aggregator task owns every cumulative counter and the bounded
//! trade / activity histories. Scanners, the orchestrator and the dispatcher
//! never touch that state directly: they send `StatsEvent`s over a channel,
//! and readers get consistent point-in-time snapshots published through a
//! `watch` channel after each applied event.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::types::{DispatchRecord, DispatchStatus, Opportunity, StrategyKind};

/// Per-strategy results of one orchestration pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyTally {
    /// Market scans run for this strategy
    pub scans: u64,
    pub evaluated: u64,
    pub positive_spreads: u64,
    pub negative_spreads: u64,
    pub opportunities: u64,
    pub best_spread_bps: Option<f64>,
    pub worst_spread_bps: Option<f64>,
}

impl StrategyTally {
    pub fn merge(&mut self, other: &StrategyTally) {
        self.scans += other.scans;
        self.evaluated += other.evaluated;
        self.positive_spreads += other.positive_spreads;
        self.negative_spreads += other.negative_spreads;
        self.opportunities += other.opportunities;
        self.best_spread_bps = max_opt(self.best_spread_bps, other.best_spread_bps);
        self.worst_spread_bps = min_opt(self.worst_spread_bps, other.worst_spread_bps);
    }
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// What the aggregator needs to know about a finished scan cycle
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub finished_at: DateTime<Utc>,
    pub per_strategy: BTreeMap<StrategyKind, StrategyTally>,
    /// Retained top-N window, already sorted
    pub top: Vec<Opportunity>,
}

/// Events consumed by the aggregator task
#[derive(Debug)]
pub enum StatsEvent {
    CycleCompleted(CycleSummary),
    Dispatched(DispatchRecord),
    Activity(String),
    /// Reply with the state after every earlier event has been applied
    Flush(oneshot::Sender<StatsSnapshot>),
}

/// Cumulative counters for one strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyStats {
    pub scans: u64,
    pub routes_evaluated: u64,
    pub opportunities: u64,
    pub dispatches: u64,
    pub successes: u64,
    pub failures: u64,
    pub net_profit_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Point-in-time view of all telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_scans: u64,
    /// Complete quote chains evaluated by any scanner
    pub opportunities_found: u64,
    /// Routes that cleared the minimum-profit test
    pub profitable_opportunities: u64,
    pub dispatch_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub gross_profit_usd: Decimal,
    pub total_cost_usd: Decimal,
    pub net_profit_usd: Decimal,
    pub positive_spreads: u64,
    pub negative_spreads: u64,
    pub best_spread_bps: Option<f64>,
    pub worst_spread_bps: Option<f64>,
    pub per_strategy: BTreeMap<StrategyKind, StrategyStats>,
    pub top_opportunities: Vec<Opportunity>,
    pub recent_trades: VecDeque<DispatchRecord>,
    pub activity: VecDeque<ActivityEntry>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    pub fn new() -> Self {
        Self {
            total_scans: 0,
            opportunities_found: 0,
            profitable_opportunities: 0,
            dispatch_attempts: 0,
            successes: 0,
            failures: 0,
            gross_profit_usd: Decimal::ZERO,
            total_cost_usd: Decimal::ZERO,
            net_profit_usd: Decimal::ZERO,
            positive_spreads: 0,
            negative_spreads: 0,
            best_spread_bps: None,
            worst_spread_bps: None,
            per_strategy: StrategyKind::ALL
                .iter()
                .map(|k| (*k, StrategyStats::default()))
                .collect(),
            top_opportunities: Vec::new(),
            recent_trades: VecDeque::new(),
            activity: VecDeque::new(),
            last_cycle_at: None,
            last_dispatch_at: None,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.dispatch_attempts > 0 {
            self.successes as f64 / self.dispatch_attempts as f64
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} scans | {} routes, {} profitable | {} dispatches ({} ok, {} failed) | Win rate: {:.1}% | Net: ${:.2}",
            self.total_scans,
            self.opportunities_found,
            self.profitable_opportunities,
            self.dispatch_attempts,
            self.successes,
            self.failures,
            self.win_rate() * 100.0,
            self.net_profit_usd
        )
    }
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// History bounds
#[derive(Debug, Clone, Copy)]
pub struct StatsLimits {
    pub trade_history: usize,
    pub activity_log: usize,
}

impl Default for StatsLimits {
    fn default() -> Self {
        Self { trade_history: 50, activity_log: 100 }
    }
}

/// Aggregator state and its update rules
#[derive(Debug, Clone)]
pub struct StatsBook {
    state: StatsSnapshot,
    limits: StatsLimits,
}

impl StatsBook {
    pub fn new(limits: StatsLimits) -> Self {
        Self { state: StatsSnapshot::new(), limits }
    }

    pub fn snapshot(&self) -> &StatsSnapshot {
        &self.state
    }

    /// Apply one event. `Flush` is handled by the task loop.
    pub fn apply(&mut self, event: StatsEvent) {
        match event {
            StatsEvent::CycleCompleted(summary) => self.record_cycle(summary),
            StatsEvent::Dispatched(record) => self.record_dispatch(record),
            StatsEvent::Activity(message) => self.push_activity(message),
            StatsEvent::Flush(reply) => {
                let _ = reply.send(self.state.clone());
            }
        }
    }

    fn record_cycle(&mut self, summary: CycleSummary) {
        let s = &mut self.state;
        s.total_scans += 1;
        s.last_cycle_at = Some(summary.finished_at);

        for (kind, tally) in &summary.per_strategy {
            s.opportunities_found += tally.evaluated;
            s.profitable_opportunities += tally.opportunities;
            s.positive_spreads += tally.positive_spreads;
            s.negative_spreads += tally.negative_spreads;
            s.best_spread_bps = max_opt(s.best_spread_bps, tally.best_spread_bps);
            s.worst_spread_bps = min_opt(s.worst_spread_bps, tally.worst_spread_bps);

            let per = s.per_strategy.entry(*kind).or_default();
            per.scans += tally.scans;
            per.routes_evaluated += tally.evaluated;
            per.opportunities += tally.opportunities;
        }

        s.top_opportunities = summary.top;
    }

    fn record_dispatch(&mut self, record: DispatchRecord) {
        let s = &mut self.state;
        s.dispatch_attempts += 1;
        s.last_dispatch_at = Some(record.created_at);

        let per = s.per_strategy.entry(record.strategy).or_default();
        per.dispatches += 1;

        match record.status {
            DispatchStatus::Succeeded => {
                s.successes += 1;
                s.gross_profit_usd += record.realized_profit_usd + record.realized_cost_usd;
                s.total_cost_usd += record.realized_cost_usd;
                s.net_profit_usd += record.realized_profit_usd;
                per.successes += 1;
                per.net_profit_usd += record.realized_profit_usd;
            }
            DispatchStatus::Failed => {
                // Cost is tracked; cumulative profit never goes backwards
                s.failures += 1;
                s.total_cost_usd += record.realized_cost_usd;
                per.failures += 1;
            }
        }

        let message = match record.status {
            DispatchStatus::Succeeded => format!(
                "✅ {} {} {} net ${:.4}",
                record.id, record.strategy, record.route, record.realized_profit_usd
            ),
            DispatchStatus::Failed => format!(
                "❌ {} {} {}: {}",
                record.id,
                record.strategy,
                record.route,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        };

        s.recent_trades.push_back(record);
        while s.recent_trades.len() > self.limits.trade_history {
            s.recent_trades.pop_front();
        }

        self.push_activity(message);
    }

    fn push_activity(&mut self, message: String) {
        let s = &mut self.state;
        s.activity.push_back(ActivityEntry { at: Utc::now(), message });
        while s.activity.len() > self.limits.activity_log {
            s.activity.pop_front();
        }
    }
}

/// Cloneable writer/reader handle to the aggregator task
#[derive(Debug, Clone)]
pub struct StatsHandle {
    tx: mpsc::UnboundedSender<StatsEvent>,
    snapshot: watch::Receiver<StatsSnapshot>,
}

impl StatsHandle {
    /// Spawn the aggregator task on the current runtime.
    pub fn spawn(limits: StatsLimits) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (publish, snapshot) = watch::channel(StatsSnapshot::new());
        let mut book = StatsBook::new(limits);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let publish_after = !matches!(event, StatsEvent::Flush(_));
                book.apply(event);
                if publish_after {
                    publish.send_replace(book.snapshot().clone());
                }
            }
            debug!("stats aggregator stopped");
        });

        Self { tx, snapshot }
    }

    pub fn record(&self, event: StatsEvent) {
        if self.tx.send(event).is_err() {
            debug!("stats aggregator gone, event dropped");
        }
    }

    pub fn activity(&self, message: impl Into<String>) {
        self.record(StatsEvent::Activity(message.into()));
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Snapshot including every event sent before this call
    pub async fn sync(&self) -> StatsSnapshot {
        let (reply, rx) = oneshot::channel();
        self.record(StatsEvent::Flush(reply));
        match rx.await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }
}
