//! Opportunity Selector & Execution Dispatcher
//!
//! Looks only at the head of a ranked scan cycle. The best opportunity is
//! dispatched when the cooldown has elapsed, its net profit meets the
//! minimum, and the engine is live; otherwise the cycle ends as `Skipped`
//! without a record. Every attempt, successful or not, yields exactly one
//! `DispatchRecord` which is forwarded to the stats aggregator.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::cooldown::DispatchCooldown;
use super::orchestrator::ScanCycleResult;
use crate::error::EngineError;
use crate::stats::{StatsEvent, StatsHandle};
use crate::types::{DispatchRecord, DispatchStatus, Opportunity};

/// What an execution backend reports back for one attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// Transaction hash or bundle id
    pub reference: Option<String>,
    /// Actual execution cost. The estimate is used when absent.
    pub cost_usd: Option<Decimal>,
    /// Realized gross profit. The quoted gross profit is used when absent.
    pub profit_usd: Option<Decimal>,
    pub error: Option<String>,
}

/// External execution backend
#[async_trait]
pub trait ExecutionMechanism: Send + Sync {
    async fn execute(&self, opportunity: &Opportunity) -> Result<ExecutionOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Idle,
    Evaluating,
    Dispatching,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    CooldownActive { remaining_ms: u64 },
    BelowThreshold { net_profit_usd: Decimal, min_profit_usd: Decimal },
    DryRun,
}

/// Result of one selection pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum DispatchDecision {
    /// Nothing to consider
    Idle,
    Skipped(SkipReason),
    Dispatched(DispatchRecord),
}

impl DispatchDecision {
    pub fn record(&self) -> Option<&DispatchRecord> {
        match self {
            DispatchDecision::Dispatched(record) => Some(record),
            _ => None,
        }
    }
}

pub struct Dispatcher {
    executor: Option<Arc<dyn ExecutionMechanism>>,
    cooldown: DispatchCooldown,
    min_profit_usd: Decimal,
    stats: StatsHandle,
    state: DispatchState,
    sequence: u64,
}

impl Dispatcher {
    pub fn new(
        executor: Option<Arc<dyn ExecutionMechanism>>,
        cooldown: DispatchCooldown,
        min_profit_usd: Decimal,
        stats: StatsHandle,
    ) -> Self {
        Self {
            executor,
            cooldown,
            min_profit_usd,
            stats,
            state: DispatchState::Idle,
            sequence: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn has_executor(&self) -> bool {
        self.executor.is_some()
    }

    /// Clear cooldown history (engine restart).
    pub fn reset(&mut self) {
        self.cooldown.reset();
        self.state = DispatchState::Idle;
    }

    /// Consider the head of a ranked cycle.
    pub async fn dispatch_best(&mut self, result: &ScanCycleResult, dry_run: bool) -> DispatchDecision {
        self.dispatch(result.best(), dry_run, Instant::now()).await
    }

    /// Gate and, when allowed, execute one opportunity.
    pub async fn dispatch(
        &mut self,
        opportunity: Option<&Opportunity>,
        dry_run: bool,
        now: Instant,
    ) -> DispatchDecision {
        self.state = DispatchState::Evaluating;

        let Some(opp) = opportunity else {
            self.state = DispatchState::Idle;
            return DispatchDecision::Idle;
        };

        if let Some(reason) = self.gate(opp, dry_run, now) {
            debug!("Dispatch skipped for {}: {:?}", opp.route, reason);
            self.state = DispatchState::Skipped;
            let decision = DispatchDecision::Skipped(reason);
            self.state = DispatchState::Idle;
            return decision;
        }

        // gate() returns DryRun when no executor is configured
        let Some(executor) = self.executor.clone() else {
            self.state = DispatchState::Idle;
            return DispatchDecision::Skipped(SkipReason::DryRun);
        };

        self.state = DispatchState::Dispatching;
        info!(
            "🚀 Dispatching {} [{}]: {} | expected net ${:.4}",
            opp.strategy, opp.market, opp.route, opp.net_profit_usd
        );

        let started = Instant::now();
        let outcome = executor.execute(opp).await;
        let elapsed = started.elapsed();
        let finished = now + elapsed;

        let record = self.build_record(opp, outcome, elapsed.as_millis() as u64);
        match record.status {
            DispatchStatus::Succeeded => {
                info!(
                    "✅ {} succeeded: net ${:.4} (cost ${:.4}) in {}ms",
                    record.id, record.realized_profit_usd, record.realized_cost_usd, record.execution_time_ms
                );
                self.cooldown.record_success(finished);
            }
            DispatchStatus::Failed => {
                error!(
                    "❌ {} failed: {}",
                    record.id,
                    record.error.as_deref().unwrap_or("unknown error")
                );
                self.cooldown.record_failure(finished);
            }
        }

        self.stats.record(StatsEvent::Dispatched(record.clone()));
        self.state = DispatchState::Idle;
        DispatchDecision::Dispatched(record)
    }

    fn gate(&self, opp: &Opportunity, dry_run: bool, now: Instant) -> Option<SkipReason> {
        if let Some(remaining) = self.cooldown.remaining(now) {
            return Some(SkipReason::CooldownActive {
                remaining_ms: remaining.as_millis() as u64,
            });
        }
        if opp.net_profit_usd < self.min_profit_usd {
            return Some(SkipReason::BelowThreshold {
                net_profit_usd: opp.net_profit_usd,
                min_profit_usd: self.min_profit_usd,
            });
        }
        if dry_run {
            return Some(SkipReason::DryRun);
        }
        if self.executor.is_none() {
            warn!("Live dispatch requested without an execution backend");
            return Some(SkipReason::DryRun);
        }
        None
    }

    fn build_record(
        &mut self,
        opp: &Opportunity,
        outcome: Result<ExecutionOutcome>,
        execution_time_ms: u64,
    ) -> DispatchRecord {
        self.sequence += 1;
        let created_at = Utc::now();
        let id = format!("trade-{}-{}", created_at.timestamp_millis(), self.sequence);

        let (status, cost, gross, reference, error) = match outcome {
            Ok(out) if out.success => (
                DispatchStatus::Succeeded,
                out.cost_usd.unwrap_or(opp.estimated_cost_usd),
                out.profit_usd.unwrap_or(opp.gross_profit_usd),
                out.reference,
                None,
            ),
            Ok(out) => (
                DispatchStatus::Failed,
                out.cost_usd.unwrap_or(Decimal::ZERO),
                Decimal::ZERO,
                out.reference,
                Some(
                    EngineError::DispatchFailure(out.error.unwrap_or_else(|| "rejected".to_string()))
                        .to_string(),
                ),
            ),
            Err(e) => (
                DispatchStatus::Failed,
                Decimal::ZERO,
                Decimal::ZERO,
                None,
                Some(EngineError::DispatchFailure(e.to_string()).to_string()),
            ),
        };

        // Failed attempts never add profit; their cost is charged by the aggregator
        let realized_profit_usd = match status {
            DispatchStatus::Succeeded => gross - cost,
            DispatchStatus::Failed => Decimal::ZERO,
        };

        DispatchRecord {
            id,
            market: opp.market.clone(),
            strategy: opp.strategy,
            route: opp.route.clone(),
            expected_profit_usd: opp.net_profit_usd,
            realized_profit_usd,
            realized_cost_usd: cost,
            status,
            reference,
            error,
            execution_time_ms,
            created_at,
        }
    }
}
