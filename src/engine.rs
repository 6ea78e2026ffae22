//! Engine - Scan loop, run state and control operations
//!
//! Owns the orchestrator, the (serial) dispatcher, the stats handle and the
//! per-strategy enabled flags. One background task runs the scan loop:
//! full cycle, at most one dispatch decision, then sleep. Stop is
//! cooperative; the in-flight cycle and any execution call finish first.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::arbitrage::cooldown::DispatchCooldown;
use crate::arbitrage::costs::CostModel;
use crate::arbitrage::dispatcher::{DispatchDecision, DispatchState, Dispatcher, ExecutionMechanism};
use crate::arbitrage::orchestrator::{MarketHealth, ScanCycleResult, ScanOrchestrator};
use crate::arbitrage::quoter::{DeadlineQuoter, QuoteSource};
use crate::arbitrage::scanners::all_scanners;
use crate::config::{EngineSettings, MarketConfig};
use crate::error::EngineError;
use crate::stats::{StatsHandle, StatsLimits, StatsSnapshot};
use crate::types::{Opportunity, StrategyKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    DryRun,
    Live,
}

impl RunMode {
    fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Live
        }
    }
}

/// Response to `GET status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub running: bool,
    pub mode: RunMode,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
    pub strategies: BTreeMap<StrategyKind, bool>,
    pub dispatcher: DispatchState,
    pub markets: BTreeMap<String, MarketHealth>,
    pub win_rate: f64,
    pub stats: StatsSnapshot,
}

/// Response to `GET health`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub running: bool,
    pub mode: RunMode,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyToggle {
    pub strategy: StrategyKind,
    pub enabled: bool,
}

/// One loop iteration: the cycle and what the dispatcher did with it
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub cycle: ScanCycleResult,
    pub decision: DispatchDecision,
}

/// Published run flags. Readers never wait on the control lock.
#[derive(Debug, Clone)]
struct RunView {
    running: bool,
    /// Mode of the current run, or of the last one once stopped
    dry_run: bool,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
}

/// Handles of the live scan loop; serializes start/stop
#[derive(Default)]
struct RunControl {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl RunView {
    fn uptime_secs(&self) -> u64 {
        match (self.running, self.started) {
            (true, Some(started)) => started.elapsed().as_secs(),
            _ => 0,
        }
    }
}

struct Inner {
    orchestrator: ScanOrchestrator,
    dispatcher: Mutex<Dispatcher>,
    stats: StatsHandle,
    control: Mutex<RunControl>,
    view: watch::Sender<RunView>,
    /// Set by `start`; the next dispatcher user clears the cooldown
    restart_pending: AtomicBool,
    strategies: [AtomicBool; 5],
    /// Top-N window of the most recent cycle, for forced execution
    latest: RwLock<Vec<Opportunity>>,
    scan_interval: Duration,
    live_capable: bool,
}

/// Cloneable handle to the engine
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Wire up the engine. Must be called inside a tokio runtime.
    pub fn new(
        settings: &EngineSettings,
        markets: Vec<MarketConfig>,
        costs: Arc<dyn CostModel>,
        source: Arc<dyn QuoteSource>,
        executor: Option<Arc<dyn ExecutionMechanism>>,
    ) -> Self {
        let stats = StatsHandle::spawn(StatsLimits {
            trade_history: settings.trade_history,
            activity_log: settings.activity_log,
        });

        let orchestrator = ScanOrchestrator::new(
            markets,
            all_scanners(),
            DeadlineQuoter::new(source, settings.quote_timeout),
            costs,
            settings.min_profit_usd,
            settings.top_n,
            stats.clone(),
        );

        let live_capable = executor.is_some();
        let cooldown = DispatchCooldown::new(settings.cooldown).with_failure_backoff(settings.cooldown_backoff_max);
        let dispatcher = Dispatcher::new(executor, cooldown, settings.min_profit_usd, stats.clone());

        let dry_run = settings.dry_run || !live_capable;

        Self {
            inner: Arc::new(Inner {
                orchestrator,
                dispatcher: Mutex::new(dispatcher),
                stats,
                control: Mutex::new(RunControl::default()),
                view: watch::channel(RunView {
                    running: false,
                    dry_run,
                    started_at: None,
                    started: None,
                })
                .0,
                restart_pending: AtomicBool::new(false),
                strategies: std::array::from_fn(|_| AtomicBool::new(true)),
                latest: RwLock::new(Vec::new()),
                scan_interval: settings.scan_interval,
                live_capable,
            }),
        }
    }

    pub fn stats(&self) -> &StatsHandle {
        &self.inner.stats
    }

    pub fn enabled_strategies(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|k| self.inner.strategies[k.index()].load(Ordering::SeqCst))
            .collect()
    }

    /// Start the scan loop. `dry_run` defaults to the mode of the last run.
    pub async fn start(&self, dry_run: Option<bool>) -> Result<EngineStatus, EngineError> {
        {
            let mut control = self.inner.control.lock().await;
            let previous = self.inner.view.borrow().clone();
            if previous.running {
                return Err(EngineError::AlreadyRunning);
            }
            let dry_run = dry_run.unwrap_or(previous.dry_run);
            if !dry_run && !self.inner.live_capable {
                return Err(EngineError::LiveModeUnavailable);
            }

            // Cooldown history does not survive a restart
            self.inner.restart_pending.store(true, Ordering::SeqCst);

            let token = CancellationToken::new();
            let task = tokio::spawn(scan_loop(self.clone(), token.clone(), dry_run));
            control.cancel = Some(token);
            control.task = Some(task);
            self.inner.view.send_replace(RunView {
                running: true,
                dry_run,
                started_at: Some(Utc::now()),
                started: Some(Instant::now()),
            });

            if dry_run {
                info!("▶️  Engine started in DRY RUN mode - opportunities will not be executed");
            } else {
                warn!("⚠️  Engine started in LIVE mode - opportunities will be executed!");
            }
            self.inner
                .stats
                .activity(format!("engine started ({:?})", RunMode::from_dry_run(dry_run)));
        }
        Ok(self.status().await)
    }

    /// Cooperative stop. Waits for the in-flight iteration, then returns
    /// the final cumulative stats.
    pub async fn stop(&self) -> Result<StatsSnapshot, EngineError> {
        let (token, task) = {
            let mut control = self.inner.control.lock().await;
            if !self.inner.view.borrow().running {
                return Err(EngineError::NotRunning);
            }
            self.inner.view.send_modify(|view| view.running = false);
            (control.cancel.take(), control.task.take())
        };

        if let Some(token) = token {
            token.cancel();
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("scan loop ended abnormally: {}", e);
            }
        }

        self.inner.stats.activity("engine stopped");
        let snapshot = self.inner.stats.sync().await;
        info!("⏹️  Engine stopped | {}", snapshot.summary());
        Ok(snapshot)
    }

    /// Flip a strategy's enabled flag; returns the new state.
    pub fn toggle_strategy(&self, name: &str) -> Result<StrategyToggle, EngineError> {
        let strategy: StrategyKind = name.parse()?;
        let previous = self.inner.strategies[strategy.index()].fetch_xor(true, Ordering::SeqCst);
        let enabled = !previous;
        info!("Strategy {} {}", strategy, if enabled { "ENABLED" } else { "DISABLED" });
        self.inner
            .stats
            .activity(format!("strategy {} {}", strategy, if enabled { "enabled" } else { "disabled" }));
        Ok(StrategyToggle { strategy, enabled })
    }

    /// One orchestration pass without dispatch.
    pub async fn scan_once(&self) -> ScanCycleResult {
        let result = self.inner.orchestrator.run_cycle(&self.enabled_strategies()).await;
        self.remember(&result);
        result
    }

    /// One loop iteration: full cycle, then at most one dispatch decision.
    pub async fn run_iteration(&self, dry_run: bool) -> IterationReport {
        let cycle = self.scan_once().await;
        let decision = self.dispatcher().await.dispatch_best(&cycle, dry_run).await;
        IterationReport { cycle, decision }
    }

    /// Force a dispatch of a retained opportunity (default: the best).
    /// The cooldown, minimum-profit gate and dry-run mode still apply.
    pub async fn execute(&self, index: Option<usize>) -> Result<DispatchDecision, EngineError> {
        let index = index.unwrap_or(0);
        let opportunity = self
            .latest_window()
            .into_iter()
            .nth(index)
            .ok_or(EngineError::NoSuchOpportunity(index))?;
        let dry_run = self.inner.view.borrow().dry_run;

        info!("Forced execution of #{}: {}", index, opportunity.route);
        let decision = self
            .dispatcher()
            .await
            .dispatch(Some(&opportunity), dry_run, Instant::now())
            .await;
        Ok(decision)
    }

    pub async fn status(&self) -> EngineStatus {
        let (running, dry_run, started_at, uptime_secs) = {
            let view = self.inner.view.borrow();
            (view.running, view.dry_run, view.started_at, view.uptime_secs())
        };
        // Held for the duration of an execution call
        let dispatcher = match self.inner.dispatcher.try_lock() {
            Ok(d) => d.state(),
            Err(_) => DispatchState::Dispatching,
        };
        let stats = self.inner.stats.snapshot();

        EngineStatus {
            running,
            mode: RunMode::from_dry_run(dry_run),
            started_at,
            uptime_secs,
            strategies: StrategyKind::ALL
                .into_iter()
                .map(|k| (k, self.inner.strategies[k.index()].load(Ordering::SeqCst)))
                .collect(),
            dispatcher,
            markets: self.inner.orchestrator.market_health(),
            win_rate: stats.win_rate(),
            stats,
        }
    }

    pub async fn health(&self) -> HealthReport {
        let view = self.inner.view.borrow();
        HealthReport {
            status: "ok",
            running: view.running,
            mode: RunMode::from_dry_run(view.dry_run),
            uptime_secs: view.uptime_secs(),
        }
    }

    /// Dispatcher lock, applying a pending restart reset first.
    async fn dispatcher(&self) -> MutexGuard<'_, Dispatcher> {
        let mut dispatcher = self.inner.dispatcher.lock().await;
        if self.inner.restart_pending.swap(false, Ordering::SeqCst) {
            dispatcher.reset();
        }
        dispatcher
    }

    fn remember(&self, result: &ScanCycleResult) {
        match self.inner.latest.write() {
            Ok(mut latest) => *latest = result.opportunities.clone(),
            Err(poisoned) => *poisoned.into_inner() = result.opportunities.clone(),
        }
    }

    fn latest_window(&self) -> Vec<Opportunity> {
        match self.inner.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

async fn scan_loop(engine: Engine, token: CancellationToken, dry_run: bool) {
    let interval = engine.inner.scan_interval;
    info!("Scan loop running every {}ms", interval.as_millis());

    while !token.is_cancelled() {
        let report = engine.run_iteration(dry_run).await;
        debug!(
            "Cycle #{} done: {} found, dispatched {:?}",
            report.cycle.cycle,
            report.cycle.total_found,
            report.decision.record().map(|r| r.id.as_str())
        );

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("Scan loop exited");
}
