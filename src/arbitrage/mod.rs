//! Arbitrage Module
//!
//! Opportunity discovery (quoting, profit model, strategy scanners),
//! cycle orchestration, and cooldown-gated dispatch.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

pub mod candidates;
pub mod cooldown;
pub mod costs;
pub mod dispatcher;
pub mod executor;
pub mod orchestrator;
pub mod profit;
pub mod quoter;
pub mod rpc_quoter;
pub mod scanners;

pub use cooldown::DispatchCooldown;
pub use costs::CostModel;
pub use dispatcher::{DispatchDecision, Dispatcher, ExecutionMechanism, ExecutionOutcome};
pub use executor::HttpExecutionMechanism;
pub use orchestrator::{ScanCycleResult, ScanOrchestrator};
pub use quoter::{DeadlineQuoter, QuoteRequest, QuoteSource};
pub use rpc_quoter::RpcQuoteSource;
