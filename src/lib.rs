//! Opportunity Discovery & Selection Engine
//!
//! Probes on-chain quoters across five strategies, turns quote chains into
//! normalized profit estimates, ranks them, and dispatches at most one per
//! scan cycle behind a cooldown and a minimum-profit gate. A small HTTP
//! control surface exposes status and run control.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use stats::StatsSnapshot;
pub use types::{DispatchRecord, Opportunity, StrategyKind};
