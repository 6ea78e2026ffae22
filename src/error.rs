//! Engine Error Taxonomy
//!
//! Typed errors surfaced by the discovery engine and its control surface.
//! Per-combination and per-market failures are swallowed where they occur;
//! only configuration errors stop the process.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A single hop quote failed, reverted or missed its deadline.
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("market '{market}' unreachable: {reason}")]
    MarketUnreachable { market: String, reason: String },

    #[error("dispatch failed: {0}")]
    DispatchFailure(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("no retained opportunity at index {0}")]
    NoSuchOpportunity(usize),

    #[error("live mode unavailable: no [executor] configured")]
    LiveModeUnavailable,

    /// Control-surface request body present but not understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    /// Whether the process must refuse to continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(EngineError::config("RPC endpoint missing").is_fatal());
        assert!(!EngineError::QuoteUnavailable("timeout".into()).is_fatal());
        assert!(!EngineError::DispatchFailure("reverted".into()).is_fatal());
        assert!(!EngineError::MarketUnreachable {
            market: "base".into(),
            reason: "connection refused".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = EngineError::UnknownStrategy("sandwich".into());
        assert_eq!(err.to_string(), "unknown strategy 'sandwich'");
        let err = EngineError::NoSuchOpportunity(7);
        assert_eq!(err.to_string(), "no retained opportunity at index 7");
        assert!(!EngineError::InvalidRequest("expected bool".into()).is_fatal());
    }
}
