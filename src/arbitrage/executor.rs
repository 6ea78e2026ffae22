//! HTTP Execution Backend
//!
//! Forwards a selected opportunity to an external signer/executor service
//! as JSON and maps its reply into an `ExecutionOutcome`. The service owns
//! keys, transaction building and submission; this side only decides what
//! to send and when.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dispatcher::{ExecutionMechanism, ExecutionOutcome};
use crate::config::ExecutorSettings;
use crate::types::Opportunity;

/// Body posted to the execution service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    opportunity: &'a Opportunity,
    /// Worst acceptable net profit after costs, in USD
    min_net_profit_usd: Decimal,
}

/// Reply from the execution service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteReply {
    success: bool,
    #[serde(default, alias = "txHash", alias = "bundleId")]
    reference: Option<String>,
    #[serde(default)]
    cost_usd: Option<Decimal>,
    #[serde(default)]
    profit_usd: Option<Decimal>,
    #[serde(default)]
    error: Option<String>,
}

impl From<ExecuteReply> for ExecutionOutcome {
    fn from(reply: ExecuteReply) -> Self {
        ExecutionOutcome {
            success: reply.success,
            reference: reply.reference,
            cost_usd: reply.cost_usd,
            profit_usd: reply.profit_usd,
            error: reply.error,
        }
    }
}

pub struct HttpExecutionMechanism {
    client: Client,
    endpoint: String,
    min_net_profit_usd: Decimal,
}

impl HttpExecutionMechanism {
    /// `min_net_profit_usd` is forwarded with every request so the service
    /// can abort when realized costs would push the trade below it.
    pub fn new(settings: &ExecutorSettings, min_net_profit_usd: Decimal) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    format!("Bearer {}", settings.api_key)
                        .parse()
                        .context("Invalid executor api key")?,
                );
                headers
            })
            .build()
            .context("Failed to build executor client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            min_net_profit_usd,
        })
    }

    fn request<'a>(&self, opportunity: &'a Opportunity) -> ExecuteRequest<'a> {
        ExecuteRequest {
            opportunity,
            min_net_profit_usd: self.min_net_profit_usd,
        }
    }
}

#[async_trait]
impl ExecutionMechanism for HttpExecutionMechanism {
    async fn execute(&self, opportunity: &Opportunity) -> Result<ExecutionOutcome> {
        let body = self.request(opportunity);

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("executor returned {}: {}", status, text));
        }

        let reply: ExecuteReply = resp.json().await.context("Failed to parse executor reply")?;
        debug!("executor reply: success={} ref={:?}", reply.success, reply.reference);
        Ok(reply.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrage::dispatcher::tests::opportunity;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn test_reply_maps_to_outcome() {
        let reply: ExecuteReply = serde_json::from_str(
            r#"{"success": true, "txHash": "0xdead", "costUsd": "0.42", "profitUsd": "1.10"}"#,
        )
        .unwrap();
        let outcome = ExecutionOutcome::from(reply);
        assert!(outcome.success);
        assert_eq!(outcome.reference.as_deref(), Some("0xdead"));
        assert_eq!(outcome.cost_usd, Some(dec!(0.42)));
        assert_eq!(outcome.profit_usd, Some(dec!(1.10)));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failure_reply_keeps_error() {
        let reply: ExecuteReply =
            serde_json::from_str(r#"{"success": false, "error": "slippage"}"#).unwrap();
        let outcome = ExecutionOutcome::from(reply);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("slippage"));
        assert!(outcome.cost_usd.is_none());
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let settings = ExecutorSettings {
            endpoint: "http://127.0.0.1:9000/execute".to_string(),
            api_key: "bad\nkey".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(HttpExecutionMechanism::new(&settings, dec!(0.10)).is_err());

        let settings = ExecutorSettings { api_key: "secret".to_string(), ..settings };
        assert!(HttpExecutionMechanism::new(&settings, dec!(0.10)).is_ok());
    }

    #[test]
    fn test_request_carries_configured_minimum() {
        let settings = ExecutorSettings {
            endpoint: "http://127.0.0.1:9000/execute".to_string(),
            api_key: "secret".to_string(),
            timeout: Duration::from_secs(1),
        };
        let mechanism = HttpExecutionMechanism::new(&settings, dec!(0.10)).unwrap();
        let opp = opportunity(dec!(1.00));

        let json = serde_json::to_value(mechanism.request(&opp)).unwrap();
        let min: Decimal = serde_json::from_value(json["minNetProfitUsd"].clone()).unwrap();
        assert_eq!(min, dec!(0.10));
        assert_eq!(json["opportunity"]["route"], opp.route);
    }
}
