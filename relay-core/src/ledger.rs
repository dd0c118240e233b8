//! Ledger client
//!
//! Outbound collaborator of the partnership actors. Queries go through
//! the chain's JSON-RPC `call_function` interface (base64 arguments,
//! byte-array results re-parsed as JSON); settlement transactions are
//! dispatched fire-and-forget with a fixed gas budget, and their eventual
//! outcome is pushed onto an observable channel instead of being awaited
//! by the caller.

use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use matching_core::Trade;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Resolution of one fire-and-forget settlement dispatch
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Contract method that was called
    pub method: String,

    /// When the dispatch resolved
    pub resolved_at: DateTime<Utc>,

    /// Transaction hash on success, error on failure
    pub result: Result<String>,
}

/// Sender half of the dispatch outcome channel
pub type OutcomeSender = mpsc::UnboundedSender<DispatchOutcome>;

/// Create the dispatch outcome channel
pub fn outcome_channel() -> (OutcomeSender, mpsc::UnboundedReceiver<DispatchOutcome>) {
    mpsc::unbounded_channel()
}

/// Drain dispatch outcomes: log each one, count the failures.
/// Broadcast failures are never retried and never reach the caller.
pub fn spawn_outcome_logger(
    mut outcomes: mpsc::UnboundedReceiver<DispatchOutcome>,
    metrics: Arc<Metrics>,
) {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            match outcome.result {
                Ok(tx_hash) => {
                    tracing::info!(method = %outcome.method, %tx_hash, "Transaction confirmed");
                }
                Err(err) => {
                    metrics.broadcast_failures.inc();
                    tracing::error!(method = %outcome.method, "Transaction could not be broadcast: {err}");
                }
            }
        }
    });
}

/// Interface to the on-chain ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch one bank's on-chain leg of a trade
    async fn query_trade(&self, bank_id: &str, trade_id: &str) -> Result<Trade>;

    /// Resolve a bank label to its on-chain identity
    async fn resolve_bank_id(&self, bank: &str) -> Result<String>;

    /// Dispatch a settlement transaction. Returns once dispatched, not
    /// confirmed; the outcome surfaces on the dispatch outcome channel.
    async fn submit_transaction(&self, method: &str, args: Value) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<CallResult>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CallResult {
    result: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    result: Option<String>,
    error: Option<Value>,
}

/// JSON-RPC implementation of [`LedgerClient`]
pub struct JsonRpcLedger {
    http: reqwest::Client,
    rpc_url: String,
    factory_account: String,
    gas_budget: u64,
    outcomes: OutcomeSender,
}

impl JsonRpcLedger {
    /// Build a client from config, reporting dispatches to `outcomes`
    pub fn new(config: &LedgerConfig, outcomes: OutcomeSender) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            factory_account: config.factory_account.clone(),
            gas_budget: config.gas_budget,
            outcomes,
        })
    }

    /// Read-only contract call: args travel base64-encoded, the result
    /// comes back as raw bytes holding JSON
    async fn call_function<T: serde::de::DeserializeOwned>(
        &self,
        account_id: &str,
        method_name: &str,
        args: Value,
    ) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": "query",
            "params": {
                "request_type": "call_function",
                "finality": "final",
                "account_id": account_id,
                "method_name": method_name,
                "args_base64": BASE64.encode(args.to_string()),
            },
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(Error::NotFound(format!(
                "\"{method_name}\" failed on {account_id}: {error}"
            )));
        }
        let result = response.result.ok_or_else(|| {
            Error::LedgerQuery(format!(
                "\"{method_name}\" return type did not match expected"
            ))
        })?;

        serde_json::from_slice(&result.result).map_err(|e| {
            Error::LedgerQuery(format!("Failed to decode \"{method_name}\" result: {e}"))
        })
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn query_trade(&self, bank_id: &str, trade_id: &str) -> Result<Trade> {
        let account_id = format!("{bank_id}.{}", self.factory_account);
        self.call_function(&account_id, "get_trade", json!({ "trade_id": trade_id }))
            .await
    }

    async fn resolve_bank_id(&self, bank: &str) -> Result<String> {
        self.call_function(&self.factory_account, "get_bank_id", json!({ "bank": bank }))
            .await
    }

    async fn submit_transaction(&self, method: &str, args: Value) -> Result<()> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": "send_tx",
            "params": {
                "signer_id": self.factory_account,
                "receiver_id": self.factory_account,
                "method_name": method,
                "gas": self.gas_budget,
                "args": args,
            },
        });

        tracing::info!(%method, "Sending transaction to blockchain");

        let http = self.http.clone();
        let rpc_url = self.rpc_url.clone();
        let method = method.to_string();
        let outcomes = self.outcomes.clone();

        // Fire-and-forget: the caller acknowledges once dispatched
        tokio::spawn(async move {
            let result = broadcast(&http, &rpc_url, body).await;
            let _ = outcomes.send(DispatchOutcome {
                method,
                resolved_at: Utc::now(),
                result,
            });
        });

        Ok(())
    }
}

async fn broadcast(http: &reqwest::Client, rpc_url: &str, body: Value) -> Result<String> {
    let response: TxResponse = http.post(rpc_url).json(&body).send().await?.json().await?;

    if let Some(error) = response.error {
        return Err(Error::Broadcast(error.to_string()));
    }
    response
        .result
        .ok_or_else(|| Error::Broadcast("missing transaction hash".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use matching_core::Verdict;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: &str) -> LedgerConfig {
        LedgerConfig {
            rpc_url: url.to_string(),
            factory_account: "factory.test".to_string(),
            gas_budget: 300_000_000_000_000,
            timeout_secs: 5,
        }
    }

    fn call_result_body(payload: &Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": { "result": serde_json::to_vec(payload).unwrap() },
        })
    }

    #[tokio::test]
    async fn test_query_trade_decodes_byte_result() {
        let server = MockServer::start().await;
        let trade = json!({
            "bank": "Bank A",
            "trade_details": {
                "trade_id": "t1",
                "timestamp": 1000,
                "side": "Buy",
                "counterparty": "Bank B",
                "price": 10,
            },
            "matching_status": { "status": "Pending" },
            "payment_status": { "status": "Pending" },
            "payments": { "credit": false, "debit": false },
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "method": "query",
                "params": { "account_id": "bank_a.factory.test", "method_name": "get_trade" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(call_result_body(&trade)))
            .mount(&server)
            .await;

        let (outcomes, _rx) = outcome_channel();
        let client = JsonRpcLedger::new(&config(&server.uri()), outcomes).unwrap();

        let fetched = client.query_trade("bank_a", "t1").await.unwrap();
        assert_eq!(fetched.bank, "Bank A");
        assert_eq!(fetched.trade_details.trade_id, "t1");
        assert!(fetched.matching_status.is_pending());
        assert_eq!(fetched.trade_details.extra["price"], 10);
    }

    #[tokio::test]
    async fn test_resolve_bank_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "params": { "account_id": "factory.test", "method_name": "get_bank_id" },
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(call_result_body(&json!("bank_b"))),
            )
            .mount(&server)
            .await;

        let (outcomes, _rx) = outcome_channel();
        let client = JsonRpcLedger::new(&config(&server.uri()), outcomes).unwrap();

        assert_eq!(client.resolve_bank_id("Bank B").await.unwrap(), "bank_b");
    }

    #[tokio::test]
    async fn test_rpc_error_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "dontcare",
                "error": { "cause": "UNKNOWN_ACCOUNT" },
            })))
            .mount(&server)
            .await;

        let (outcomes, _rx) = outcome_channel();
        let client = JsonRpcLedger::new(&config(&server.uri()), outcomes).unwrap();

        let err = client.query_trade("bank_x", "t1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_transaction_reports_outcome() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "send_tx",
                "params": { "method_name": "set_matching_status" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "dontcare",
                "result": "9rhnoBYSdLLFpCeHYYW3QHMXrvRPUqoW6rQjFmSbRKcN",
            })))
            .mount(&server)
            .await;

        let (outcomes, mut rx) = outcome_channel();
        let client = JsonRpcLedger::new(&config(&server.uri()), outcomes).unwrap();

        client
            .submit_transaction("set_matching_status", json!({ "trade_id": "t1" }))
            .await
            .unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.method, "set_matching_status");
        assert_eq!(
            outcome.result.unwrap(),
            "9rhnoBYSdLLFpCeHYYW3QHMXrvRPUqoW6rQjFmSbRKcN"
        );
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_observed_not_raised() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "dontcare",
                "error": { "cause": "TIMEOUT_ERROR" },
            })))
            .mount(&server)
            .await;

        let (outcomes, mut rx) = outcome_channel();
        let client = JsonRpcLedger::new(&config(&server.uri()), outcomes).unwrap();

        // Caller still gets an immediate, successful dispatch
        client
            .submit_transaction("set_payment_status", json!({ "trade_id": "t1" }))
            .await
            .unwrap();

        let outcome = rx.recv().await.unwrap();
        assert!(matches!(outcome.result, Err(Error::Broadcast(_))));
    }

    #[test]
    fn test_verdict_round_trip_through_args() {
        // Settlement args embed verdicts in the on-chain wire shape
        let verdict = Verdict::Confirmed("Trade with ID \"t1\" confirmed".to_string());
        let args = json!({ "trade_id": "t1", "matching_status": verdict });
        assert_eq!(args["matching_status"]["status"], "Confirmed");
    }
}
