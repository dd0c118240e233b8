//! HTTP surface
//!
//! Thin inbound boundary: bearer auth and payload validation happen here,
//! before anything reaches the actors; the core itself only ever sees
//! well-formed batches. Responses carry no body on success and a bare
//! status on failure, matching the upstream indexer's expectations.

use crate::dispatch::Dispatcher;
use crate::metrics::Metrics;
use crate::registry::{HeightField, RegistryHandle, RegistryState};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use matching_core::BatchEnvelope;
use std::sync::Arc;

/// Shared state of every route
#[derive(Clone)]
pub struct AppState {
    /// Batch fan-out
    pub dispatcher: Dispatcher,
    /// Registry actor handle
    pub registry: RegistryHandle,
    /// Metrics collector
    pub metrics: Arc<Metrics>,
    /// Expected bearer token
    pub indexer_token: Arc<String>,
}

/// Internal failure of an otherwise valid call; details stay in the logs
struct ApiError(crate::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        Self(err)
    }
}

/// Build the router: batch ingestion, registry administration, metrics
pub fn router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/batch", post(handle_batch))
        .route("/info", get(get_info).delete(reset_info))
        .route("/info/last_block_height", post(set_last_block_height))
        .route("/info/init_block_height", post(set_init_block_height))
        .route_layer(middleware::from_fn_with_state(state.clone(), bearer_auth));

    Router::new()
        .merge(authed)
        .route("/metrics", get(export_metrics))
        .with_state(state)
}

async fn bearer_auth(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == state.indexer_token.as_str());

    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn handle_batch(
    State(state): State<AppState>,
    Json(batch): Json<BatchEnvelope>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!(
        block_height = batch.block_height,
        events = batch.events.len(),
        "Batch received"
    );
    state.dispatcher.dispatch_batch(batch).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_info(State(state): State<AppState>) -> Result<Json<RegistryState>, ApiError> {
    Ok(Json(state.registry.get().await?))
}

async fn reset_info(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.registry.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_last_block_height(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let height = parse_height(&body)?;
    state
        .registry
        .set_block_height(HeightField::Last, height)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_init_block_height(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let height = parse_height(&body)?;
    state
        .registry
        .set_block_height(HeightField::Init, height)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_height(body: &str) -> Result<u64, ApiError> {
    body.trim()
        .parse()
        .map_err(|e| ApiError(crate::Error::Other(format!("Invalid block height: {e}"))))
}

async fn export_metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .export()
        .map_err(|e| ApiError(crate::Error::Other(format!("Failed to export metrics: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partnership::{PartnershipDeps, PartnershipHandle};
    use crate::storage::Storage;
    use crate::Config;
    use matching_core::MatchRules;
    use serde_json::json;

    struct NullLedger;

    #[async_trait::async_trait]
    impl crate::ledger::LedgerClient for NullLedger {
        async fn query_trade(
            &self,
            bank_id: &str,
            trade_id: &str,
        ) -> crate::Result<matching_core::Trade> {
            Err(crate::Error::NotFound(format!("{bank_id}/{trade_id}")))
        }

        async fn resolve_bank_id(&self, bank: &str) -> crate::Result<String> {
            Err(crate::Error::NotFound(bank.to_string()))
        }

        async fn submit_transaction(
            &self,
            _method: &str,
            _args: serde_json::Value,
        ) -> crate::Result<()> {
            Ok(())
        }
    }

    async fn serve() -> (tempfile::TempDir, String) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Arc::new(Storage::open(&config).unwrap());

        let metrics = Arc::new(Metrics::new().unwrap());
        let registry = RegistryHandle::new(storage, 16);
        let partnerships = PartnershipHandle::new(
            PartnershipDeps {
                ledger: Arc::new(NullLedger),
                rules: Arc::new(MatchRules::default()),
                metrics: Arc::clone(&metrics),
            },
            16,
        );
        let dispatcher = Dispatcher::new(registry.clone(), partnerships, Arc::clone(&metrics));

        let state = AppState {
            dispatcher,
            registry,
            metrics,
            indexer_token: Arc::new("secret".to_string()),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        (temp_dir, format!("http://{addr}"))
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (_dir, base) = serve().await;
        let client = reqwest::Client::new();

        let response = client.get(format!("{base}/info")).send().await.unwrap();
        assert_eq!(response.status(), 401);

        let response = client
            .get(format!("{base}/info"))
            .bearer_auth("wrong")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn test_info_roundtrip() {
        let (_dir, base) = serve().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/info/last_block_height"))
            .bearer_auth("secret")
            .body("77")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);

        let info: RegistryState = client
            .get(format!("{base}/info"))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(info.last_block_height, 77);

        let response = client
            .delete(format!("{base}/info"))
            .bearer_auth("secret")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn test_batch_of_status_echoes_acknowledges() {
        let (_dir, base) = serve().await;
        let client = reqwest::Client::new();

        let batch = json!({
            "block_height": 5,
            "timestamp": 1,
            "events": [
                {
                    "event": "set_payment_status",
                    "data": {
                        "partnership_id": "p",
                        "trade_id": "t1",
                        "payment_status": { "status": "Pending" },
                    }
                }
            ]
        });

        let response = client
            .post(format!("{base}/batch"))
            .bearer_auth("secret")
            .json(&batch)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn test_failing_batch_is_internal_error() {
        let (_dir, base) = serve().await;
        let client = reqwest::Client::new();

        // send_trade cannot be served by the empty ledger
        let batch = json!({
            "block_height": 5,
            "timestamp": 1,
            "events": [
                {
                    "event": "send_trade",
                    "data": {
                        "partnership_id": "p",
                        "bank_id": "bank_a",
                        "trade": {
                            "trade_id": "t1",
                            "timestamp": 1000,
                            "side": "Buy",
                            "counterparty": "Bank B",
                        }
                    }
                }
            ]
        });

        let response = client
            .post(format!("{base}/batch"))
            .bearer_auth("secret")
            .json(&batch)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn test_metrics_are_public() {
        let (_dir, base) = serve().await;
        let client = reqwest::Client::new();

        let response = client.get(format!("{base}/metrics")).send().await.unwrap();
        assert_eq!(response.status(), 200);
    }
}
