//! Relay server binary

use relay_core::{
    ledger, Config, Dispatcher, JsonRpcLedger, Metrics, PartnershipDeps, PartnershipHandle,
    RegistryHandle, Storage,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting LegRelay server");

    // Load configuration: file if given, environment overrides otherwise
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    let storage = Arc::new(Storage::open(&config)?);
    let metrics = Arc::new(Metrics::new()?);

    // Dispatch outcomes are logged and counted, never retried
    let (outcomes, outcome_rx) = ledger::outcome_channel();
    ledger::spawn_outcome_logger(outcome_rx, Arc::clone(&metrics));

    let ledger_client = Arc::new(JsonRpcLedger::new(&config.ledger, outcomes)?);
    let rules = Arc::new(matching_core::MatchRules::with_tolerance(
        config.matching.timestamp_tolerance_ms,
    ));

    let registry = RegistryHandle::new(Arc::clone(&storage), config.actors.mailbox_capacity);
    let partnerships = PartnershipHandle::new(
        PartnershipDeps {
            ledger: ledger_client,
            rules,
            metrics: Arc::clone(&metrics),
        },
        config.actors.mailbox_capacity,
    );
    let dispatcher = Dispatcher::new(registry.clone(), partnerships, Arc::clone(&metrics));

    let state = relay_core::server::AppState {
        dispatcher,
        registry,
        metrics,
        indexer_token: Arc::new(config.indexer_token.clone()),
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Listening on {}", config.listen_addr);

    axum::serve(listener, relay_core::server::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down relay server");
        })
        .await?;

    Ok(())
}
