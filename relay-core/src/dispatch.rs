//! Event batch dispatch
//!
//! Fans one indexer batch out to the actors: registration events go to
//! the registry, trade lifecycle events to the partnership actor of
//! their pair, status echoes are absorbed here. Events are processed in
//! on-chain order; a failing event aborts the batch but nothing already
//! processed is rolled back (redelivery is safe, the actors are
//! idempotent).

use crate::error::Result;
use crate::metrics::Metrics;
use crate::partnership::PartnershipHandle;
use crate::registry::{HeightField, RegistryHandle};
use matching_core::{BatchEnvelope, RelayEvent};
use std::sync::Arc;

/// Routes inbound event batches onto the actors
#[derive(Clone)]
pub struct Dispatcher {
    registry: RegistryHandle,
    partnerships: PartnershipHandle,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    /// Create a dispatcher over the actor handles
    pub fn new(
        registry: RegistryHandle,
        partnerships: PartnershipHandle,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            partnerships,
            metrics,
        }
    }

    /// Process one batch; the checkpoint advances only after every event
    /// in it has been handled
    pub async fn dispatch_batch(&self, batch: BatchEnvelope) -> Result<()> {
        for event in batch.events {
            self.metrics
                .events_total
                .with_label_values(&[event.kind()])
                .inc();
            self.dispatch_event(event).await?;
        }

        self.metrics.batches_total.inc();
        self.registry
            .set_block_height(HeightField::Last, batch.block_height)
            .await
    }

    async fn dispatch_event(&self, event: RelayEvent) -> Result<()> {
        tracing::info!(kind = event.kind(), "event");

        match event {
            RelayEvent::NewBank { bank, bank_id } => {
                tracing::debug!(%bank, %bank_id, "new bank");
                self.registry.register(bank_id).await
            }

            RelayEvent::SendTrade {
                partnership_id,
                bank_id,
                trade,
            } => {
                self.partnerships
                    .submit_trade(&partnership_id, bank_id, trade)
                    .await
            }

            RelayEvent::ConfirmPayment {
                partnership_id,
                bank_id,
                trade_id,
                confirmation,
            } => {
                self.partnerships
                    .confirm_payment(&partnership_id, bank_id, trade_id, confirmation)
                    .await
            }

            // Status echoes: the on-chain program already applied these
            RelayEvent::SetMatchingStatus { .. } | RelayEvent::SetPaymentStatus { .. } => Ok(()),
        }
    }
}
