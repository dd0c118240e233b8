//! Partnership actor
//!
//! One instance per counterparty pair. The actor holds no durable trade
//! state: both legs are re-fetched from the ledger on every adjudication,
//! which makes the protocol order-independent and idempotent under
//! at-least-once event delivery. Settlement transactions are dispatched
//! fire-and-forget; the acknowledgment never waits for confirmation.

use crate::actor::{Actor, ActorSet};
use crate::error::{Error, Result};
use crate::ledger::LedgerClient;
use crate::metrics::Metrics;
use async_trait::async_trait;
use matching_core::{
    reconcile, MatchRules, PartnershipId, PaymentConfirmation, TradeDetails, Verdict,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Shared collaborators of every partnership actor
#[derive(Clone)]
pub struct PartnershipDeps {
    /// On-chain ledger client
    pub ledger: Arc<dyn LedgerClient>,

    /// Field comparison rules for this deployment
    pub rules: Arc<MatchRules>,

    /// Metrics collector
    pub metrics: Arc<Metrics>,
}

/// Message sent to a partnership actor
pub enum PartnershipMessage {
    /// One bank submitted its leg of a trade
    SubmitTrade {
        /// Submitting bank's on-chain identity
        bank_id: String,
        /// The submitted leg
        trade: TradeDetails,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// One bank confirmed a payment flag
    ConfirmPayment {
        /// Confirming bank's on-chain identity
        bank_id: String,
        /// Trade the confirmation applies to
        trade_id: String,
        /// Which flag was set
        confirmation: PaymentConfirmation,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },
}

/// Actor adjudicating one counterparty pair
pub struct PartnershipActor {
    partnership_id: String,
    deps: PartnershipDeps,
}

impl PartnershipActor {
    /// Adjudicate a newly submitted leg.
    ///
    /// Both legs are fetched fresh; a non-Pending verdict on either side
    /// means the pair is already finalized (or mid-finalization) and the
    /// call is a no-op. The matching engine therefore runs at most once
    /// per pair per finalization.
    async fn submit_trade(&self, bank_a_id: &str, trade: &TradeDetails) -> Result<()> {
        let ledger = &self.deps.ledger;

        let trade_a = ledger.query_trade(bank_a_id, &trade.trade_id).await?;
        if !trade_a.matching_status.is_pending() {
            tracing::debug!(
                trade_id = %trade.trade_id,
                "Own leg already adjudicated, skipping"
            );
            return Ok(());
        }

        let bank_b_id = ledger.resolve_bank_id(&trade.counterparty).await?;
        let trade_b = ledger.query_trade(&bank_b_id, &trade.trade_id).await?;
        if !trade_b.matching_status.is_pending() {
            tracing::debug!(
                trade_id = %trade.trade_id,
                "Counterparty leg already adjudicated, skipping"
            );
            return Ok(());
        }

        tracing::info!(
            partnership_id = %self.partnership_id,
            trade_id = %trade.trade_id,
            "Trying to match trades"
        );

        let verdict = reconcile(&trade_a, &trade_b, &self.deps.rules);
        let status = match &verdict {
            Verdict::Confirmed(_) => "confirmed",
            Verdict::Rejected(_) => "rejected",
            _ => "other",
        };
        self.deps
            .metrics
            .verdicts_total
            .with_label_values(&[status])
            .inc();
        tracing::info!(trade_id = %trade.trade_id, ?verdict, "Matching verdict");

        ledger
            .submit_transaction(
                "set_matching_status",
                json!({
                    "partnership_id": self.partnership_id,
                    "bank_a_id": bank_a_id,
                    "bank_b_id": bank_b_id,
                    "trade_id": trade.trade_id,
                    "matching_status": verdict,
                }),
            )
            .await
    }

    /// Check the payment flags of both legs and, once all four are set,
    /// push the Confirmed payment verdict on-chain. Anything less is a
    /// no-op; later confirmation events will land here again.
    async fn confirm_payment(
        &self,
        bank_a_id: &str,
        trade_id: &str,
        confirmation: PaymentConfirmation,
    ) -> Result<()> {
        let ledger = &self.deps.ledger;

        let trade_a = ledger.query_trade(bank_a_id, trade_id).await?;
        let bank_b_id = ledger
            .resolve_bank_id(&trade_a.trade_details.counterparty)
            .await?;
        let trade_b = ledger.query_trade(&bank_b_id, trade_id).await?;

        tracing::info!(
            partnership_id = %self.partnership_id,
            %trade_id,
            ?confirmation,
            "Payment confirmation observed"
        );

        if !(trade_a.payments.complete() && trade_b.payments.complete()) {
            return Ok(());
        }

        let verdict = Verdict::Confirmed(format!(
            "Payment for trade with ID \"{trade_id}\" confirmed"
        ));

        ledger
            .submit_transaction(
                "set_payment_status",
                json!({
                    "partnership_id": self.partnership_id,
                    "bank_a_id": bank_a_id,
                    "bank_b_id": bank_b_id,
                    "trade_id": trade_id,
                    "payment_status": verdict,
                }),
            )
            .await
    }
}

#[async_trait]
impl Actor for PartnershipActor {
    type Msg = PartnershipMessage;
    type Deps = PartnershipDeps;

    // No persisted record: the on-chain ledger is the source of truth
    async fn load(key: &str, deps: &PartnershipDeps) -> Result<Self> {
        Ok(Self {
            partnership_id: key.to_string(),
            deps: deps.clone(),
        })
    }

    async fn handle(&mut self, msg: PartnershipMessage) {
        match msg {
            PartnershipMessage::SubmitTrade {
                bank_id,
                trade,
                response,
            } => {
                let result = self.submit_trade(&bank_id, &trade).await;
                if let Err(err) = &result {
                    tracing::error!(trade_id = %trade.trade_id, "submit_trade failed: {err}");
                }
                let _ = response.send(result);
            }

            PartnershipMessage::ConfirmPayment {
                bank_id,
                trade_id,
                confirmation,
                response,
            } => {
                let result = self
                    .confirm_payment(&bank_id, &trade_id, confirmation)
                    .await;
                if let Err(err) = &result {
                    tracing::error!(%trade_id, "confirm_payment failed: {err}");
                }
                let _ = response.send(result);
            }
        }
    }

    fn reject(msg: PartnershipMessage, err: &Error) {
        let err = || Error::NotReady(err.to_string());
        match msg {
            PartnershipMessage::SubmitTrade { response, .. }
            | PartnershipMessage::ConfirmPayment { response, .. } => {
                let _ = response.send(Err(err()));
            }
        }
    }
}

/// Handle over all partnership actors
#[derive(Clone)]
pub struct PartnershipHandle {
    actors: Arc<ActorSet<PartnershipActor>>,
}

impl PartnershipHandle {
    /// Create a handle over the shared collaborators
    pub fn new(deps: PartnershipDeps, mailbox_capacity: usize) -> Self {
        Self {
            actors: Arc::new(ActorSet::new(deps, mailbox_capacity)),
        }
    }

    /// Route a trade submission to its pair's actor
    pub async fn submit_trade(
        &self,
        partnership_id: &PartnershipId,
        bank_id: impl Into<String>,
        trade: TradeDetails,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.actors
            .send(
                partnership_id.as_str(),
                PartnershipMessage::SubmitTrade {
                    bank_id: bank_id.into(),
                    trade,
                    response: tx,
                },
            )
            .await?;
        rx.await
            .map_err(|_| Error::Mailbox("Response channel closed".to_string()))?
    }

    /// Route a payment confirmation to its pair's actor
    pub async fn confirm_payment(
        &self,
        partnership_id: &PartnershipId,
        bank_id: impl Into<String>,
        trade_id: impl Into<String>,
        confirmation: PaymentConfirmation,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.actors
            .send(
                partnership_id.as_str(),
                PartnershipMessage::ConfirmPayment {
                    bank_id: bank_id.into(),
                    trade_id: trade_id.into(),
                    confirmation,
                    response: tx,
                },
            )
            .await?;
        rx.await
            .map_err(|_| Error::Mailbox("Response channel closed".to_string()))?
    }
}
