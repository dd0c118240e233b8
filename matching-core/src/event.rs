//! Trade-lifecycle events consumed from the chain indexer
//!
//! Events arrive in per-block batches. The status-echo kinds
//! (`set_matching_status`, `set_payment_status`) report transitions the
//! on-chain program already applied and are no-ops for the relay.

use crate::types::{PartnershipId, PaymentConfirmation, TradeDetails, Verdict};
use serde::{Deserialize, Serialize};

/// One batch of events emitted for a single block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEnvelope {
    /// Height of the block these events came from
    pub block_height: u64,

    /// Block timestamp (nanoseconds since Unix epoch)
    pub timestamp: u64,

    /// Events in on-chain order
    pub events: Vec<RelayEvent>,
}

/// A single trade-lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A bank joined the network
    NewBank {
        /// Human-readable bank label
        bank: String,
        /// On-chain identity
        bank_id: String,
    },

    /// A bank submitted its leg of a trade
    SendTrade {
        /// Counterparty pair this trade belongs to
        partnership_id: PartnershipId,
        /// Submitting bank's on-chain identity
        bank_id: String,
        /// The submitted leg
        trade: TradeDetails,
    },

    /// Status echo of a matching verdict already applied on-chain (no-op)
    SetMatchingStatus {
        /// Counterparty pair
        partnership_id: PartnershipId,
        /// Trade the verdict applies to
        trade_id: String,
        /// Applied verdict
        matching_status: Verdict,
    },

    /// A bank confirmed one payment flag of its leg
    ConfirmPayment {
        /// Counterparty pair
        partnership_id: PartnershipId,
        /// Confirming bank's on-chain identity
        bank_id: String,
        /// Trade the confirmation applies to
        trade_id: String,
        /// Which flag was set
        confirmation: PaymentConfirmation,
    },

    /// Status echo of a payment verdict already applied on-chain (no-op)
    SetPaymentStatus {
        /// Counterparty pair
        partnership_id: PartnershipId,
        /// Trade the verdict applies to
        trade_id: String,
        /// Applied verdict
        payment_status: Verdict,
    },
}

impl RelayEvent {
    /// Event kind name as emitted on-chain
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::NewBank { .. } => "new_bank",
            RelayEvent::SendTrade { .. } => "send_trade",
            RelayEvent::SetMatchingStatus { .. } => "set_matching_status",
            RelayEvent::ConfirmPayment { .. } => "confirm_payment",
            RelayEvent::SetPaymentStatus { .. } => "set_payment_status",
        }
    }
}
