//! Core types for trade matching
//!
//! These mirror the on-chain trade schema: a typed core (trade id,
//! timestamp, side, counterparty reference) plus open extension fields
//! that vary by deployment and are compared generically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a counterparty pair (one partnership actor per id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnershipId(String);

impl PartnershipId {
    /// Create new partnership ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartnershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Buying leg
    Buy,
    /// Selling leg
    Sell,
}

impl Side {
    /// The side the counterparty's leg must carry
    pub fn inverted(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// One bank's submitted view of a trade
///
/// The typed fields are common to every deployment; everything else the
/// submitting bank sends rides along in `extra` and is compared with the
/// default exact-equality rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetails {
    /// Stable trade identifier, shared by both legs
    pub trade_id: String,

    /// Submission timestamp (milliseconds since Unix epoch)
    pub timestamp: i64,

    /// Order side
    pub side: Side,

    /// Label of the counterparty bank (not its on-chain identity)
    pub counterparty: String,

    /// Open extension fields, deployment-specific
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Adjudicated status of a matching or payment check
///
/// Serialized as `{"status": ..., "message": ...}` to match the on-chain
/// program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message")]
pub enum Verdict {
    /// Not yet adjudicated
    Pending,
    /// Both legs agree
    Confirmed(String),
    /// Legs disagree; message names the offending field and both values
    Rejected(String),
    /// Adjudication itself failed
    Error,
}

impl Verdict {
    /// Whether this pair still awaits adjudication
    pub fn is_pending(&self) -> bool {
        matches!(self, Verdict::Pending)
    }

    /// Whether this verdict is final and must never be re-adjudicated
    pub fn is_terminal(&self) -> bool {
        matches!(self, Verdict::Confirmed(_) | Verdict::Rejected(_))
    }
}

/// Per-leg settlement flags, set once by the on-chain program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payments {
    /// Credit side settled
    pub credit: bool,
    /// Debit side settled
    pub debit: bool,
}

impl Payments {
    /// Both flags set
    pub fn complete(&self) -> bool {
        self.credit && self.debit
    }
}

/// Which payment flag a confirmation event sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentConfirmation {
    /// Credit flag
    Credit,
    /// Debit flag
    Debit,
}

/// Full on-chain trade record for one leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Label of the bank that submitted this leg
    pub bank: String,

    /// The submitted trade data
    pub trade_details: TradeDetails,

    /// Matching verdict for this leg
    pub matching_status: Verdict,

    /// Payment verdict for this leg
    pub payment_status: Verdict,

    /// Settlement flags for this leg
    pub payments: Payments,
}
