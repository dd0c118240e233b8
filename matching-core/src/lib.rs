//! LegRelay Matching Core
//!
//! Domain types and the pure reconciliation engine for dual-leg trade
//! matching. Each bank submits its own half of a logical trade on-chain;
//! the engine decides whether two independently submitted legs describe
//! the same trade.
//!
//! # Invariants
//!
//! - `reconcile` is pure and deterministic: same legs, same verdict
//! - Order-independent: `reconcile(a, b)` and `reconcile(b, a)` agree
//! - A Confirmed or Rejected verdict never reverts to Pending

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod engine;
pub mod event;
pub mod rules;
pub mod types;

// Re-exports
pub use engine::reconcile;
pub use event::{BatchEnvelope, RelayEvent};
pub use rules::{Comparator, MatchRules, DEFAULT_TIMESTAMP_TOLERANCE_MS};
pub use types::{
    PartnershipId, PaymentConfirmation, Payments, Side, Trade, TradeDetails, Verdict,
};
