//! LegRelay Core
//!
//! Relays trade-lifecycle events from a chain indexer to keyed actors
//! that adjudicate dual-leg trades and push settlement verdicts back
//! on-chain.
//!
//! # Architecture
//!
//! - **Keyed Actors**: one single-threaded task per key, persisted state
//!   loaded before the first message is served
//! - **Stateless Adjudication**: partnership actors re-fetch both legs
//!   per call; the on-chain ledger is the only source of trade truth
//! - **Idempotent**: a finalized pair is never re-adjudicated, so
//!   at-least-once event delivery is safe
//! - **Fire-and-Forget Settlement**: verdicts are dispatched without
//!   awaiting confirmation; outcomes surface on an observable channel

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod partnership;
pub mod registry;
pub mod server;
pub mod storage;

// Re-exports
pub use actor::{Actor, ActorSet};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use ledger::{JsonRpcLedger, LedgerClient};
pub use metrics::Metrics;
pub use partnership::{PartnershipDeps, PartnershipHandle};
pub use registry::{HeightField, RegistryHandle, RegistryState};
pub use storage::Storage;
