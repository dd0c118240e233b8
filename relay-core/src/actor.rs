//! Keyed actor runtime
//!
//! Every logical key (the registry singleton, one per counterparty pair)
//! maps to exactly one spawned task with a bounded mailbox. Messages for
//! the same key are strictly serialized; distinct keys run concurrently.
//!
//! On first access to a key the persisted state is loaded *inside* the
//! actor task, before any message is served: operations issued during the
//! load queue in the mailbox and wait rather than race. A failed load
//! answers every queued message with an internal error and retires the
//! mailbox, so the next delivery attempt gets a fresh load; other keys
//! are unaffected.

use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A keyed, single-threaded unit of execution with its own persisted state
#[async_trait]
pub trait Actor: Sized + Send + 'static {
    /// Message type served by this actor
    type Msg: Send + 'static;

    /// Shared collaborators handed to every instance (storage, clients)
    type Deps: Clone + Send + Sync + 'static;

    /// Load persisted state for `key`. Runs before any message is served.
    async fn load(key: &str, deps: &Self::Deps) -> Result<Self>;

    /// Handle one message. Calls on the same key never interleave.
    async fn handle(&mut self, msg: Self::Msg);

    /// Answer a message that cannot be served because the load failed
    fn reject(msg: Self::Msg, err: &Error);
}

/// Supervisor for all actors of one kind
pub struct ActorSet<A: Actor> {
    deps: A::Deps,
    mailboxes: Arc<DashMap<String, mpsc::Sender<A::Msg>>>,
    capacity: usize,
}

impl<A: Actor> ActorSet<A> {
    /// Create a supervisor with the given per-actor mailbox capacity
    pub fn new(deps: A::Deps, capacity: usize) -> Self {
        Self {
            deps,
            mailboxes: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Deliver a message to the actor for `key`, spawning it on first use
    pub async fn send(&self, key: &str, msg: A::Msg) -> Result<()> {
        let sender = self.mailbox(key);
        sender
            .send(msg)
            .await
            .map_err(|_| Error::Mailbox(format!("Mailbox closed for key {key}")))
    }

    fn mailbox(&self, key: &str) -> mpsc::Sender<A::Msg> {
        if let Some(sender) = self.mailboxes.get(key) {
            return sender.clone();
        }

        let entry = self.mailboxes.entry(key.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(self.capacity);
            spawn_actor::<A>(
                key.to_string(),
                self.deps.clone(),
                rx,
                Arc::clone(&self.mailboxes),
            );
            tx
        });
        entry.value().clone()
    }
}

fn spawn_actor<A: Actor>(
    key: String,
    deps: A::Deps,
    mut mailbox: mpsc::Receiver<A::Msg>,
    mailboxes: Arc<DashMap<String, mpsc::Sender<A::Msg>>>,
) {
    tokio::spawn(async move {
        // Blocking suspension point: messages queue until the load ends
        let mut actor = match A::load(&key, &deps).await {
            Ok(actor) => actor,
            Err(err) => {
                tracing::error!(key = %key, "Failed to load actor state: {err}");

                // Retire the mailbox so the next delivery retries the load,
                // then fail whatever already queued behind us
                mailboxes.remove(&key);
                mailbox.close();
                while let Some(msg) = mailbox.recv().await {
                    A::reject(msg, &Error::NotReady(err.to_string()));
                }
                return;
            }
        };

        tracing::debug!(key = %key, "Actor loaded");

        while let Some(msg) = mailbox.recv().await {
            actor.handle(msg).await;
        }
    });
}
