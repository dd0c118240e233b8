//! Registry actor
//!
//! One global instance tracking the known bank identities and the
//! indexing checkpoint. Every mutation persists before acknowledging;
//! single-threaded execution makes each operation atomic relative to the
//! rest, no extra locking.

use crate::actor::{Actor, ActorSet};
use crate::error::{Error, Result};
use crate::storage::Storage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Key of the single global registry actor
pub const REGISTRY_KEY: &str = "registry";

/// Persisted registry record: checkpoint plus known bank ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Last indexed block height (monotonically non-decreasing)
    pub last_block_height: u64,

    /// Block height indexing started from
    pub init_block_height: u64,

    /// Known bank identities, append-only
    pub bank_ids: Vec<String>,
}

/// Which checkpoint field a height update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightField {
    /// Initial indexing height
    Init,
    /// Latest indexed height
    Last,
}

/// Message sent to the registry actor
pub enum RegistryMessage {
    /// Snapshot of the current state, no side effects
    Get {
        /// Response channel
        response: oneshot::Sender<Result<RegistryState>>,
    },

    /// Clear the bank id set, leave the checkpoint untouched
    Reset {
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Update one checkpoint field
    SetBlockHeight {
        /// Which field to update
        field: HeightField,
        /// New height
        value: u64,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Append a bank id if absent
    Register {
        /// On-chain bank identity
        bank_id: String,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },
}

/// The registry actor
pub struct RegistryActor {
    key: String,
    storage: Arc<Storage>,
    state: RegistryState,
}

impl RegistryActor {
    /// Apply a mutation, persist, and only then expose the new state
    fn mutate(&mut self, f: impl FnOnce(&mut RegistryState)) -> Result<()> {
        let mut next = self.state.clone();
        f(&mut next);
        self.storage.put_record(&self.key, &next)?;
        self.state = next;
        Ok(())
    }
}

#[async_trait]
impl Actor for RegistryActor {
    type Msg = RegistryMessage;
    type Deps = Arc<Storage>;

    async fn load(key: &str, storage: &Arc<Storage>) -> Result<Self> {
        let state = storage.get_record(key)?.unwrap_or_default();
        Ok(Self {
            key: key.to_string(),
            storage: Arc::clone(storage),
            state,
        })
    }

    async fn handle(&mut self, msg: RegistryMessage) {
        match msg {
            RegistryMessage::Get { response } => {
                let _ = response.send(Ok(self.state.clone()));
            }

            RegistryMessage::Reset { response } => {
                let result = self.mutate(|state| state.bank_ids.clear());
                let _ = response.send(result);
            }

            RegistryMessage::SetBlockHeight {
                field,
                value,
                response,
            } => {
                let result = self.mutate(|state| match field {
                    HeightField::Init => state.init_block_height = value,
                    // Checkpoint never regresses
                    HeightField::Last => {
                        state.last_block_height = state.last_block_height.max(value)
                    }
                });
                let _ = response.send(result);
            }

            RegistryMessage::Register { bank_id, response } => {
                let result = if self.state.bank_ids.contains(&bank_id) {
                    Ok(())
                } else {
                    tracing::info!(%bank_id, "Registering bank");
                    self.mutate(|state| state.bank_ids.push(bank_id))
                };
                let _ = response.send(result);
            }
        }
    }

    fn reject(msg: RegistryMessage, err: &Error) {
        let err = || Error::NotReady(err.to_string());
        match msg {
            RegistryMessage::Get { response } => {
                let _ = response.send(Err(err()));
            }
            RegistryMessage::Reset { response }
            | RegistryMessage::SetBlockHeight { response, .. }
            | RegistryMessage::Register { response, .. } => {
                let _ = response.send(Err(err()));
            }
        }
    }
}

/// Handle for the global registry actor
#[derive(Clone)]
pub struct RegistryHandle {
    actors: Arc<ActorSet<RegistryActor>>,
}

impl RegistryHandle {
    /// Create a handle over the shared storage
    pub fn new(storage: Arc<Storage>, mailbox_capacity: usize) -> Self {
        Self {
            actors: Arc::new(ActorSet::new(storage, mailbox_capacity)),
        }
    }

    async fn call<T>(
        &self,
        msg: impl FnOnce(oneshot::Sender<Result<T>>) -> RegistryMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.actors.send(REGISTRY_KEY, msg(tx)).await?;
        rx.await
            .map_err(|_| Error::Mailbox("Response channel closed".to_string()))?
    }

    /// Current checkpoint and bank id snapshot
    pub async fn get(&self) -> Result<RegistryState> {
        self.call(|response| RegistryMessage::Get { response }).await
    }

    /// Clear the bank id set; the checkpoint survives
    pub async fn reset(&self) -> Result<()> {
        self.call(|response| RegistryMessage::Reset { response })
            .await
    }

    /// Update a checkpoint field, persisted before the acknowledgment
    pub async fn set_block_height(&self, field: HeightField, value: u64) -> Result<()> {
        self.call(|response| RegistryMessage::SetBlockHeight {
            field,
            value,
            response,
        })
        .await
    }

    /// Register a bank id, deduplicated
    pub async fn register(&self, bank_id: impl Into<String>) -> Result<()> {
        let bank_id = bank_id.into();
        self.call(|response| RegistryMessage::Register { bank_id, response })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn open_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Arc::new(Storage::open(&config).unwrap());
        (temp_dir, storage)
    }

    #[tokio::test]
    async fn test_defaults_on_first_access() {
        let (_dir, storage) = open_storage();
        let registry = RegistryHandle::new(storage, 16);

        let state = registry.get().await.unwrap();
        assert_eq!(state, RegistryState::default());
    }

    #[tokio::test]
    async fn test_register_deduplicates() {
        let (_dir, storage) = open_storage();
        let registry = RegistryHandle::new(storage, 16);

        registry.register("bank_a").await.unwrap();
        registry.register("bank_b").await.unwrap();
        registry.register("bank_a").await.unwrap();

        let state = registry.get().await.unwrap();
        assert_eq!(state.bank_ids, vec!["bank_a", "bank_b"]);
    }

    #[tokio::test]
    async fn test_reset_clears_ids_but_keeps_checkpoint() {
        let (_dir, storage) = open_storage();
        let registry = RegistryHandle::new(storage, 16);

        registry.register("bank_a").await.unwrap();
        registry
            .set_block_height(HeightField::Init, 100)
            .await
            .unwrap();
        registry
            .set_block_height(HeightField::Last, 120)
            .await
            .unwrap();

        registry.reset().await.unwrap();

        let state = registry.get().await.unwrap();
        assert!(state.bank_ids.is_empty());
        assert_eq!(state.init_block_height, 100);
        assert_eq!(state.last_block_height, 120);
    }

    #[tokio::test]
    async fn test_last_block_height_never_regresses() {
        let (_dir, storage) = open_storage();
        let registry = RegistryHandle::new(storage, 16);

        registry
            .set_block_height(HeightField::Last, 120)
            .await
            .unwrap();
        registry
            .set_block_height(HeightField::Last, 80)
            .await
            .unwrap();

        let state = registry.get().await.unwrap();
        assert_eq!(state.last_block_height, 120);

        // Init height has no such clamp
        registry
            .set_block_height(HeightField::Init, 50)
            .await
            .unwrap();
        registry
            .set_block_height(HeightField::Init, 10)
            .await
            .unwrap();
        assert_eq!(registry.get().await.unwrap().init_block_height, 10);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let (_dir, storage) = open_storage();

        {
            let registry = RegistryHandle::new(Arc::clone(&storage), 16);
            registry.register("bank_a").await.unwrap();
            registry
                .set_block_height(HeightField::Last, 42)
                .await
                .unwrap();
        }

        // Fresh actor set over the same storage loads the persisted record
        let registry = RegistryHandle::new(storage, 16);
        let state = registry.get().await.unwrap();
        assert_eq!(state.bank_ids, vec!["bank_a"]);
        assert_eq!(state.last_block_height, 42);
    }
}
